use axum::{http::header::CONTENT_TYPE, response::IntoResponse};

const COHORTS_DOC: &str = include_str!("../../views/cohorts.json");

pub async fn get_docs() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/json")], COHORTS_DOC)
}
