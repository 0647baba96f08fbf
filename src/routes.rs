use crate::{
    extract::parse_cookies,
    routes::{
        cohorts::{delete_cohort, get_cohort, get_cohorts, post_cohort, put_cohort},
        docs::get_docs,
        students::{
            delete_student, get_student, get_students, get_students_in_cohort, post_student,
            put_student,
        },
    },
    state::CohortToolsState,
};
use axum::{
    Router,
    extract::Request,
    http::{Method, header::CONTENT_TYPE},
    middleware,
    response::Response,
    routing::get,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::Span;

pub mod cohorts;
pub mod docs;
pub mod students;

///largest request body we'll read
pub const BODY_LIMIT: usize = 100 * 1024;

pub fn router(state: CohortToolsState) -> Router {
    let config = state.config().clone();

    let cors_layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.allowed_origins().iter().cloned()))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([CONTENT_TYPE]);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
        .on_response(|response: &Response, latency: Duration, _span: &Span| {
            info!(status = response.status().as_u16(), ?latency, "Finished request");
        });

    Router::new()
        .route("/api/students", get(get_students).post(post_student))
        .route(
            "/api/students/cohort/{cohortId}",
            get(get_students_in_cohort),
        )
        .route(
            "/api/students/{studentId}",
            get(get_student).put(put_student).delete(delete_student),
        )
        .route("/api/cohorts", get(get_cohorts).post(post_cohort))
        .route(
            "/api/cohorts/{cohortId}",
            get(get_cohort).put(put_cohort).delete(delete_cohort),
        )
        .route("/docs", get(get_docs))
        .fallback_service(ServeDir::new(config.public_dir()))
        .layer(middleware::from_fn(parse_cookies))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .layer(trace_layer)
        .with_state(state)
}
