use crate::error::CohortToolsError;
use axum::{
    Form, Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

///a request body that can arrive either as JSON or as a url-encoded form
pub struct Payload<T>(pub T);

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| {
            content_type
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CohortToolsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

///a record id taken from the path, anything that isn't a UUID is a 400
#[derive(Debug, Deserialize, FromRequestParts)]
#[from_request(via(Path), rejection(CohortToolsError))]
pub struct IdPath(pub Uuid);

///parses the `Cookie` header once and leaves the jar in the request extensions
pub async fn parse_cookies(mut request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    trace!(cookies = jar.iter().count(), "Parsed cookies");
    request.extensions_mut().insert(jar);

    next.run(request).await
}
