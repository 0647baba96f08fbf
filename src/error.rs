use crate::{data::ValidationError, store::StoreError};
use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use snafu::Snafu;
use std::num::ParseIntError;
use uuid::Uuid;

pub type CohortToolsResult<T> = Result<T, CohortToolsError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CohortToolsError {
    #[snafu(display("Failed to {action}"))]
    Store {
        source: StoreError,
        action: &'static str,
    },
    #[snafu(display("Unable to retrieve env var `{}`", name))]
    BadEnvVar {
        source: dotenvy::Error,
        name: &'static str,
    },
    #[snafu(display("Unable to parse port {:?}", original))]
    ParsePort {
        source: ParseIntError,
        original: String,
    },
    #[snafu(display("Invalid allowed origin {:?}", original))]
    ParseOrigin {
        source: axum::http::header::InvalidHeaderValue,
        original: String,
    },
    #[snafu(display("Unable to bind listener on port {}", port))]
    Bind { source: std::io::Error, port: u16 },
    #[snafu(display("Error serving the app"))]
    Serve { source: std::io::Error },
    #[snafu(display("Invalid JSON body: {}", source.body_text()))]
    JsonBody { source: JsonRejection },
    #[snafu(display("Invalid form body: {}", source.body_text()))]
    FormBody { source: FormRejection },
    #[snafu(display("Invalid path: {}", source.body_text()))]
    PathParam { source: PathRejection },
    #[snafu(context(false), display("{}", source))]
    Validation { source: ValidationError },
    #[snafu(display("Unable to find student with UUID: {}", id))]
    MissingStudent { id: Uuid },
    #[snafu(display("Unable to find cohort with UUID: {}", id))]
    MissingCohort { id: Uuid },
}

impl CohortToolsError {
    ///wraps a store failure, a merged record that broke the data rules is reported as invalid input
    pub fn from_store(source: StoreError, action: &'static str) -> Self {
        match source {
            StoreError::InvalidRecord { source } => Self::Validation { source },
            source => Self::Store { source, action },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        match self {
            Self::Store { source, .. } => match source {
                StoreError::DuplicateEmail { .. } => StatusCode::CONFLICT,
                StoreError::InvalidRecord { .. } => BI,
                _ => ISE,
            },
            Self::BadEnvVar { .. } | Self::ParsePort { .. } | Self::ParseOrigin { .. } => ISE,
            Self::Bind { .. } | Self::Serve { .. } => ISE,
            Self::JsonBody { source } => source.status(),
            Self::FormBody { source } => source.status(),
            Self::PathParam { .. } => BI,
            Self::Validation { .. } => BI,
            Self::MissingStudent { .. } | Self::MissingCohort { .. } => NF,
        }
    }

    ///the message handed back to clients, store failures the client didn't cause keep the per-route text
    fn client_message(&self) -> String {
        match self {
            Self::Store { source, .. } if source.is_client_error() => source.to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for CohortToolsError {
    fn from(source: JsonRejection) -> Self {
        Self::JsonBody { source }
    }
}

impl From<FormRejection> for CohortToolsError {
    fn from(source: FormRejection) -> Self {
        Self::FormBody { source }
    }
}

impl From<PathRejection> for CohortToolsError {
    fn from(source: PathRejection) -> Self {
        Self::PathParam { source }
    }
}

impl IntoResponse for CohortToolsError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(?self, "Error!");
        } else {
            warn!(error = %self, %status_code, "Rejected request");
        }

        (status_code, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_email_is_a_conflict_with_its_own_message() {
        let err = CohortToolsError::Store {
            source: StoreError::DuplicateEmail {
                email: "ana@x.com".into(),
            },
            action: "create the student",
        };

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.client_message().contains("ana@x.com"));
    }

    #[test]
    fn other_store_failures_use_the_route_message() {
        let err = CohortToolsError::Store {
            source: StoreError::MakeQuery {
                source: sqlx::Error::PoolTimedOut,
            },
            action: "retrieve students",
        };

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.client_message(), "Failed to retrieve students");
    }

    #[test]
    fn merged_record_failures_come_back_as_validation_errors() {
        let source = StoreError::InvalidRecord {
            source: ValidationError::InvalidField {
                field: "endDate",
                reason: "2024-01-01 is before the start date 2024-02-01".into(),
            },
        };
        let err = CohortToolsError::from_store(source, "update the cohort");

        assert!(matches!(err, CohortToolsError::Validation { .. }));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.client_message().starts_with("Invalid `endDate`"));
    }

    #[test]
    fn missing_records_are_not_found() {
        let id = Uuid::new_v4();
        assert_eq!(
            CohortToolsError::MissingStudent { id }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CohortToolsError::MissingCohort { id }.status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
