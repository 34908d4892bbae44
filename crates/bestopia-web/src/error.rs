//! API error envelope: `{ "error": ..., "details": ... }` JSON bodies with
//! the status the failure class calls for.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bestopia_ingest::IngestError;
use bestopia_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, String, Option<String>) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string(), None),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
                None,
            ),
            Self::Ingest(err) => match err {
                IngestError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
                IngestError::Draft(msg) => (
                    StatusCode::BAD_GATEWAY,
                    "Drafting failed".to_string(),
                    Some(msg.clone()),
                ),
                IngestError::Persist(source) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to persist review".to_string(),
                    Some(source.to_string()),
                ),
            },
            Self::Store(err) => match err {
                StoreError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, format!("{what} not found"), None)
                }
                StoreError::EmailTaken => {
                    (StatusCode::BAD_REQUEST, "Email already in use".to_string(), None)
                }
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(other.to_string()),
                ),
            },
            Self::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(err.to_string()),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = self.status_and_body();
        let body = match details {
            Some(details) => serde_json::json!({ "error": error, "details": details }),
            None => serde_json::json!({ "error": error }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = ApiError::Ingest(IngestError::Validation("title is required".to_string()));
        let (status, error, details) = err.status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "title is required");
        assert!(details.is_none());
    }

    #[test]
    fn persistence_errors_keep_diagnostics_in_details() {
        let err = ApiError::Ingest(IngestError::Persist(StoreError::NotFound("review")));
        let (status, error, details) = err.status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error, "Failed to persist review");
        assert!(details.unwrap().contains("not found"));
    }

    #[test]
    fn store_not_found_is_a_404() {
        let err = ApiError::Store(StoreError::NotFound("product"));
        let (status, error, _) = err.status_and_body();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error, "product not found");
    }

    #[test]
    fn draft_failures_read_as_bad_gateway() {
        let err = ApiError::Ingest(IngestError::Draft("no blocks".to_string()));
        let (status, _, details) = err.status_and_body();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(details.as_deref(), Some("no blocks"));
    }
}
