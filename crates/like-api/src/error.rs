use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use like_db::StoreError;
use like_types::api::{ErrorBody, ErrorDetail};

/// Error taxonomy exposed by every handler. Each variant maps to one
/// status code and renders as the `{"error": {...}}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("Forbidden")]
    Forbidden,
    #[error("{0}")]
    Duplicate(String),
    #[error("Invalid state")]
    InvalidState,
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            // "Not logged in" responses are 400 by endpoint convention,
            // same as validation and uniqueness failures.
            ApiError::Validation(_)
            | ApiError::Unauthenticated(_)
            | ApiError::Duplicate(_)
            | ApiError::InvalidState => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Diagnostic detail goes in `errors`, never a raw stack trace.
        let errors = match &self {
            ApiError::Internal(source) => {
                error!("internal error: {source:#}");
                Some(vec![format!("{source:#}")])
            }
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: status.as_u16(),
                message: self.to_string(),
                errors,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => {
                ApiError::Duplicate("Username already in use".into())
            }
            StoreError::DuplicateEmail => ApiError::Duplicate("Email already in use".into()),
            StoreError::DuplicatePost => {
                ApiError::Duplicate("A post for today already exists for this user".into())
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_duplicates_map_to_field_specific_messages() {
        let err: ApiError = StoreError::DuplicateEmail.into();
        assert!(matches!(&err, ApiError::Duplicate(msg) if msg.contains("Email")));

        let err: ApiError = StoreError::DuplicateUsername.into();
        assert!(matches!(&err, ApiError::Duplicate(msg) if msg.contains("Username")));

        let err: ApiError = StoreError::DuplicatePost.into();
        assert!(matches!(&err, ApiError::Duplicate(msg) if msg.contains("today")));
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidState.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
