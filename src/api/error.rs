//! API Errors
//! Mission: Map every failure to a status code and a `{success: false}` body

use crate::error::LedgerError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    BadRequest(String), // body could not be parsed
    MissingToken,
    Forbidden(&'static str),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Ledger(err @ LedgerError::InvalidReference { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_reference", err.to_string())
            }
            ApiError::Ledger(err @ LedgerError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            ApiError::Ledger(err @ LedgerError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", err.to_string())
            }
            ApiError::Ledger(LedgerError::Storage(detail)) => {
                error!("Storage failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_failure",
                    "Storage is unavailable, try again later".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing authorization token".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_statuses() {
        let cases = [
            (LedgerError::invalid_reference("user", "x"), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("Game"), StatusCode::NOT_FOUND),
            (LedgerError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(ApiError::MissingToken.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden("nope").into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
