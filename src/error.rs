use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Domain errors surfaced to the client as a stable error-code envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("User not found.")]
    UserNotFound { status: StatusCode },
    #[error("User with this username or email already exist.")]
    DuplicateEntry,
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Invalid or Expired Refresh Token.")]
    InvalidRefreshToken,
    #[error("User is not authorized for this operation.")]
    Unauthorized,
    #[error("Please attach JWT access token in headers.")]
    MissingToken,
    #[error("Invalid JWT access token.")]
    InvalidToken,
    #[error("Username already in use.")]
    DuplicateUsername,
    #[error("Phone number already in use.")]
    DuplicatePhone,
    #[error("Internal server error.")]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Lookup miss inside an authenticated or credentialed flow.
    pub fn user_not_found() -> Self {
        ApiError::UserNotFound {
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// Lookup miss during account-lookup, where the caller is unauthenticated.
    pub fn unknown_account() -> Self {
        ApiError::UserNotFound {
            status: StatusCode::UNAUTHORIZED,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::DuplicateEntry
            | ApiError::InvalidRefreshToken
            | ApiError::DuplicateUsername
            | ApiError::DuplicatePhone => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound { status } => *status,
            ApiError::InvalidCredentials
            | ApiError::Unauthorized
            | ApiError::MissingToken
            | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_DATA",
            ApiError::UserNotFound { .. } => "USER_NOT_FOUND",
            ApiError::DuplicateEntry => "DUPLICATE_ENTRY",
            ApiError::InvalidCredentials => "INVALID_CREDS",
            ApiError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ApiError::Unauthorized => "JWT_NOT_AUTHORIZED",
            ApiError::MissingToken => "MISSING_TOKEN",
            ApiError::InvalidToken => "INVALID_JWT_TOKEN",
            ApiError::DuplicateUsername => "DUPLICATE_USERNAME",
            ApiError::DuplicatePhone => "DUPLICATE_PHONE",
            ApiError::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // The store's unique constraints are the final arbiter for the
        // check-then-insert race; mask the constraint name behind the
        // generic "already exists" message.
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return ApiError::DuplicateEntry;
            }
        }
        ApiError::Internal(err.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    #[serde(rename = "errorCode")]
    error_code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!(error = ?cause, "internal error");
        }
        let body = ErrorBody {
            status: "error",
            error_code: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_are_stable() {
        let cases: Vec<(ApiError, &str, StatusCode)> = vec![
            (
                ApiError::InvalidInput("bad".into()),
                "INVALID_DATA",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::user_not_found(),
                "USER_NOT_FOUND",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::unknown_account(),
                "USER_NOT_FOUND",
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::DuplicateEntry,
                "DUPLICATE_ENTRY",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidCredentials,
                "INVALID_CREDS",
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::InvalidRefreshToken,
                "INVALID_REFRESH_TOKEN",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Unauthorized,
                "JWT_NOT_AUTHORIZED",
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::MissingToken,
                "MISSING_TOKEN",
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::InvalidToken,
                "INVALID_JWT_TOKEN",
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::DuplicateUsername,
                "DUPLICATE_USERNAME",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::DuplicatePhone,
                "DUPLICATE_PHONE",
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                "SERVER_ERROR",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn internal_error_masks_the_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Internal server error.");
    }

    #[test]
    fn envelope_shape() {
        let body = ErrorBody {
            status: "error",
            error_code: ApiError::InvalidCredentials.code(),
            message: ApiError::InvalidCredentials.to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["errorCode"], "INVALID_CREDS");
        assert_eq!(json["message"], "Invalid credentials.");
    }
}
