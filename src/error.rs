use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input data")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    /// A server-side failure reported to the client under a route-specific message.
    #[error("{message}: {detail}")]
    Failed {
        message: &'static str,
        detail: String,
    },
}

impl AppError {
    /// Relabel server-side failures with `message`. Client errors pass through untouched.
    pub fn or_failed(self, message: &'static str) -> Self {
        match self {
            e @ (AppError::Internal(_) | AppError::Anyhow(_)) => AppError::Failed {
                message,
                detail: e.to_string(),
            },
            other => other,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new("body", &rejection.body_text())])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            AppError::Validation(details) => {
                tracing::debug!(%status, ?details, "rejected input");
                json!({ "error": "Invalid input data", "details": details })
            }
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::NotFound(msg) => {
                tracing::debug!(%status, error = %msg);
                json!({ "error": msg })
            }
            AppError::Failed { message, detail } => {
                tracing::error!(%status, error = %detail, "{}", message);
                json!({ "error": message })
            }
            other => {
                tracing::error!(%status, error = %other);
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_variant() {
        let cases = [
            (AppError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::Anyhow(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn server_failures_carry_the_route_message() {
        let err = AppError::Anyhow(anyhow::anyhow!("database is locked"))
            .or_failed("Failed to send alert");
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send alert");

        let err = AppError::Internal("join error".into()).or_failed("Registration failed");
        let (_, body) = error_body(err).await;
        assert_eq!(body["error"], "Registration failed");
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let err =
            AppError::BadRequest("User already exists".into()).or_failed("Registration failed");
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User already exists");

        let err =
            AppError::NotFound("Contact not found".into()).or_failed("Failed to delete contact");
        let (status, body) = error_body(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Contact not found");
    }
}
