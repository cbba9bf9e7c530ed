use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::TestSmsRequest;
use crate::routes::AppJson;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;

/// POST /api/test-sms: send one message through the provider to check the setup.
pub async fn send_test_sms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<TestSmsRequest>,
) -> Result<Response, AppError> {
    let phone = req.phone_number.as_deref().map(str::trim).unwrap_or_default();
    let message = req.message.as_deref().map(str::trim).unwrap_or_default();
    if phone.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest(
            "Phone number and message are required".into(),
        ));
    }

    tracing::info!("User {} testing SMS send to {}", auth.user_id, phone);
    match state.sender.send(phone, message).await {
        Ok(receipt) => Ok(Json(json!({
            "success": true,
            "message": "SMS sent successfully",
            "twilioResponse": {
                "sid": receipt.sid,
                "status": receipt.status,
            }
        }))
        .into_response()),
        Err(e) => {
            tracing::error!("Test SMS error: {:#}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to send SMS",
                    "details": format!("{:#}", e),
                })),
            )
                .into_response())
        }
    }
}
