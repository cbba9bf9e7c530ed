use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::services::auth::bearer_token;
use crate::state::AppState;

/// Identity attached to requests that passed `require_user`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(|t| t.to_string());

    let Some(token) = token else {
        return AppError::Unauthorized("Unauthorized".into()).into_response();
    };

    match state.tokens.verify(&token) {
        Some(claims) => {
            req.extensions_mut().insert(AuthUser {
                user_id: claims.user_id,
                email: claims.email,
            });
            next.run(req).await
        }
        None => AppError::Unauthorized("Invalid token".into()).into_response(),
    }
}
