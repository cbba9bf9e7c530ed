use crate::db::{self, queries};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};
use crate::routes::AppJson;
use crate::services::auth::{hash_password, verify_password};
use crate::state::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::json;

/// POST /api/auth/register
pub async fn register(
    state: State<AppState>,
    body: AppJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    register_user(state, body)
        .await
        .map_err(|e| e.or_failed("Registration failed"))
}

async fn register_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let new_user = req.validate()?;

    {
        let db = state.db.lock().await;
        if queries::get_user_by_email(&db, &new_user.email)?.is_some() {
            return Err(AppError::BadRequest("User already exists".into()));
        }
    }

    let password = new_user.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))??;

    let now = db::now_timestamp();
    let user = queries::UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        email: new_user.email,
        password_hash,
        name: new_user.name,
        phone: new_user.phone,
        created_at: now.clone(),
        updated_at: now,
    };

    {
        let db = state.db.lock().await;
        // A concurrent registration may have claimed the email while we were hashing.
        if queries::get_user_by_email(&db, &user.email)?.is_some() {
            return Err(AppError::BadRequest("User already exists".into()));
        }
        queries::insert_user(&db, &user)?;
    }

    let token = state.tokens.sign(&user.id, &user.email)?;
    tracing::info!("Registered user {} ({})", user.id, user.email);

    Ok(Json(AuthResponse {
        user: user.to_public(),
        token,
    }))
}

/// POST /api/auth/login
pub async fn login(
    state: State<AppState>,
    body: AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    login_user(state, body)
        .await
        .map_err(|e| e.or_failed("Login failed"))
}

async fn login_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.validate()?;

    let user = {
        let db = state.db.lock().await;
        queries::get_user_by_email(&db, &email)?
    };
    let user = user.ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    let password = req.password;
    let stored = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;
    if !valid {
        tracing::info!("Failed login for {}", email);
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = state.tokens.sign(&user.id, &user.email)?;
    Ok(Json(AuthResponse {
        user: user.to_public(),
        token,
    }))
}

/// GET /api/auth/me
pub async fn me(
    state: State<AppState>,
    auth: Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    current_user(state, auth)
        .await
        .map_err(|e| e.or_failed("Failed to fetch user"))
}

async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().await;
    let user = queries::get_user_by_id(&db, &auth.user_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(json!({ "user": user.to_public() })))
}
