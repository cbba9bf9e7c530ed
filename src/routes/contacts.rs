use crate::db::{self, queries};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{CreateContactRequest, MAX_CONTACTS_PER_USER};
use crate::routes::AppJson;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::json;

/// GET /api/contacts
pub async fn list_contacts(
    state: State<AppState>,
    auth: Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    fetch_contacts(state, auth)
        .await
        .map_err(|e| e.or_failed("Failed to fetch contacts"))
}

async fn fetch_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().await;
    let contacts = queries::get_user_contacts(&db, &auth.user_id)?;
    Ok(Json(json!({ "contacts": contacts })))
}

/// POST /api/contacts
pub async fn create_contact(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    body: AppJson<CreateContactRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    insert_contact(state, auth, body)
        .await
        .map_err(|e| e.or_failed("Failed to create contact"))
}

async fn insert_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreateContactRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let new_contact = req.validate()?;

    let contact = queries::ContactRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: auth.user_id.clone(),
        name: new_contact.name,
        phone: new_contact.phone,
        email: new_contact.email,
        relation: new_contact.relation,
        created_at: db::now_timestamp(),
    };

    {
        // Count and insert under one lock so the cap holds under concurrent requests.
        let db = state.db.lock().await;
        if queries::get_user_by_id(&db, &auth.user_id)?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }
        if queries::count_contacts(&db, &auth.user_id)? >= MAX_CONTACTS_PER_USER {
            return Err(AppError::BadRequest(format!(
                "Maximum of {} contacts allowed",
                MAX_CONTACTS_PER_USER
            )));
        }
        queries::insert_contact(&db, &contact)?;
    }

    tracing::info!("User {} added contact {}", auth.user_id, contact.id);
    Ok(Json(json!({ "contact": contact })))
}

/// DELETE /api/contacts/{id}
pub async fn delete_contact(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    id: Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    remove_contact(state, auth, id)
        .await
        .map_err(|e| e.or_failed("Failed to delete contact"))
}

async fn remove_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = {
        let db = state.db.lock().await;
        queries::delete_contact(&db, &id, &auth.user_id)?
    };
    if !removed {
        return Err(AppError::NotFound("Contact not found".into()));
    }

    tracing::info!("User {} removed contact {}", auth.user_id, id);
    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}
