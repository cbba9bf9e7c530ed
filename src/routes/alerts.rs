use crate::db::{self, queries};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{AlertStatus, TriggerAlertRequest, DEFAULT_ALERT_MESSAGE};
use crate::routes::AppJson;
use crate::services::alert::{self, AlertDetails};
use crate::state::AppState;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::json;

const ALERT_HISTORY_LIMIT: usize = 10;

/// POST /api/alerts: record an alert and notify every emergency contact.
pub async fn trigger_alert(
    state: State<AppState>,
    auth: Extension<AuthUser>,
    body: AppJson<TriggerAlertRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    send_alert(state, auth, body)
        .await
        .map_err(|e| e.or_failed("Failed to send alert"))
}

async fn send_alert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<TriggerAlertRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let new_alert = req.validate()?;

    let (user, contacts, record) = {
        let db = state.db.lock().await;
        let user = queries::get_user_by_id(&db, &auth.user_id)?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let contacts = queries::get_user_contacts_for_dispatch(&db, &auth.user_id)?;
        if contacts.is_empty() {
            return Err(AppError::BadRequest(
                "No emergency contacts found. Please add contacts first.".into(),
            ));
        }

        // Persisted before any send so the alert survives a crash mid-fanout.
        let record = queries::AlertRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            latitude: new_alert.latitude,
            longitude: new_alert.longitude,
            address: new_alert.address.clone(),
            message: new_alert
                .note
                .clone()
                .unwrap_or_else(|| DEFAULT_ALERT_MESSAGE.to_string()),
            status: AlertStatus::Sent,
            contacts_notified: 0,
            total_contacts: 0,
            created_at: db::now_timestamp(),
        };
        queries::insert_alert(&db, &record)?;
        (user, contacts, record)
    };

    let body = alert::format_alert_message(&AlertDetails {
        user_name: &user.name,
        latitude: new_alert.latitude,
        longitude: new_alert.longitude,
        address: new_alert.address.as_deref(),
        note: new_alert.note.as_deref(),
        sent_at: chrono::Utc::now(),
    });

    tracing::info!(
        "Sending alerts to {} contacts for user: {}",
        contacts.len(),
        user.name
    );
    let report = alert::dispatch(state.sender.as_ref(), &contacts, &body).await;

    let sent = report.sent();
    let total = report.total();
    let record = {
        let db = state.db.lock().await;
        queries::update_alert_outcome(
            &db,
            &record.id,
            report.alert_status(),
            sent as i64,
            total as i64,
        )?;
        queries::get_alert(&db, &record.id)?
            .ok_or_else(|| AppError::Internal(format!("alert {} vanished", record.id)))?
    };

    Ok(Json(json!({
        "alert": record,
        "message": format!("Emergency alert sent to {} out of {} contacts", sent, total),
        "contactsNotified": sent,
        "totalContacts": total,
        "results": report.outcomes,
    })))
}

/// GET /api/alerts: the caller's most recent alerts.
pub async fn list_alerts(
    state: State<AppState>,
    auth: Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    fetch_alerts(state, auth)
        .await
        .map_err(|e| e.or_failed("Failed to fetch alerts"))
}

async fn fetch_alerts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().await;
    let alerts = queries::get_recent_alerts(&db, &auth.user_id, ALERT_HISTORY_LIMIT)?;
    Ok(Json(json!({ "alerts": alerts })))
}
