use anyhow::Result;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::models::{AlertStatus, PublicUser};

impl ToSql for AlertStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AlertStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        AlertStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown alert status {s:?}").into()))
    }
}

// --- Users ---
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRecord {
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(UserRecord {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            phone: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, created_at, updated_at";

pub fn insert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, name, phone, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.name,
            user.phone,
            user.created_at,
            user.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRecord>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            UserRecord::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRecord>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            UserRecord::from_row,
        )
        .optional()?;
    Ok(user)
}

// --- Contacts ---
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub relation: String,
    pub created_at: String,
}

impl ContactRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ContactRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            email: row.get(4)?,
            relation: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

pub fn insert_contact(conn: &Connection, contact: &ContactRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO contacts (id, user_id, name, phone, email, relation, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            contact.id,
            contact.user_id,
            contact.name,
            contact.phone,
            contact.email,
            contact.relation,
            contact.created_at
        ],
    )?;
    Ok(())
}

pub fn count_contacts(conn: &Connection, user_id: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contacts WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Contacts owned by `user_id`, newest first.
pub fn get_user_contacts(conn: &Connection, user_id: &str) -> Result<Vec<ContactRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, email, relation, created_at FROM contacts WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![user_id], ContactRecord::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Contacts owned by `user_id` in the order they were added, for alert fan-out.
pub fn get_user_contacts_for_dispatch(conn: &Connection, user_id: &str) -> Result<Vec<ContactRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, email, relation, created_at FROM contacts WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(params![user_id], ContactRecord::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Deletes a contact only if `user_id` owns it. Returns whether a row was removed.
pub fn delete_contact(conn: &Connection, id: &str, user_id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM contacts WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(removed > 0)
}

// --- Alerts ---
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub message: String,
    pub status: AlertStatus,
    pub contacts_notified: i64,
    pub total_contacts: i64,
    pub created_at: String,
}

impl AlertRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AlertRecord {
            id: row.get(0)?,
            user_id: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            address: row.get(4)?,
            message: row.get(5)?,
            status: row.get(6)?,
            contacts_notified: row.get(7)?,
            total_contacts: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

const ALERT_COLUMNS: &str =
    "id, user_id, latitude, longitude, address, message, status, contacts_notified, total_contacts, created_at";

pub fn insert_alert(conn: &Connection, alert: &AlertRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO alerts (id, user_id, latitude, longitude, address, message, status, contacts_notified, total_contacts, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            alert.id,
            alert.user_id,
            alert.latitude,
            alert.longitude,
            alert.address,
            alert.message,
            alert.status,
            alert.contacts_notified,
            alert.total_contacts,
            alert.created_at
        ],
    )?;
    Ok(())
}

pub fn update_alert_outcome(
    conn: &Connection,
    id: &str,
    status: AlertStatus,
    contacts_notified: i64,
    total_contacts: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE alerts SET status = ?2, contacts_notified = ?3, total_contacts = ?4 WHERE id = ?1",
        params![id, status, contacts_notified, total_contacts],
    )?;
    Ok(())
}

pub fn get_alert(conn: &Connection, id: &str) -> Result<Option<AlertRecord>> {
    let alert = conn
        .query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
            params![id],
            AlertRecord::from_row,
        )
        .optional()?;
    Ok(alert)
}

/// The `limit` most recent alerts for `user_id`, newest first.
pub fn get_recent_alerts(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<AlertRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![user_id, limit as i64], AlertRecord::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
