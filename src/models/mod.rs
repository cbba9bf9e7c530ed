use crate::error::{AppError, FieldError};
use serde::{Deserialize, Serialize};

/// Upper bound on emergency contacts per user.
pub const MAX_CONTACTS_PER_USER: usize = 5;

pub const DEFAULT_ALERT_MESSAGE: &str = "Emergency alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Sent,
    Delivered,
    Failed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Sent => "SENT",
            AlertStatus::Delivered => "DELIVERED",
            AlertStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SENT" => Some(AlertStatus::Sent),
            "DELIVERED" => Some(AlertStatus::Delivered),
            "FAILED" => Some(AlertStatus::Failed),
            _ => None,
        }
    }
}

// --- Auth ---
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
}

/// A registration that passed validation, with fields normalised.
#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, AppError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_lowercase();
        let phone = self.phone.trim().to_string();

        let mut errors = Vec::new();
        if name.chars().count() < 2 {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
        }
        if !is_valid_email(&email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }
        if self.password.chars().count() < 6 {
            errors.push(FieldError::new("password", "Password must be at least 6 characters"));
        }
        if phone.chars().count() < 10 {
            errors.push(FieldError::new("phone", "Phone number must be at least 10 digits"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(NewUser {
            name,
            email,
            password: self.password,
            phone,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Returns the normalised email.
    pub fn validate(&self) -> Result<String, AppError> {
        let email = self.email.trim().to_lowercase();
        let mut errors = Vec::new();
        if !is_valid_email(&email) {
            errors.push(FieldError::new("email", "Invalid email address"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

// --- Contacts ---
#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relation: String,
}

impl CreateContactRequest {
    pub fn validate(self) -> Result<NewContact, AppError> {
        let name = self.name.trim().to_string();
        let phone = self.phone.trim().to_string();
        let relation = self.relation.trim().to_string();
        let email = self
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        let mut errors = Vec::new();
        if name.chars().count() < 2 {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
        }
        if phone.chars().count() < 10 {
            errors.push(FieldError::new("phone", "Phone number must be at least 10 digits"));
        }
        if let Some(ref e) = email {
            if !is_valid_email(e) {
                errors.push(FieldError::new("email", "Invalid email address"));
            }
        }
        if relation.is_empty() {
            errors.push(FieldError::new("relation", "Relation is required"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(NewContact {
            name,
            phone,
            email,
            relation,
        })
    }
}

// --- Alerts ---
#[derive(Debug, Deserialize)]
pub struct TriggerAlertRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct NewAlert {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    /// Custom note from the caller, if any.
    pub note: Option<String>,
}

impl TriggerAlertRequest {
    pub fn validate(self) -> Result<NewAlert, AppError> {
        let mut errors = Vec::new();
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            errors.push(FieldError::new("latitude", "Latitude must be between -90 and 90"));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            errors.push(FieldError::new("longitude", "Longitude must be between -180 and 180"));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(NewAlert {
            latitude: self.latitude,
            longitude: self.longitude,
            address: non_blank(self.address),
            note: non_blank(self.message),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSmsRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub messaging_configured: bool,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Structural email check: one `@`, a non-empty local part, and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
