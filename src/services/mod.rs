pub mod alert;
pub mod auth;
pub mod sms;
