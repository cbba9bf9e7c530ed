//! Personal-safety alert service: users keep a short list of emergency
//! contacts and fan out an SMS alert with their location in one call.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
