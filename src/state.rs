use crate::config::Config;
use crate::services::auth::TokenIssuer;
use crate::services::sms::MessageSender;
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenIssuer>,
    pub sender: Arc<dyn MessageSender>,
}

impl AppState {
    pub fn new(conn: Connection, config: Config, sender: Arc<dyn MessageSender>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl_days);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            sender,
        }
    }
}
