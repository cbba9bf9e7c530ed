use anyhow::{Context, Result};

const DEV_JWT_SECRET: &str = "lifeline-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub twilio_api_base: String,
    pub alert_channel: String,
    pub default_country_code: String,
    pub sms_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set, using development fallback secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let config = Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/lifeline.db".into()),
            jwt_secret,
            token_ttl_days: std::env::var("TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()
                .context("TOKEN_TTL_DAYS must be a number")?,
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            twilio_api_base: std::env::var("TWILIO_API_BASE")
                .unwrap_or_else(|_| "https://api.twilio.com".into()),
            alert_channel: std::env::var("ALERT_CHANNEL").unwrap_or_else(|_| "sms".into()),
            default_country_code: std::env::var("DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "91".into()),
            sms_timeout_secs: std::env::var("SMS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .context("SMS_TIMEOUT_SECS must be a number")?,
            allowed_origins: parse_origins(
                &std::env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".into()),
            ),
        };

        if !config.messaging_configured() {
            tracing::warn!("Twilio credentials are not properly configured, alerts will fail to send");
        }

        Ok(config)
    }

    pub fn messaging_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty()
            && !self.twilio_auth_token.is_empty()
            && !self.twilio_phone_number.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            database_path: "data/lifeline.db".into(),
            jwt_secret: DEV_JWT_SECRET.into(),
            token_ttl_days: 7,
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            twilio_api_base: "https://api.twilio.com".into(),
            alert_channel: "sms".into(),
            default_country_code: "91".into(),
            sms_timeout_secs: 10,
            allowed_origins: vec!["http://localhost:3000".into()],
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        let origins = parse_origins(" https://a.example/ ,https://b.example,, ");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn default_config_has_no_messaging() {
        assert!(!Config::default().messaging_configured());
    }
}
