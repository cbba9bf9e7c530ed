use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// What the provider hands back for an accepted message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub sid: String,
    pub status: Option<String>,
}

/// Outbound messaging provider.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt>;

    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    WhatsApp,
}

impl Channel {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" | "" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::WhatsApp),
            other => bail!("unknown ALERT_CHANNEL {:?} (expected sms or whatsapp)", other),
        }
    }

    fn address(&self, number: &str) -> String {
        match self {
            Channel::Sms => number.to_string(),
            Channel::WhatsApp => format!("whatsapp:{}", number),
        }
    }
}

/// Normalise a phone number to E.164, assuming `country_code` for bare 10-digit numbers.
pub fn format_phone_number(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();

    if !country_code.is_empty()
        && digits.starts_with(country_code)
        && digits.len() == country_code.len() + 10
    {
        return format!("+{}", digits);
    }
    if digits.len() == 10 {
        return format!("+{}{}", country_code, digits);
    }
    if phone.starts_with('+') {
        return phone.to_string();
    }
    if digits.len() > 10 {
        return format!("+{}", digits);
    }
    phone.to_string()
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    code: Option<i64>,
    message: Option<String>,
}

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioSender {
    client: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: String,
    channel: Channel,
    country_code: String,
}

impl TwilioSender {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.sms_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.twilio_api_base.trim_end_matches('/').to_string(),
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from: config.twilio_phone_number.clone(),
            channel: Channel::parse(&config.alert_channel)?,
            country_code: config.default_country_code.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt> {
        if !self.is_configured() {
            bail!("messaging provider is not configured");
        }

        let to = self.channel.address(&format_phone_number(to, &self.country_code));
        let from = self.channel.address(&self.from);
        tracing::debug!(%to, %from, channel = ?self.channel, "Sending message");

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", from.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TwilioError>(&text)
                .ok()
                .and_then(|e| {
                    e.message
                        .map(|m| match e.code {
                            Some(code) => format!("{} (code {})", m, code),
                            None => m,
                        })
                })
                .unwrap_or(text);
            return Err(anyhow!("Twilio API error {}: {}", status, detail));
        }

        let msg: TwilioMessage = resp.json().await?;
        tracing::info!(sid = %msg.sid, %to, "Message accepted by provider");
        Ok(DeliveryReceipt {
            sid: msg.sid,
            status: msg.status,
        })
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn ten_digit_numbers_get_the_default_country_code() {
        assert_eq!(format_phone_number("98765 43210", "91"), "+919876543210");
        assert_eq!(format_phone_number("(555) 123-4567", "1"), "+15551234567");
    }

    #[test]
    fn numbers_already_carrying_the_country_code_get_a_plus() {
        assert_eq!(format_phone_number("919876543210", "91"), "+919876543210");
    }

    #[test]
    fn plus_prefixed_numbers_are_left_alone() {
        assert_eq!(format_phone_number("+44 20 7946 0958", "91"), "+44 20 7946 0958");
    }

    #[test]
    fn long_numbers_without_plus_are_prefixed() {
        assert_eq!(format_phone_number("00447946095812", "91"), "+00447946095812");
    }

    #[test]
    fn short_numbers_pass_through() {
        assert_eq!(format_phone_number("12345", "91"), "12345");
    }

    #[test]
    fn channel_parsing() {
        assert_eq!(Channel::parse("SMS").unwrap(), Channel::Sms);
        assert_eq!(Channel::parse("whatsapp").unwrap(), Channel::WhatsApp);
        assert!(Channel::parse("pigeon").is_err());
        assert_eq!(Channel::WhatsApp.address("+15551234567"), "whatsapp:+15551234567");
    }

    #[tokio::test]
    async fn unconfigured_sender_fails_without_network() {
        let sender = TwilioSender::from_config(&Config::default()).unwrap();
        assert!(!sender.is_configured());
        let err = sender.send("9876543210", "hi").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn messages_url_uses_account_sid() {
        let config = Config {
            twilio_account_sid: "AC123".into(),
            twilio_api_base: "http://localhost:9999/".into(),
            ..Config::default()
        };
        let sender = TwilioSender::from_config(&config).unwrap();
        assert_eq!(
            sender.messages_url(),
            "http://localhost:9999/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    type Captured = Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>;

    /// Stand-in for the provider's Messages endpoint. Rejects one number the way Twilio does.
    async fn spawn_fake_provider() -> (String, Captured) {
        async fn create_message(
            State(captured): State<Captured>,
            Path(sid): Path<String>,
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let auth = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let rejected = form.get("To").is_some_and(|to| to.ends_with("+15550000000"));
            captured.lock().unwrap().push((auth, form));
            if rejected {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "code": 21211, "message": "Invalid 'To' Phone Number" })),
                );
            }
            (
                StatusCode::CREATED,
                Json(json!({ "sid": format!("SM-{}", sid), "status": "queued" })),
            )
        }

        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/2010-04-01/Accounts/{sid}/Messages.json",
                post(create_message),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    fn live_config(api_base: &str, channel: &str) -> Config {
        Config {
            twilio_account_sid: "AC123".into(),
            twilio_auth_token: "secret".into(),
            twilio_phone_number: "+15557654321".into(),
            twilio_api_base: api_base.into(),
            alert_channel: channel.into(),
            default_country_code: "1".into(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn sms_send_posts_form_with_basic_auth() {
        let (base, captured) = spawn_fake_provider().await;
        let sender = TwilioSender::from_config(&live_config(&base, "sms")).unwrap();

        let receipt = sender.send("(555) 123-4567", "help me").await.unwrap();
        assert_eq!(receipt.sid, "SM-AC123");
        assert_eq!(receipt.status.as_deref(), Some("queued"));

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (auth, form) = &calls[0];
        // base64("AC123:secret")
        assert_eq!(auth.as_deref(), Some("Basic QUMxMjM6c2VjcmV0"));
        assert_eq!(form["To"], "+15551234567");
        assert_eq!(form["From"], "+15557654321");
        assert_eq!(form["Body"], "help me");
    }

    #[tokio::test]
    async fn whatsapp_channel_prefixes_both_addresses() {
        let (base, captured) = spawn_fake_provider().await;
        let sender = TwilioSender::from_config(&live_config(&base, "whatsapp")).unwrap();

        sender.send("5551234567", "help me").await.unwrap();

        let calls = captured.lock().unwrap();
        let (_, form) = &calls[0];
        assert_eq!(form["To"], "whatsapp:+15551234567");
        assert_eq!(form["From"], "whatsapp:+15557654321");
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_code_and_message() {
        let (base, _captured) = spawn_fake_provider().await;
        let sender = TwilioSender::from_config(&live_config(&base, "sms")).unwrap();

        let err = sender.send("+15550000000", "help me").await.unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Twilio API error 400"), "{}", text);
        assert!(text.contains("Invalid 'To' Phone Number"), "{}", text);
        assert!(text.contains("(code 21211)"), "{}", text);
    }
}
