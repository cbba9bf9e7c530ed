use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::queries::ContactRecord;
use crate::models::{AlertStatus, MAX_CONTACTS_PER_USER};
use crate::services::sms::MessageSender;

/// Everything that goes into the outbound alert text.
#[derive(Debug)]
pub struct AlertDetails<'a> {
    pub user_name: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<&'a str>,
    pub note: Option<&'a str>,
    pub sent_at: DateTime<Utc>,
}

pub fn format_alert_message(details: &AlertDetails<'_>) -> String {
    let mut lines = vec![
        "🚨 EMERGENCY ALERT 🚨".to_string(),
        format!("{} is in danger.", details.user_name),
        format!(
            "📍 Location: https://maps.google.com/?q={},{}",
            details.latitude, details.longitude
        ),
    ];
    if let Some(address) = details.address {
        lines.push(format!("📍 Address: {}", address));
    }
    if let Some(note) = details.note {
        lines.push(format!("💬 Message: {}", note));
    }
    lines.push(format!(
        "📅 Time: {}",
        details.sent_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push("📞 Please reach out immediately.".to_string());
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Result of one send attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub contact: String,
    pub phone: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Sent)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// `Sent` if anyone was reached, `Failed` otherwise.
    pub fn alert_status(&self) -> AlertStatus {
        if self.sent() > 0 {
            AlertStatus::Sent
        } else {
            AlertStatus::Failed
        }
    }
}

/// Send `body` to each contact in order, at most `MAX_CONTACTS_PER_USER`.
///
/// A failed send is recorded and the loop moves on; this never returns early.
pub async fn dispatch(
    sender: &dyn MessageSender,
    contacts: &[ContactRecord],
    body: &str,
) -> DispatchReport {
    if contacts.len() > MAX_CONTACTS_PER_USER {
        tracing::warn!(
            "{} contacts on file, only the first {} are notified",
            contacts.len(),
            MAX_CONTACTS_PER_USER
        );
    }

    let mut report = DispatchReport::default();
    for contact in contacts.iter().take(MAX_CONTACTS_PER_USER) {
        tracing::info!("Sending alert to {} ({})", contact.name, contact.phone);
        let outcome = match sender.send(&contact.phone, body).await {
            Ok(receipt) => DeliveryOutcome {
                contact: contact.name.clone(),
                phone: contact.phone.clone(),
                status: DeliveryStatus::Sent,
                message_id: Some(receipt.sid),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Failed to send alert to {} ({}): {:#}", contact.name, contact.phone, e);
                DeliveryOutcome {
                    contact: contact.name.clone(),
                    phone: contact.phone.clone(),
                    status: DeliveryStatus::Failed,
                    message_id: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    tracing::info!(
        "Alert sending completed: {} successful, {} failed",
        report.sent(),
        report.failed()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sms::DeliveryReceipt;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Fails for any number listed in `failing`, records every attempt.
    struct ScriptedSender {
        failing: Vec<&'static str>,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageSender for ScriptedSender {
        async fn send(&self, to: &str, _body: &str) -> Result<DeliveryReceipt> {
            self.attempts.lock().unwrap().push(to.to_string());
            if self.failing.iter().any(|f| *f == to) {
                bail!("carrier rejected {}", to);
            }
            Ok(DeliveryReceipt {
                sid: format!("SM{}", to),
                status: Some("queued".into()),
            })
        }
    }

    fn contacts(n: usize) -> Vec<ContactRecord> {
        (0..n)
            .map(|i| ContactRecord {
                id: format!("c{i}"),
                user_id: "u1".into(),
                name: format!("Contact {i}"),
                phone: format!("900000000{i}"),
                email: None,
                relation: "friend".into(),
                created_at: String::new(),
            })
            .collect()
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_fanout() {
        let sender = ScriptedSender {
            failing: vec!["9000000001"],
            attempts: Mutex::new(Vec::new()),
        };
        let report = dispatch(&sender, &contacts(3), "help").await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.sent(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.alert_status(), AlertStatus::Sent);
        assert_eq!(report.outcomes[1].status, DeliveryStatus::Failed);
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("carrier rejected"));
        assert_eq!(report.outcomes[2].message_id.as_deref(), Some("SM9000000002"));
        assert_eq!(
            *sender.attempts.lock().unwrap(),
            vec!["9000000000", "9000000001", "9000000002"]
        );
    }

    #[tokio::test]
    async fn all_failures_mark_the_alert_failed() {
        let sender = ScriptedSender {
            failing: vec!["9000000000", "9000000001"],
            attempts: Mutex::new(Vec::new()),
        };
        let report = dispatch(&sender, &contacts(2), "help").await;
        assert_eq!(report.sent(), 0);
        assert_eq!(report.alert_status(), AlertStatus::Failed);
    }

    #[tokio::test]
    async fn fanout_is_bounded() {
        let sender = ScriptedSender {
            failing: vec![],
            attempts: Mutex::new(Vec::new()),
        };
        let report = dispatch(&sender, &contacts(7), "help").await;
        assert_eq!(report.total(), MAX_CONTACTS_PER_USER);
        assert_eq!(sender.attempts.lock().unwrap().len(), MAX_CONTACTS_PER_USER);
    }

    #[test]
    fn message_includes_optional_lines_only_when_present() {
        let sent_at = Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 5).unwrap();
        let bare = format_alert_message(&AlertDetails {
            user_name: "Asha",
            latitude: 12.9716,
            longitude: 77.5946,
            address: None,
            note: None,
            sent_at,
        });
        assert_eq!(
            bare,
            "🚨 EMERGENCY ALERT 🚨\n\
             Asha is in danger.\n\
             📍 Location: https://maps.google.com/?q=12.9716,77.5946\n\
             📅 Time: 2024-03-01 18:30:05 UTC\n\
             📞 Please reach out immediately."
        );

        let full = format_alert_message(&AlertDetails {
            user_name: "Asha",
            latitude: 12.9716,
            longitude: 77.5946,
            address: Some("MG Road, Bengaluru"),
            note: Some("car broke down"),
            sent_at,
        });
        assert!(full.contains("\n📍 Address: MG Road, Bengaluru\n"));
        assert!(full.contains("\n💬 Message: car broke down\n"));
    }
}
