//! Briefing delivery (text-to-speech plus a chat push).
//!
//! Only the logging stub exists; a real implementation plugs in behind
//! `BriefingDelivery`.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IntegrationError;

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub success: bool,
    pub message: String,
    pub telegram_message_id: String,
}

#[async_trait]
pub trait BriefingDelivery: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt, IntegrationError>;
}

/// Logs the briefing and reports a mock success.
#[derive(Debug, Default, Clone)]
pub struct LoggingDelivery;

#[async_trait]
impl BriefingDelivery for LoggingDelivery {
    async fn deliver(&self, text: &str) -> Result<DeliveryReceipt, IntegrationError> {
        let receipt = DeliveryReceipt {
            success: true,
            message: "Audio briefing generated and sent to Telegram".to_string(),
            telegram_message_id: format!("mock_telegram_msg_{}", Utc::now().timestamp_millis()),
        };
        info!(
            chars = text.chars().count(),
            receipt = %receipt.telegram_message_id,
            "Briefing delivery stubbed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_delivery_returns_mock_receipt() {
        let receipt = LoggingDelivery.deliver("Good morning!").await.unwrap();
        assert!(receipt.success);
        assert!(receipt.telegram_message_id.starts_with("mock_telegram_msg_"));

        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json.get("telegramMessageId").is_some());
    }
}
