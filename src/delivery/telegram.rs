use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::Deliverer;
use crate::error::{AppResult, DeliveryError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API deliverer (sendMessage)
pub struct TelegramDeliverer {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramDeliverer {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, TELEGRAM_API_BASE.to_string())
    }

    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            token,
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Deliverer for TelegramDeliverer {
    async fn deliver(&self, user_id: i64, text: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&serde_json::json!({
                "chat_id": user_id,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse = response.json().await?;
        if !body.ok {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_default(),
            }
            .into());
        }

        debug!(user_id, "report delivered");
        Ok(())
    }
}
