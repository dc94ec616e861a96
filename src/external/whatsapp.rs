use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::notifier::{LifecycleEvent, Notifier};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    event: &'a str,
    giveaway_id: i64,
    giveaway_name: &'a str,
    text: String,
}

/// 转发到 WhatsApp 机器人桥接服务（HTTP JSON）
#[derive(Clone)]
pub struct WhatsAppRelay {
    client: Client,
    relay_url: String,
    token: Option<String>,
}

impl WhatsAppRelay {
    pub fn new(relay_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url,
            token,
        }
    }
}

#[async_trait]
impl Notifier for WhatsAppRelay {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn deliver(&self, event: &LifecycleEvent) -> AppResult<()> {
        let g = event.giveaway();
        let message = RelayMessage {
            event: event.kind(),
            giveaway_id: g.id,
            giveaway_name: &g.name,
            text: event.summary(),
        };

        let mut request = self.client.post(&self.relay_url).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::NotificationFailure(format!(
                "WhatsApp relay HTTP {}",
                response.status().as_u16()
            )))
        }
    }
}
