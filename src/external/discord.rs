use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::notifier::{LifecycleEvent, Notifier};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<WebhookEmbed>,
}

/// 通过 Discord 频道 webhook 推送活动事件
#[derive(Clone)]
pub struct DiscordWebhook {
    client: Client,
    webhook_url: String,
    site_url: Option<String>,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String, site_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            site_url,
        }
    }

    fn embed(&self, event: &LifecycleEvent) -> WebhookEmbed {
        let g = event.giveaway();
        let (title, color) = match event {
            LifecycleEvent::Created(_) => (format!("{} giveaway", g.name), 0xfdca4c),
            LifecycleEvent::Closed(_) => (format!("{} giveaway closed", g.name), 0x99aab5),
            LifecycleEvent::Completed(..) => (format!("{} giveaway", g.name), 0x4752c4),
            LifecycleEvent::Milestone(..) => (format!("{} giveaway", g.name), 0x00ff00),
        };
        WebhookEmbed {
            title,
            description: event.summary(),
            color,
            url: self
                .site_url
                .as_ref()
                .map(|base| format!("{}/giveaways/{}", base.trim_end_matches('/'), g.id)),
        }
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, event: &LifecycleEvent) -> AppResult<()> {
        let payload = WebhookPayload {
            embeds: vec![self.embed(event)],
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            log::debug!(
                "Discord notification sent: {} for giveaway {}",
                event.kind(),
                event.giveaway().id
            );
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::NotificationFailure(format!(
                "Discord webhook HTTP {}: {error_text}",
                status.as_u16()
            )))
        }
    }
}
