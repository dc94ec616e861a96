pub mod discord;
pub mod notifier;
pub mod whatsapp;

pub use discord::*;
pub use notifier::*;
pub use whatsapp::*;

use crate::config::NotificationConfig;
use std::sync::Arc;

/// 根据配置组装通知渠道；未配置的渠道跳过
pub fn build_dispatcher(config: &NotificationConfig) -> NotificationDispatcher {
    let mut sinks: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(url) = &config.discord_webhook_url {
        sinks.push(Arc::new(DiscordWebhook::new(
            url.clone(),
            config.site_url.clone(),
        )));
    }
    if let Some(url) = &config.whatsapp_relay_url {
        sinks.push(Arc::new(WhatsAppRelay::new(
            url.clone(),
            config.whatsapp_relay_token.clone(),
        )));
    }
    if sinks.is_empty() {
        log::warn!("No notification channel configured, lifecycle events will only be logged");
    }
    NotificationDispatcher::new(sinks)
}
