use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{Alert, Timestamp};

pub const REMINDER_TITLE: &str = "Auto-check bruxisme";
pub const REMINDER_BODY: &str = "Relâchez la mâchoire et répondez au mini-questionnaire.";
pub const REMINDER_ICON: &str = "/icons/icon-192.svg";

pub const TOAST_REMINDER: &str = "Notification programmée : répondez au questionnaire.";
pub const TOAST_PERMISSION_GRANTED: &str = "Notifications activées.";
pub const TOAST_PERMISSION_REFUSED: &str = "Autorisation refusée ou non disponible.";
pub const TOAST_ENTRY_SAVED: &str = "Observation enregistrée localement.";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Unsupported,
    Default,
    Granted,
    Denied,
}

pub fn reminder_alert(scheduled_at: Timestamp) -> Alert {
    Alert {
        title: REMINDER_TITLE.to_string(),
        body: REMINDER_BODY.to_string(),
        icon: REMINDER_ICON.to_string(),
        scheduled_at,
    }
}

/// Native notification delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> Permission;

    /// Resolves to the new permission state.
    async fn request_permission(&self) -> Permission;

    /// Only called while `permission()` is `Granted`.
    async fn fire(&self, alert: &Alert);
}

/// Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    async fn request_permission(&self) -> Permission {
        Permission::Unsupported
    }

    async fn fire(&self, alert: &Alert) {
        info!("notify:: {} - {}", alert.title, alert.body);
    }
}

/// Posts notifications as JSON to a webhook (ntfy, a desktop bridge, ...).
/// Permission is granted once the webhook has answered a GET request.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    permission: RwLock<Permission>,
}

impl WebhookNotifier {
    /// `timeout` bounds every request, so a webhook that never answers cannot
    /// hold up the polling loop.
    pub fn new(url: String, timeout: Duration) -> Result<WebhookNotifier, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(WebhookNotifier {
            client,
            url,
            permission: RwLock::new(Permission::Default),
        })
    }

    fn set_permission(&self, permission: Permission) {
        if let Ok(mut current) = self.permission.write() {
            *current = permission;
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn permission(&self) -> Permission {
        self.permission.read().map(|p| *p).unwrap_or(Permission::Default)
    }

    async fn request_permission(&self) -> Permission {
        if self.permission() == Permission::Granted {
            return Permission::Granted;
        }

        let permission = match self.client.get(&self.url).send().await {
            Ok(res) if res.status().is_success() => Permission::Granted,
            Ok(res) => {
                warn!("notify:: webhook permission check refused: status={}", res.status());
                Permission::Denied
            }
            Err(e) => {
                warn!("notify:: webhook permission check failed: {e}");
                Permission::Denied
            }
        };
        self.set_permission(permission);
        permission
    }

    async fn fire(&self, alert: &Alert) {
        let body = get_webhook_body(alert);
        let result = self.client.post(&self.url)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(res) => {
                let status = res.status();
                debug!("notify:: webhook response: status={}", status);
                if !status.is_success() {
                    let text = res.text().await.unwrap_or_default();
                    error!("notify:: webhook rejected notification: status={}, {}", status, text);
                }
            },
            Err(e) => error!("notify:: webhook error: {e}"),
        }
    }
}

fn get_webhook_body(alert: &Alert) -> serde_json::Value {
    json!({
        "title": alert.title,
        "body": alert.body,
        "icon": alert.icon,
        "scheduledAt": alert.scheduled_at,
        "timestamp": Local::now().to_rfc3339(),
    })
}

/// The in-app message slot. A newer message replaces the current one.
#[derive(Default)]
pub struct ToastBoard {
    message: Mutex<Option<String>>,
}

impl ToastBoard {
    pub fn new() -> ToastBoard {
        ToastBoard::default()
    }

    pub fn post(&self, message: &str) {
        if let Ok(mut current) = self.message.lock() {
            *current = Some(message.to_string());
        }
    }

    pub fn current(&self) -> Option<String> {
        self.message.lock().ok().and_then(|m| m.clone())
    }

    pub fn dismiss(&self) {
        if let Ok(mut current) = self.message.lock() {
            *current = None;
        }
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;
