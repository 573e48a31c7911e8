//! Telegram Bot API delivery.

use std::sync::RwLock;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{FleetConfig, TelegramCredentials};
use crate::{AppError, BoxFuture, Result};

use super::Notifier;

const API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Telegram rejects messages longer than 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Posts to `sendMessage` with the credentials of the latest config snapshot.
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    credentials: RwLock<Option<TelegramCredentials>>,
}

impl TelegramNotifier {
    /// Build a notifier for `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Notify` if the HTTP client cannot be built.
    pub fn new(config: &FleetConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Notify(format!("failed to build http client: {err}")))?;
        let notifier = Self {
            http,
            api_base: API_BASE.to_owned(),
            credentials: RwLock::new(None),
        };
        notifier.reconfigure(config);
        Ok(notifier)
    }

    /// Point at a different API host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn credentials(&self) -> Option<TelegramCredentials> {
        self.credentials.read().ok().and_then(|guard| guard.clone())
    }
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_MESSAGE_CHARS).collect()
}

impl Notifier for TelegramNotifier {
    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let creds = self
                .credentials()
                .ok_or_else(|| AppError::Notify("telegram credentials not configured".into()))?;
            let url = format!("{}/bot{}/sendMessage", self.api_base, creds.token);
            let body = json!({
                "chat_id": creds.chat_id,
                "text": truncate(message),
                "disable_web_page_preview": true,
            });

            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|err| AppError::Notify(format!("telegram request failed: {}", err.without_url())))?;
            let status = response.status();
            let reply: ApiReply = response
                .json()
                .await
                .map_err(|err| AppError::Notify(format!("invalid telegram reply ({status}): {}", err.without_url())))?;
            if !reply.ok {
                return Err(AppError::Notify(format!(
                    "telegram rejected message ({status}): {}",
                    reply.description.unwrap_or_default()
                )));
            }
            debug!(chat_id = creds.chat_id, "telegram message delivered");
            Ok(())
        })
    }

    fn reconfigure(&self, config: &FleetConfig) {
        match self.credentials.write() {
            Ok(mut guard) => guard.clone_from(&config.telegram),
            Err(err) => warn!(%err, "telegram credential lock poisoned"),
        }
    }
}
