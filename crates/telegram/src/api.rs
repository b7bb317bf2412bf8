//! Minimal Telegram Bot API client.
//!
//! API: https://core.telegram.org/bots/api

use askdb_core::config::TelegramConfig;
use askdb_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Slack on top of the long-poll timeout before the HTTP client gives up.
const REQUEST_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Sends replies to a chat.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<()>;
}

/// Yields batches of inbound updates.
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with `update_id >= offset`, waiting up to `timeout_secs`.
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> AppResult<Vec<Update>>;
}

/// Bot API over reqwest.
pub struct TelegramApi {
    client: reqwest::Client,
    /// `<api_url>/bot<token>`; never logged
    base_url: String,
}

impl TelegramApi {
    pub fn new(api_url: &str, token: &str, poll_timeout_secs: u64) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs) + REQUEST_SLACK)
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> AppResult<Self> {
        let token = config.require_token()?;
        Self::new(&config.api_url, token, config.poll_timeout_secs)
    }

    async fn call<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> AppResult<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await
            // Strip the URL so the token never reaches a log line
            .map_err(|e| AppError::Transport(format!("{} request failed: {}", method, e.without_url())))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            AppError::Transport(format!(
                "{} returned unreadable body ({}): {}",
                method,
                status,
                e.without_url()
            ))
        })?;

        unwrap_envelope(method, envelope)
    }
}

fn unwrap_envelope<T>(method: &str, envelope: ApiResponse<T>) -> AppResult<T> {
    if !envelope.ok {
        return Err(AppError::Transport(format!(
            "{} failed: {}",
            method,
            envelope
                .description
                .unwrap_or_else(|| "no description".to_string())
        )));
    }
    envelope
        .result
        .ok_or_else(|| AppError::Transport(format!("{} returned no result", method)))
}

#[async_trait::async_trait]
impl ChatTransport for TelegramApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<()> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl UpdateSource for TelegramApi {
    async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> AppResult<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: timeout_secs,
                allowed_updates: &["message"],
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_updates() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "date": 0,
                    "chat": {"id": 42, "type": "private"}, "text": "/start"}},
                {"update_id": 11, "message": {"message_id": 2, "date": 0,
                    "chat": {"id": 42, "type": "private"},
                    "photo": [{"file_id": "x", "file_unique_id": "y", "width": 1, "height": 1}]}},
                {"update_id": 12, "edited_message": {"message_id": 1}}
            ]
        }"#;

        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(body).unwrap();
        let updates = unwrap_envelope("getUpdates", envelope).unwrap();

        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));
        assert_eq!(updates[0].message.as_ref().unwrap().chat.id, 42);
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ApiResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#)
                .unwrap();
        let err = unwrap_envelope("getUpdates", envelope).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_get_updates_request_shape() {
        let json = serde_json::to_value(GetUpdatesRequest {
            offset: None,
            timeout: 30,
            allowed_updates: &["message"],
        })
        .unwrap();
        assert!(json.get("offset").is_none());
        assert_eq!(json["timeout"], 30);
        assert_eq!(json["allowed_updates"][0], "message");
    }

    #[test]
    fn test_base_url() {
        let api = TelegramApi::new("https://api.telegram.org/", "123:abc", 30).unwrap();
        assert_eq!(api.base_url, "https://api.telegram.org/bot123:abc");
    }
}
