//! HTTP implementation of the notification gateway.
//!
//! Talks to the to-do service's REST API:
//! - `POST {base}/api/todos` to issue a pending-action record
//! - `POST {base}/api/todos/retract` to retract one
//!
//! Each call carries a generated notice id so the remote side can
//! deduplicate retries.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{GatewayError, NotificationGateway, NotificationTarget};

/// Reqwest-backed gateway to the to-do service.
#[derive(Clone)]
pub struct HttpTodoGateway {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TodoEventPayload<'a> {
    notice_id: Uuid,
    item_id: &'a str,
    user_id: &'a str,
    display_name: &'a str,
    sent_at: chrono::DateTime<Utc>,
}

impl HttpTodoGateway {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn post(&self, path: &str, target: &NotificationTarget) -> Result<(), GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let payload = TodoEventPayload {
            notice_id: Uuid::new_v4(),
            item_id: &target.item_id,
            user_id: &target.user_id,
            display_name: &target.display_name,
            sent_at: Utc::now(),
        };

        let res = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("{} - {}", status, body)));
        }

        debug!(
            url = %url,
            item_id = %target.item_id,
            user_id = %target.user_id,
            "To-do call accepted"
        );
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for HttpTodoGateway {
    async fn issue(&self, target: &NotificationTarget) -> Result<(), GatewayError> {
        self.post("/api/todos", target).await
    }

    async fn retract(&self, target: &NotificationTarget) -> Result<(), GatewayError> {
        self.post("/api/todos/retract", target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let gateway = HttpTodoGateway::new("http://todo.internal/", reqwest::Client::new());
        assert_eq!(gateway.base_url, "http://todo.internal");
    }
}
