use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::DeliveryError;
use crate::mirror::WebhookTarget;
use crate::platform::WebhookSender;
use crate::transform::OutboundPayload;

const DEFAULT_API_BASE: &str = "https://discord.com/api";

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    #[serde(default)]
    retry_after: f64,
}

/// Executes webhooks over plain HTTP; no bot session is needed.
pub struct WebhookClient {
    client: reqwest::Client,
    api_base: String,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE)
    }

    pub fn with_base_url(api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn execute_url(&self, target: &WebhookTarget) -> String {
        format!(
            "{}/webhooks/{}/{}",
            self.api_base,
            target.id(),
            target.token()
        )
    }
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSender for WebhookClient {
    async fn send(
        &self,
        target: &WebhookTarget,
        payload: &OutboundPayload,
    ) -> Result<(), DeliveryError> {
        debug!("Executing {}", target);

        let response = self
            .client
            .post(self.execute_url(target))
            .json(payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body: RateLimitBody = response.json().await.unwrap_or(RateLimitBody {
                retry_after: 0.0,
            });
            return Err(DeliveryError::RateLimited {
                retry_after: body.retry_after,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
