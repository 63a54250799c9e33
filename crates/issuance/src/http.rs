//! Label Issuance API over HTTP (JSON).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::api::{LabelApiError, LabelIssuanceApi, LabelRequest, LabelResponse};
use crate::config::{ConfigError, LabelApiConfig};

/// Error body returned by the label API on failure.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// POSTs label requests to `<base_url>/labels`.
#[derive(Debug, Clone)]
pub struct HttpLabelApi {
    client: reqwest::Client,
    config: LabelApiConfig,
}

impl HttpLabelApi {
    pub fn new(config: LabelApiConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LabelApiConfig {
        &self.config
    }
}

#[async_trait]
impl LabelIssuanceApi for HttpLabelApi {
    async fn create_label(&self, request: &LabelRequest) -> Result<LabelResponse, LabelApiError> {
        let url = self.config.labels_url();
        debug!(%url, order_id = %request.order_id, carrier_code = %request.carrier_code, "posting label request");

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LabelApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabelApiError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body, status.canonical_reason()),
            });
        }

        let label: LabelResponse = response
            .json()
            .await
            .map_err(|e| LabelApiError::MalformedResponse(e.to_string()))?;

        if label.tracking_number.trim().is_empty() {
            return Err(LabelApiError::MalformedResponse(
                "response has no tracking number".to_string(),
            ));
        }

        Ok(label)
    }
}

/// Best message from an error body: `message`, then `error`, then the raw
/// body, then the HTTP reason phrase.
fn rejection_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(msg) = payload.message.or(payload.error).filter(|m| !m.trim().is_empty()) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    reason.unwrap_or("unknown error").to_string()
}
