//! Generative API Provider
//!
//! HTTP boundary for the generation pipeline: the transport trait the orchestrator
//! talks through, a reqwest-backed implementation, endpoint construction and the two
//! request payload shapes.

use crate::config::ApiConfig;
use crate::error::{ApiError, AttemptError};
use crate::generation::types::ReferenceImage;
use crate::models::{ModelListResponse, ModelRegistry};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpExchange {
    pub status: u16,
    pub body: String,
}

/// Transport used by the orchestrator. Non-2xx statuses are returned as exchanges;
/// only failures to complete the exchange are errors.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpExchange, AttemptError>;

    async fn get(&self, url: &str) -> Result<HttpExchange, AttemptError>;
}

// Transport failures are always retryable; status handling happens in classification.
fn map_http_error(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::network(format!("Request timeout: {}", error.without_url()))
    } else if error.is_connect() {
        AttemptError::network(format!("Connection error: {}", error.without_url()))
    } else {
        AttemptError::network(format!("HTTP error: {}", error.without_url()))
    }
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn read(response: reqwest::Response) -> Result<HttpExchange, AttemptError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_http_error)?;
        Ok(HttpExchange { status, body })
    }
}

#[async_trait]
impl GenerationTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpExchange, AttemptError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(map_http_error)?;
        Self::read(response).await
    }

    async fn get(&self, url: &str) -> Result<HttpExchange, AttemptError> {
        let response = self.client.get(url).send().await.map_err(map_http_error)?;
        Self::read(response).await
    }
}

/// URL builder for the generative API. The key travels as a query parameter, so
/// anything logged goes through [`ApiEndpoints::redact`].
#[derive(Clone)]
pub struct ApiEndpoints {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ApiEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEndpoints")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

impl ApiEndpoints {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta/";

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }

    pub fn models_url(&self) -> String {
        format!("{}models?key={}", self.base_url, self.api_key)
    }

    pub fn predict_url(&self, model_id: &str) -> String {
        format!(
            "{}{}:predict?key={}",
            self.base_url,
            model_path(model_id),
            self.api_key
        )
    }

    pub fn generate_content_url(&self, model_id: &str) -> String {
        format!(
            "{}{}:generateContent?key={}",
            self.base_url,
            model_path(model_id),
            self.api_key
        )
    }

    /// Replace the API key in `url` for logging.
    pub fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.replace(&self.api_key, "***")
    }
}

fn model_path(model_id: &str) -> String {
    let model_id = model_id.trim_start_matches('/');
    if model_id.contains('/') {
        model_id.to_string()
    } else {
        format!("models/{}", model_id)
    }
}

/// Body for `:predict`: one instance, `sample_count` images.
pub fn predict_payload(prompt: &str, sample_count: usize) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": { "sampleCount": sample_count },
    })
}

/// Body for `:generateContent`: prompt text plus inline reference images, one candidate.
pub fn generate_content_payload(prompt: &str, references: &[ReferenceImage]) -> Value {
    let mut parts = vec![json!({ "text": prompt })];
    for image in references {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type,
                "data": BASE64.encode(&image.bytes),
            }
        }));
    }
    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": { "candidateCount": 1 },
    })
}

/// Fetch the live model listing and keep the image-capable entries.
pub async fn fetch_available_models(
    transport: &dyn GenerationTransport,
    endpoints: &ApiEndpoints,
) -> Result<ModelRegistry, ApiError> {
    let url = endpoints.models_url();
    debug!(url = %endpoints.redact(&url), "Fetching model listing");
    let exchange = transport.get(&url).await?;
    if !(200..300).contains(&exchange.status) {
        return Err(ApiError::ProviderError(format!(
            "Failed to list models: status {} - {}",
            exchange.status,
            exchange.body.trim()
        )));
    }
    let listing: ModelListResponse = serde_json::from_str(&exchange.body).map_err(|e| {
        ApiError::ProviderError(format!("Failed to parse models response: {}", e))
    })?;
    Ok(ModelRegistry::from_listing(&listing))
}
