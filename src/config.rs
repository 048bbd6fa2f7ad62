//! Configuration System
//!
//! Layered configuration for the generation pipeline: built-in defaults, the user's
//! global config file, workspace config files and `NANOFORGE__*` environment variables.
//! API access, retry behaviour, extra models and logging are all configured here.

use crate::error::ApiError;
use crate::generation::RetryPolicy;
use crate::logging::LoggingConfig;
use crate::models::{ModelEntry, ModelRegistry};
use crate::provider::ApiEndpoints;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NanoforgeConfig {
    /// Remote API access
    #[serde(default)]
    pub api: ApiConfig,

    /// Per-attempt retry behaviour
    #[serde(default)]
    pub retry: RetryConfig,

    /// Extra models merged over the built-in defaults
    #[serde(default)]
    pub models: Vec<ModelOverride>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Explicit key; takes precedence over `api_key_env`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    ApiEndpoints::DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Resolve the API key: explicit value first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ApiError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ApiError::MissingApiKey(self.api_key_env.clone())),
        }
    }

    pub fn endpoints(&self) -> Result<ApiEndpoints, ApiError> {
        Ok(ApiEndpoints::new(
            self.base_url.clone(),
            self.resolve_api_key()?,
        ))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("base_url cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            ));
        }
        if self.api_key_env.trim().is_empty() {
            return Err("api_key_env cannot be empty".to_string());
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("timeouts must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total calls per attempt, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before the first retry; doubles for each following one
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> usize {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}

fn default_initial_delay_ms() -> u64 {
    RetryPolicy::DEFAULT_INITIAL_DELAY.as_millis() as u64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

/// A `[[models]]` entry: display name and model id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOverride {
    pub name: String,
    pub id: String,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Api(String),
    Retry(String),
    Model(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Api(msg) => write!(f, "api: {}", msg),
            ValidationError::Retry(msg) => write!(f, "retry: {}", msg),
            ValidationError::Model(name, msg) => write!(f, "Model '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl NanoforgeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.api.validate() {
            errors.push(ValidationError::Api(e));
        }
        if let Err(e) = self.retry.validate() {
            errors.push(ValidationError::Retry(e));
        }
        for model in &self.models {
            if model.name.trim().is_empty() {
                errors.push(ValidationError::Model(
                    model.id.clone(),
                    "name cannot be empty".to_string(),
                ));
            }
            if model.id.trim().is_empty() {
                errors.push(ValidationError::Model(
                    model.name.clone(),
                    "id cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Built-in models with configured extras merged on top.
    pub fn model_registry(&self) -> ModelRegistry {
        let extras = ModelRegistry::new(
            self.models
                .iter()
                .map(|model| ModelEntry::new(model.name.clone(), model.id.clone()))
                .collect(),
        );
        ModelRegistry::defaults().merge(&extras)
    }
}

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
