//! Merge rules: defaults, override order, conflict handling.

use crate::provider::ApiEndpoints;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("api.base_url", ApiEndpoints::DEFAULT_BASE_URL)?
        .set_default("api.api_key_env", "GEMINI_API_KEY")?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.initial_delay_ms", 1000)
}
