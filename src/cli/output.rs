//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a single line for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::MissingApiKey(var) => format!(
            "Error: no API key. Export {} or set api.api_key in config/config.toml",
            var
        ),
        other => format!("Error: {}", other).replace('\n', " "),
    }
}
