//! Configuration loading: merges defaults, global file, workspace files and environment.

use super::merge::merge_policy;
use super::sources::{env, global_file, workspace_file};
use super::NanoforgeConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: built-in defaults, global config file,
    /// `config/config.toml`, `config/{NANOFORGE_ENV}.toml`, `NANOFORGE__*` variables.
    pub fn load(workspace_root: &Path) -> Result<NanoforgeConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);

        let config: NanoforgeConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load a single explicit file over the defaults. Environment overrides still apply.
    pub fn load_from_file(path: &Path) -> Result<NanoforgeConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = env::add_to_builder(builder);

        let config: NanoforgeConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
