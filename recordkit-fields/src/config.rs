//! Engine configuration loaded with figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `recordkit.toml` then `recordkit.yaml` in the given directory
//! 3. `RECORDKIT_*` environment variables (`RECORDKIT_SORT_ORDER_STEP=5`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FieldsError, Result};

pub const CONFIG_FILE_STEM: &str = "recordkit";
pub const ENV_PREFIX: &str = "RECORDKIT_";

/// Tunables for the schema mutation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsConfig {
    /// Gap between consecutive `sortOrder` values.
    pub sort_order_step: i64,
    /// Attempts at an auto-generated `fieldName` before giving up.
    pub max_create_retries: u32,
    /// Actor recorded in audit entries when the caller supplies none.
    pub actor: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            sort_order_step: 10,
            max_create_retries: 5,
            actor: "system".to_string(),
        }
    }
}

impl FieldsConfig {
    /// Load from defaults, optional config files in `dir`, and the environment.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(FieldsConfig::default()));
        if let Some(dir) = dir {
            figment = figment
                .merge(Toml::file(dir.join(format!("{CONFIG_FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{CONFIG_FILE_STEM}.yaml"))));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()));

        let config: FieldsConfig = figment
            .extract()
            .map_err(|e| FieldsError::Config(e.to_string()))?;
        config.validate()?;
        debug!(?config, "fields config loaded");
        Ok(config)
    }

    /// Reject values the mutation service cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sort_order_step <= 0 {
            return Err(FieldsError::Config(format!(
                "sort_order_step must be positive, got {}",
                self.sort_order_step
            )));
        }
        if self.max_create_retries == 0 {
            return Err(FieldsError::Config(
                "max_create_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
