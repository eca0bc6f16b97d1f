mod azure;
mod basic;
mod retry;

pub use azure::AzureConfig;
pub use basic::BasicConfig;
pub use retry::RetryPolicy;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Credentials and gateway coordinates (see `azure` table in config.toml).
    #[serde(default)]
    pub azure: AzureConfig,

    /// Retry budget for both startup loops (see `retry` table in config.toml).
    #[serde(default)]
    pub retry: RetryPolicy,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "AGW_";

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and `AGW_` env vars.
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Self = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the fields that have no usable default.
    ///
    /// Subscription and resource group may still come from the cloud provider config, so only
    /// the gateway name is required here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.azure.gateway_name.trim().is_empty() {
            return Err(ConfigError::Missing("azure.gateway_name"));
        }
        Ok(())
    }
}
