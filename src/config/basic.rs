use serde::{Deserialize, Serialize};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Env: `AGW_BASIC__LOGLEVEL`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: default_loglevel(),
        }
    }
}

fn default_loglevel() -> String {
    "info".to_string()
}
