use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("configuration value `{0}` must be set and non-empty")]
    Missing(&'static str),

    #[error("failed to read cloud provider config {}: {source}", .path.display())]
    CloudProviderRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid cloud provider config {}: {source}", .path.display())]
    CloudProviderParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Extract(Box::new(e))
    }
}
