use reqwest::StatusCode;
use thiserror::Error as ThisError;

use super::IsRetryable;
use crate::azure::StatusClass;

/// Failure of a single "get Application Gateway" call against ARM.
#[derive(Debug, ThisError)]
pub enum ArmCallError {
    /// No HTTP response at all (DNS failure, connection refused, TLS...).
    #[error("ARM request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("ARM returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode ARM response (status {status}): {source}")]
    Decode {
        status: StatusCode,
        source: reqwest::Error,
    },
}

impl ArmCallError {
    /// HTTP status of the underlying response, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ArmCallError::Transport(_) => None,
            ArmCallError::Status { status, .. } | ArmCallError::Decode { status, .. } => {
                Some(*status)
            }
        }
    }

    pub fn status_class(&self) -> Option<StatusClass> {
        self.status().map(StatusClass::classify)
    }
}

impl IsRetryable for ArmCallError {
    fn is_retryable(&self) -> bool {
        self.status_class() != Some(StatusClass::NotFound)
    }
}

/// Terminal outcome of the startup retry loops.
#[derive(Debug, ThisError)]
pub enum ArmError {
    #[error("Application Gateway not found")]
    GatewayNotFound,

    #[error("failed to get authorization token after {attempts} attempts")]
    AuthRetryExhausted { attempts: usize },

    #[error("failed to authenticate with ARM after {attempts} attempts")]
    ArmAuthRetryExhausted { attempts: usize },
}
