mod arm;
mod auth;
mod config;

pub use arm::{ArmCallError, ArmError};
pub use auth::AuthError;
pub use config::ConfigError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
