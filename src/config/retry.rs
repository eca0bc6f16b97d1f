use backon::ConstantBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget shared by the auth loop and the gateway fetch loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a loop makes at most `max_auth_retry_count + 1` calls.
    /// TOML: `retry.max_auth_retry_count`. Default: `10`.
    #[serde(default = "default_max_auth_retry_count")]
    pub max_auth_retry_count: usize,

    /// Fixed pause between attempts. Fractional seconds are accepted.
    /// TOML: `retry.retry_pause_secs`. Default: `10`.
    #[serde(
        rename = "retry_pause_secs",
        with = "duration_secs",
        default = "default_retry_pause"
    )]
    pub retry_pause: Duration,
}

impl RetryPolicy {
    pub fn new(max_auth_retry_count: usize, retry_pause: Duration) -> Self {
        Self {
            max_auth_retry_count,
            retry_pause,
        }
    }

    pub fn retry_pause(&self) -> Duration {
        self.retry_pause
    }

    /// Fixed-interval backoff without jitter.
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.retry_pause)
            .with_max_times(self.max_auth_retry_count)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_auth_retry_count: default_max_auth_retry_count(),
            retry_pause: default_retry_pause(),
        }
    }
}

fn default_max_auth_retry_count() -> usize {
    10
}

fn default_retry_pause() -> Duration {
    Duration::from_secs(10)
}

/// `Duration` as a number of seconds; integers and floats both deserialize.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid retry pause {secs}: {e}")))
    }
}
