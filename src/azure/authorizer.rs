use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Which credential acquisition path produced an [`Authorizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// SDK auth file referenced by `AZURE_AUTH_LOCATION`.
    File,
    /// Cluster service principal from an [`AuthContext`](super::AuthContext).
    ClientCredentials,
    /// Environment service principal or managed identity.
    Environment,
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStrategy::File => "file",
            AuthStrategy::ClientCredentials => "client-credentials",
            AuthStrategy::Environment => "environment",
        };
        f.write_str(name)
    }
}

/// Bearer token capability for ARM requests.
#[derive(Clone)]
pub struct Authorizer {
    strategy: AuthStrategy,
    access_token: String,
    expires_on: Option<DateTime<Utc>>,
}

impl Authorizer {
    pub fn new(
        strategy: AuthStrategy,
        access_token: impl Into<String>,
        expires_on: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            strategy,
            access_token: access_token.into(),
            expires_on,
        }
    }

    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.expires_on
    }

    /// An authorizer without a token cannot sign requests.
    pub fn is_empty(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    /// True within 5 minutes of expiry (inclusive). Tokens without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_on
            .is_some_and(|expiry| Utc::now() + Duration::minutes(5) >= expiry)
    }

    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.access_token)
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("strategy", &self.strategy)
            .field("access_token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_token_is_empty() {
        let authorizer = Authorizer::new(AuthStrategy::Environment, "  ", None);
        assert!(authorizer.is_empty());
        assert!(!Authorizer::new(AuthStrategy::Environment, "tok", None).is_empty());
    }

    #[test]
    fn is_expired_applies_five_minute_buffer() {
        let soon = Authorizer::new(
            AuthStrategy::File,
            "tok",
            Some(Utc::now() + Duration::minutes(4)),
        );
        let later = Authorizer::new(
            AuthStrategy::File,
            "tok",
            Some(Utc::now() + Duration::hours(1)),
        );
        assert!(soon.is_expired());
        assert!(!later.is_expired());
        assert!(!Authorizer::new(AuthStrategy::File, "tok", None).is_expired());
    }

    #[test]
    fn debug_never_prints_the_token() {
        let authorizer = Authorizer::new(AuthStrategy::ClientCredentials, "secret-token", None);
        assert!(!format!("{authorizer:?}").contains("secret-token"));
    }
}
