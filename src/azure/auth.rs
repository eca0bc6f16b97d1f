use backon::{BackoffBuilder, Retryable};
use std::time::Duration;
use tracing::{debug, error};

use super::authorizer::{AuthStrategy, Authorizer};
use super::context::AuthContext;
use super::credentials::CredentialSource;
use crate::error::{ArmError, AuthError};

/// Pick the credential strategy.
///
/// 1. A non-empty `auth_location` selects the SDK auth file.
/// 2. Otherwise, without managed identity and with a context, the cluster service principal.
/// 3. Otherwise the environment (env service principal or managed identity).
pub fn choose_strategy(
    auth_location: &str,
    use_managed_identity: bool,
    auth_context: Option<&AuthContext>,
) -> AuthStrategy {
    if !auth_location.is_empty() {
        return AuthStrategy::File;
    }
    if !use_managed_identity && auth_context.is_some() {
        return AuthStrategy::ClientCredentials;
    }
    AuthStrategy::Environment
}

/// Single attempt at building an [`Authorizer`] with the strategy [`choose_strategy`] picks.
pub async fn select_authorizer<S>(
    source: &S,
    auth_location: &str,
    use_managed_identity: bool,
    auth_context: Option<&AuthContext>,
) -> Result<Authorizer, AuthError>
where
    S: CredentialSource + ?Sized,
{
    match (
        choose_strategy(auth_location, use_managed_identity, auth_context),
        auth_context,
    ) {
        (AuthStrategy::File, _) => {
            debug!(
                auth_location,
                "Creating authorizer from file referenced by environment variable"
            );
            source.authorizer_from_file().await
        }
        (AuthStrategy::ClientCredentials, Some(ctx)) => {
            debug!("Creating authorizer using Cluster Service Principal");
            source
                .authorizer_from_client_credentials(
                    ctx.client_id.as_deref().unwrap_or_default(),
                    ctx.client_secret.as_deref().unwrap_or_default(),
                    ctx.tenant_id.as_deref().unwrap_or_default(),
                )
                .await
        }
        _ => {
            debug!("Creating authorizer from Azure Managed Service Identity");
            source.authorizer_from_environment().await
        }
    }
}

/// Retry [`select_authorizer`] until it yields a non-empty authorizer or `backoff` runs out.
///
/// Every failure is retried the same way; the last one is logged and reported as
/// [`ArmError::AuthRetryExhausted`].
pub async fn get_authorizer_with_retry<S, B>(
    source: &S,
    auth_location: &str,
    use_managed_identity: bool,
    auth_context: Option<&AuthContext>,
    backoff: B,
) -> Result<Authorizer, ArmError>
where
    S: CredentialSource + ?Sized,
    B: BackoffBuilder,
{
    let mut retries = 0usize;

    let result = (|| async {
        let authorizer =
            select_authorizer(source, auth_location, use_managed_identity, auth_context).await?;
        if authorizer.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        Ok(authorizer)
    })
    .retry(backoff)
    .notify(|err: &AuthError, pause: Duration| {
        retries += 1;
        error!(
            attempt = retries,
            error = %err,
            "Failed fetching authorization token for ARM. Will retry in {:?}",
            pause
        );
    })
    .await;

    result.map_err(|err| {
        error!(
            retries,
            error = %err,
            "Tried {} times to get ARM authorization token",
            retries
        );
        ArmError::AuthRetryExhausted {
            attempts: retries + 1,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_location_wins_over_everything() {
        let ctx = AuthContext::new("a", "b", "c");
        assert_eq!(
            choose_strategy("/etc/auth.json", true, Some(&ctx)),
            AuthStrategy::File
        );
        assert_eq!(
            choose_strategy("/etc/auth.json", false, None),
            AuthStrategy::File
        );
    }

    #[test]
    fn managed_identity_ignores_auth_context() {
        let ctx = AuthContext::new("a", "b", "c");
        assert_eq!(
            choose_strategy("", true, Some(&ctx)),
            AuthStrategy::Environment
        );
    }

    #[test]
    fn auth_context_selects_client_credentials() {
        let ctx = AuthContext::new("a", "b", "c");
        assert_eq!(
            choose_strategy("", false, Some(&ctx)),
            AuthStrategy::ClientCredentials
        );
    }

    #[test]
    fn nothing_configured_falls_back_to_environment() {
        assert_eq!(choose_strategy("", false, None), AuthStrategy::Environment);
    }
}
