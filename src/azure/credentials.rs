use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{AuthType, ClientId, ClientSecret, Scope, TokenResponse, TokenUrl};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use super::auth_file::SdkAuthFile;
use super::authorizer::{AuthStrategy, Authorizer};
use crate::error::AuthError;

/// Environment variable naming the SDK auth file.
pub const AUTH_LOCATION_ENV: &str = "AZURE_AUTH_LOCATION";
const CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";
const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";

const IMDS_TOKEN_PATH: &str = "metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

/// The three ways the selector can obtain an [`Authorizer`].
///
/// Each call is a single attempt; retrying is the caller's job.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Authorize from the SDK auth file located by the credential source itself.
    async fn authorizer_from_file(&self) -> Result<Authorizer, AuthError>;

    /// Authorize a service principal with the client-credentials grant.
    async fn authorizer_from_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<Authorizer, AuthError>;

    /// Authorize from environment variables, falling back to managed identity.
    async fn authorizer_from_environment(&self) -> Result<Authorizer, AuthError>;
}

/// Azure AD, ARM and IMDS endpoints for the target cloud.
#[derive(Debug, Clone)]
pub struct CloudEndpoints {
    pub authority_host: Url,
    pub resource_manager: Url,
    pub imds_endpoint: Url,
}

/// Service principal settings taken from `AZURE_*` environment variables.
#[derive(Clone, Default)]
pub struct EnvironmentCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
}

impl EnvironmentCredentials {
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            client_id: read(CLIENT_ID_ENV),
            client_secret: read(CLIENT_SECRET_ENV),
            tenant_id: read(TENANT_ID_ENV),
        }
    }
}

/// [`CredentialSource`] backed by Azure AD and the instance metadata service.
pub struct AzureCredentials {
    http_client: reqwest::Client,
    cloud: CloudEndpoints,
    auth_file: Option<PathBuf>,
    environment: Option<EnvironmentCredentials>,
}

impl AzureCredentials {
    /// `http_client` should not follow redirects; token endpoints must answer directly.
    pub fn new(http_client: reqwest::Client, cloud: CloudEndpoints) -> Self {
        Self {
            http_client,
            cloud,
            auth_file: None,
            environment: None,
        }
    }

    /// Use this auth file instead of resolving `AZURE_AUTH_LOCATION`.
    pub fn with_auth_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_file = Some(path.into());
        self
    }

    /// Use these settings instead of reading `AZURE_*` variables at call time.
    pub fn with_environment(mut self, environment: EnvironmentCredentials) -> Self {
        self.environment = Some(environment);
        self
    }

    fn auth_file_path(&self) -> Result<PathBuf, AuthError> {
        if let Some(path) = &self.auth_file {
            return Ok(path.clone());
        }
        std::env::var_os(AUTH_LOCATION_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or(AuthError::MissingAuthLocation)
    }

    async fn request_client_credentials(
        &self,
        strategy: AuthStrategy,
        authority_host: &Url,
        resource: &Url,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<Authorizer, AuthError> {
        for (field, value) in [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("tenant_id", tenant_id),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::MalformedCredentials { field });
            }
        }

        let token_url =
            with_trailing_slash(authority_host).join(&format!("{tenant_id}/oauth2/v2.0/token"))?;
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_client_secret(ClientSecret::new(client_secret.to_string()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(TokenUrl::from_url(token_url));

        let token: BasicTokenResponse = client
            .exchange_client_credentials()
            .add_scope(Scope::new(default_scope(resource)))
            .request_async(&self.http_client)
            .await?;

        let expires_on = token
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        debug!(%strategy, tenant_id, ?expires_on, "Acquired ARM token via client credentials");
        Ok(Authorizer::new(
            strategy,
            token.access_token().secret().clone(),
            expires_on,
        ))
    }

    async fn request_managed_identity(
        &self,
        client_id: Option<&str>,
    ) -> Result<Authorizer, AuthError> {
        let mut url = with_trailing_slash(&self.cloud.imds_endpoint).join(IMDS_TOKEN_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api-version", IMDS_API_VERSION)
                .append_pair("resource", self.cloud.resource_manager.as_str());
            if let Some(client_id) = client_id {
                query.append_pair("client_id", client_id);
            }
        }

        let resp = self
            .http_client
            .get(url)
            .header("Metadata", "true")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::UpstreamStatus(resp.status()));
        }

        let token: ManagedIdentityToken = resp.json().await?;
        let expires_on = token
            .expires_on
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        debug!(
            client_id = client_id.unwrap_or("<system-assigned>"),
            ?expires_on,
            "Acquired ARM token via managed identity"
        );
        Ok(Authorizer::new(
            AuthStrategy::Environment,
            token.access_token,
            expires_on,
        ))
    }
}

#[async_trait]
impl CredentialSource for AzureCredentials {
    async fn authorizer_from_file(&self) -> Result<Authorizer, AuthError> {
        let path = self.auth_file_path()?;
        let file = SdkAuthFile::from_file(&path)?;
        let authority = file
            .active_directory_endpoint_url
            .as_ref()
            .unwrap_or(&self.cloud.authority_host);
        let resource = file
            .resource_manager_endpoint_url
            .as_ref()
            .unwrap_or(&self.cloud.resource_manager);

        self.request_client_credentials(
            AuthStrategy::File,
            authority,
            resource,
            &file.client_id,
            &file.client_secret,
            &file.tenant_id,
        )
        .await
    }

    async fn authorizer_from_client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<Authorizer, AuthError> {
        self.request_client_credentials(
            AuthStrategy::ClientCredentials,
            &self.cloud.authority_host,
            &self.cloud.resource_manager,
            client_id,
            client_secret,
            tenant_id,
        )
        .await
    }

    async fn authorizer_from_environment(&self) -> Result<Authorizer, AuthError> {
        let env = self
            .environment
            .clone()
            .unwrap_or_else(EnvironmentCredentials::from_env);

        if let (Some(client_id), Some(client_secret), Some(tenant_id)) =
            (&env.client_id, &env.client_secret, &env.tenant_id)
        {
            return self
                .request_client_credentials(
                    AuthStrategy::Environment,
                    &self.cloud.authority_host,
                    &self.cloud.resource_manager,
                    client_id,
                    client_secret,
                    tenant_id,
                )
                .await;
        }

        // AZURE_CLIENT_ID alone selects a user-assigned identity.
        self.request_managed_identity(env.client_id.as_deref()).await
    }
}

#[derive(Deserialize)]
struct ManagedIdentityToken {
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_epoch_lax")]
    expires_on: Option<i64>,
}

/// IMDS sends `expires_on` as a string of epoch seconds; some hosts send a number.
fn deserialize_epoch_lax<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::Null => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expires_on out of range")),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for expires_on",
        )),
    }
}

fn default_scope(resource: &Url) -> String {
    format!("{}/.default", resource.as_str().trim_end_matches('/'))
}

pub(crate) fn with_trailing_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scope_strips_trailing_slash() {
        let resource = Url::parse("https://management.azure.com/").expect("url");
        assert_eq!(
            default_scope(&resource),
            "https://management.azure.com/.default"
        );
    }

    #[test]
    fn trailing_slash_keeps_authority_path_segment() {
        let authority = Url::parse("https://adfs.contoso.com/adfs").expect("url");
        let joined = with_trailing_slash(&authority)
            .join("tenant/oauth2/v2.0/token")
            .expect("join");
        assert_eq!(
            joined.as_str(),
            "https://adfs.contoso.com/adfs/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn managed_identity_expiry_accepts_string_or_number() {
        let from_string: ManagedIdentityToken =
            serde_json::from_str(r#"{"access_token":"t","expires_on":"1700000000"}"#)
                .expect("string expiry");
        let from_number: ManagedIdentityToken =
            serde_json::from_str(r#"{"access_token":"t","expires_on":1700000000}"#)
                .expect("number expiry");
        let missing: ManagedIdentityToken =
            serde_json::from_str(r#"{"access_token":"t"}"#).expect("missing expiry");

        assert_eq!(from_string.expires_on, Some(1_700_000_000));
        assert_eq!(from_number.expires_on, Some(1_700_000_000));
        assert_eq!(missing.expires_on, None);
    }
}
