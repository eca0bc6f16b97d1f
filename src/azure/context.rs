use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;

/// Service principal credentials for the client-credentials strategy.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthContext {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
}

impl AuthContext {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            tenant_id: Some(tenant_id.into()),
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// The subset of the Kubernetes cloud provider config (`azure.json`) read at startup.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProviderConfig {
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub aad_client_id: Option<String>,
    pub aad_client_secret: Option<String>,
}

impl CloudProviderConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::CloudProviderRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::CloudProviderParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded cloud provider config");
        Ok(cfg)
    }

    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            client_id: self.aad_client_id.clone(),
            client_secret: self.aad_client_secret.clone(),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_context_reads_aad_fields() {
        let cfg: CloudProviderConfig = serde_json::from_str(
            r#"{
                "cloud": "AzurePublicCloud",
                "tenantId": "tenant-1",
                "subscriptionId": "sub-1",
                "aadClientId": "client-1",
                "aadClientSecret": "secret-1",
                "resourceGroup": "rg-1",
                "useManagedIdentityExtension": false
            }"#,
        )
        .expect("parse azure.json");

        assert_eq!(
            cfg.auth_context(),
            AuthContext::new("client-1", "secret-1", "tenant-1")
        );
        assert_eq!(cfg.resource_group.as_deref(), Some("rg-1"));
    }

    #[test]
    fn debug_redacts_client_secret() {
        let ctx = AuthContext::new("id", "super-secret", "tenant");
        let rendered = format!("{ctx:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
