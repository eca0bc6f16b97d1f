use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::azure::{AUTH_LOCATION_ENV, CloudEndpoints, CloudProviderConfig, GatewayId};
use crate::error::ConfigError;

/// Azure credential and Application Gateway settings managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureConfig {
    /// Gates SDK auth file authentication. The file itself is read from `AZURE_AUTH_LOCATION`.
    /// TOML: `azure.auth_location`. Falls back to the `AZURE_AUTH_LOCATION` environment variable.
    #[serde(default)]
    pub auth_location: Option<String>,

    /// Prefer managed identity over the cluster service principal.
    /// TOML: `azure.use_managed_identity`. Default: `false`.
    #[serde(default)]
    pub use_managed_identity: bool,

    /// Kubernetes cloud provider config (`azure.json`) holding the cluster service principal.
    /// TOML: `azure.cloud_provider_config`. Example: `/etc/kubernetes/azure.json`.
    #[serde(default)]
    pub cloud_provider_config: Option<PathBuf>,

    /// TOML: `azure.subscription_id`. Falls back to `subscriptionId` in the cloud provider config.
    #[serde(default)]
    pub subscription_id: Option<String>,

    /// TOML: `azure.resource_group`. Falls back to `resourceGroup` in the cloud provider config.
    #[serde(default)]
    pub resource_group: Option<String>,

    /// Application Gateway resource name (required).
    /// TOML: `azure.gateway_name`.
    #[serde(default)]
    pub gateway_name: String,

    /// TOML: `azure.authority_host`. Default: `https://login.microsoftonline.com/`.
    #[serde(default = "default_authority_host")]
    pub authority_host: Url,

    /// TOML: `azure.resource_manager`. Default: `https://management.azure.com/`.
    #[serde(default = "default_resource_manager")]
    pub resource_manager: Url,

    /// Instance metadata service base URL used for managed identity tokens.
    /// TOML: `azure.imds_endpoint`. Default: `http://169.254.169.254/`.
    #[serde(default = "default_imds_endpoint")]
    pub imds_endpoint: Url,
}

impl AzureConfig {
    /// Effective auth location; empty when file auth is not requested.
    pub fn auth_location(&self) -> String {
        self.auth_location
            .clone()
            .or_else(|| std::env::var(AUTH_LOCATION_ENV).ok())
            .unwrap_or_default()
    }

    pub fn cloud_endpoints(&self) -> CloudEndpoints {
        CloudEndpoints {
            authority_host: self.authority_host.clone(),
            resource_manager: self.resource_manager.clone(),
            imds_endpoint: self.imds_endpoint.clone(),
        }
    }

    /// Resolve the gateway coordinates, filling subscription and resource group from `azure.json`.
    pub fn gateway_id(
        &self,
        cloud_provider: Option<&CloudProviderConfig>,
    ) -> Result<GatewayId, ConfigError> {
        let subscription_id = non_empty(self.subscription_id.as_deref())
            .or_else(|| cloud_provider.and_then(|c| non_empty(c.subscription_id.as_deref())))
            .ok_or(ConfigError::Missing("azure.subscription_id"))?;
        let resource_group = non_empty(self.resource_group.as_deref())
            .or_else(|| cloud_provider.and_then(|c| non_empty(c.resource_group.as_deref())))
            .ok_or(ConfigError::Missing("azure.resource_group"))?;
        let name = non_empty(Some(self.gateway_name.as_str()))
            .ok_or(ConfigError::Missing("azure.gateway_name"))?;

        Ok(GatewayId {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            name: name.to_string(),
        })
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            auth_location: None,
            use_managed_identity: false,
            cloud_provider_config: None,
            subscription_id: None,
            resource_group: None,
            gateway_name: String::new(),
            authority_host: default_authority_host(),
            resource_manager: default_resource_manager(),
            imds_endpoint: default_imds_endpoint(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_authority_host() -> Url {
    Url::parse("https://login.microsoftonline.com/").expect("valid default authority host")
}

fn default_resource_manager() -> Url {
    Url::parse("https://management.azure.com/").expect("valid default resource manager")
}

fn default_imds_endpoint() -> Url {
    Url::parse("http://169.254.169.254/").expect("valid default IMDS endpoint")
}
