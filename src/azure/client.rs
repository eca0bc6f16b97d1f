use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::authorizer::Authorizer;
use super::credentials::with_trailing_slash;
use crate::error::ArmCallError;
use crate::utils::logging::with_pretty_json_debug;

const NETWORK_API_VERSION: &str = "2019-09-01";
const ARM_BODY_PREVIEW_CHARS: usize = 300;

/// Boundary over the single ARM operation the startup loop needs.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Fetch the configured Application Gateway.
    async fn get_gateway(&self) -> Result<ApplicationGateway, ArmCallError>;
}

/// Coordinates of an Application Gateway resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl GatewayId {
    fn resource_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/applicationGateways/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}

/// Application Gateway resource as returned by ARM. `properties` is kept opaque.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationGateway {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

/// [`GatewayClient`] calling the ARM REST API with a pre-acquired [`Authorizer`].
pub struct ArmClient {
    http_client: reqwest::Client,
    authorizer: Authorizer,
    gateway_url: Url,
}

impl ArmClient {
    pub fn new(
        http_client: reqwest::Client,
        authorizer: Authorizer,
        resource_manager: &Url,
        gateway: &GatewayId,
    ) -> Result<Self, url::ParseError> {
        let mut gateway_url =
            with_trailing_slash(resource_manager).join(&gateway.resource_path())?;
        gateway_url
            .query_pairs_mut()
            .append_pair("api-version", NETWORK_API_VERSION);
        Ok(Self {
            http_client,
            authorizer,
            gateway_url,
        })
    }

    pub fn gateway_url(&self) -> &Url {
        &self.gateway_url
    }
}

#[async_trait]
impl GatewayClient for ArmClient {
    async fn get_gateway(&self) -> Result<ApplicationGateway, ArmCallError> {
        if self.authorizer.is_expired() {
            warn!(
                expires_on = ?self.authorizer.expires_on(),
                "ARM token is expired or about to expire"
            );
        }

        let resp = self
            .authorizer
            .authorize(self.http_client.get(self.gateway_url.clone()))
            .send()
            .await
            .map_err(ArmCallError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.bytes().await {
                Ok(bytes) => {
                    let raw_body = String::from_utf8_lossy(&bytes);
                    format!("{:.len$}", raw_body, len = ARM_BODY_PREVIEW_CHARS)
                }
                Err(e) => format!("<failed to read body: {e}>"),
            };
            return Err(ArmCallError::Status { status, body });
        }

        let gateway: ApplicationGateway = resp
            .json()
            .await
            .map_err(|source| ArmCallError::Decode { status, source })?;

        with_pretty_json_debug(&gateway, |pretty| {
            debug!(url = %self.gateway_url, body = %pretty, "Fetched Application Gateway");
        });
        Ok(gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::AuthStrategy;

    #[test]
    fn gateway_url_targets_network_provider() {
        let client = ArmClient::new(
            reqwest::Client::new(),
            Authorizer::new(AuthStrategy::Environment, "tok", None),
            &Url::parse("https://management.azure.com/").expect("url"),
            &GatewayId {
                subscription_id: "sub".to_string(),
                resource_group: "rg".to_string(),
                name: "appgw".to_string(),
            },
        )
        .expect("client");

        assert_eq!(
            client.gateway_url().as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/applicationGateways/appgw?api-version=2019-09-01"
        );
    }
}
