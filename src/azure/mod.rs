//! ARM authentication and the startup wait for the Application Gateway.

mod auth;
mod auth_file;
mod authorizer;
mod client;
mod context;
mod credentials;
mod status;
mod wait;

pub use auth::{choose_strategy, get_authorizer_with_retry, select_authorizer};
pub use auth_file::SdkAuthFile;
pub use authorizer::{AuthStrategy, Authorizer};
pub use client::{ApplicationGateway, ArmClient, GatewayClient, GatewayId};
pub use context::{AuthContext, CloudProviderConfig};
pub use credentials::{
    AUTH_LOCATION_ENV, AzureCredentials, CloudEndpoints, CredentialSource, EnvironmentCredentials,
};
pub use status::StatusClass;
pub use wait::wait_for_arm_auth;

use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for token endpoints and ARM. Redirects are disabled for token requests.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(HTTP_TIMEOUT)
        .build()
}
