pub mod azure;
pub mod config;
pub mod error;
pub mod utils;

pub use azure::{
    AuthContext, Authorizer, GatewayClient, get_authorizer_with_retry, wait_for_arm_auth,
};
pub use error::{ArmError, AuthError};
