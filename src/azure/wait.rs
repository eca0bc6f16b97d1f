use backon::{BackoffBuilder, Retryable};
use std::time::Duration;
use tracing::error;

use super::client::GatewayClient;
use super::status::StatusClass;
use crate::error::{ArmCallError, ArmError, IsRetryable};

const FORBIDDEN_HINTS: &str = "Possible reasons: \
    AKS Service Principal requires 'Managed Identity Operator' access on Controller Identity; \
    'identityResourceID' and/or 'identityClientID' are incorrect in the Helm config; \
    AGIC Identity requires 'Contributor' access on Application Gateway and 'Reader' access on Application Gateway's Resource Group;";

/// Poll ARM for the Application Gateway until it answers, disappears, or `backoff` runs out.
///
/// A 404 ends the loop immediately with [`ArmError::GatewayNotFound`]. Every other failure,
/// including errors without any HTTP response, is retried; running out of retries yields
/// [`ArmError::ArmAuthRetryExhausted`].
pub async fn wait_for_arm_auth<C, B>(client: &C, backoff: B) -> Result<(), ArmError>
where
    C: GatewayClient + ?Sized,
    B: BackoffBuilder,
{
    let mut retries = 0usize;

    let result = (|| async {
        let err = match client.get_gateway().await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        report_status(&err);
        Err(err)
    })
    .retry(backoff)
    .when(|err: &ArmCallError| err.is_retryable())
    .notify(|err: &ArmCallError, pause: Duration| {
        retries += 1;
        error!(
            attempt = retries,
            error = %err,
            "Failed fetching config for App Gateway instance. Will retry in {:?}",
            pause
        );
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(err) if !err.is_retryable() => Err(ArmError::GatewayNotFound),
        Err(err) => {
            error!(
                retries,
                error = %err,
                "Tried {} times to authenticate with ARM",
                retries
            );
            Err(ArmError::ArmAuthRetryExhausted {
                attempts: retries + 1,
            })
        }
    }
}

fn report_status(err: &ArmCallError) {
    let Some(status) = err.status() else {
        return;
    };

    match StatusClass::classify(status) {
        StatusClass::Forbidden => error!(%status, "{}", FORBIDDEN_HINTS),
        StatusClass::NotFound => {
            error!("Got 404 NOT FOUND status code on getting Application Gateway from ARM.")
        }
        // 200 with an error means the body did not decode.
        StatusClass::Success => {}
        StatusClass::OtherTransient => error!(
            %status,
            "Unexpected ARM status code on GET existing App Gateway config: {}",
            status
        ),
    }
}
