use agw_armauth::azure::{
    ArmClient, AzureCredentials, CloudProviderConfig, build_http_client,
    get_authorizer_with_retry, wait_for_arm_auth,
};
use agw_armauth::config::Config;
use agw_armauth::utils::logging::init_tracing;
use mimalloc::MiMalloc;
use tracing::info;
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    init_tracing(&cfg.basic.loglevel);

    let auth_location = cfg.azure.auth_location();
    info!(
        auth_location = %auth_location,
        use_managed_identity = cfg.azure.use_managed_identity,
        cloud_provider_config = ?cfg.azure.cloud_provider_config,
        gateway_name = %cfg.azure.gateway_name,
        max_auth_retry_count = cfg.retry.max_auth_retry_count,
        retry_pause = ?cfg.retry.retry_pause()
    );

    let cloud_provider = cfg
        .azure
        .cloud_provider_config
        .as_deref()
        .map(CloudProviderConfig::from_file)
        .transpose()?;
    let auth_context = cloud_provider.as_ref().map(CloudProviderConfig::auth_context);
    let gateway = cfg.azure.gateway_id(cloud_provider.as_ref())?;

    let http_client = build_http_client()?;
    let credentials = AzureCredentials::new(http_client.clone(), cfg.azure.cloud_endpoints());

    let authorizer = get_authorizer_with_retry(
        &credentials,
        &auth_location,
        cfg.azure.use_managed_identity,
        auth_context.as_ref(),
        cfg.retry.backoff(),
    )
    .await?;
    info!(strategy = %authorizer.strategy(), "Obtained ARM authorizer");

    let client = ArmClient::new(
        http_client,
        authorizer,
        &cfg.azure.resource_manager,
        &gateway,
    )?;
    wait_for_arm_auth(&client, cfg.retry.backoff()).await?;

    info!(
        subscription_id = %gateway.subscription_id,
        resource_group = %gateway.resource_group,
        gateway_name = %gateway.name,
        "Application Gateway is reachable with the configured ARM credentials"
    );
    Ok(())
}
