use aws_config::{ConfigLoader, Region, SdkConfig};
use tracing::{debug, info};

use crate::config::AwsBaseConfig;

fn loader(config: &AwsBaseConfig) -> ConfigLoader {
    let loader = aws_config::from_env().region(Region::new(config.region.clone()));
    match &config.endpoint_url {
        Some(endpoint) => loader.endpoint_url(endpoint),
        None => loader,
    }
}

/// Build an AWS SDK configuration from the given [`AwsBaseConfig`].
///
/// Credentials come from the standard environment chain. When `role_arn`
/// is set, they are exchanged through STS for the role's credentials, which
/// the SDK refreshes before expiry.
pub async fn build_sdk_config(config: &AwsBaseConfig) -> SdkConfig {
    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
    }

    let Some(role_arn) = &config.role_arn else {
        return loader(config).load().await;
    };

    let session_name = config.session_name.as_deref().unwrap_or("watify");
    info!(role_arn = %role_arn, session_name = %session_name, "assuming IAM role via STS");

    let base = loader(config).load().await;
    let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .session_name(session_name)
        .region(Region::new(config.region.clone()))
        .configure(&base)
        .build()
        .await;

    loader(config).credentials_provider(provider).load().await
}
