//! Shared AWS SDK configuration.

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::{Credentials, Region};

use super::Config;

/// Load the SDK config for `config`.
///
/// Testing mode pins the configured region and static local credentials;
/// deployed mode uses the default provider chain.
pub async fn sdk_config(config: &Config) -> aws_config::SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest());

    if config.mode.is_local() {
        loader
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                "local",
                "local",
                None,
                None,
                "dynatables-local",
            ))
            .load()
            .await
    } else {
        loader.load().await
    }
}
