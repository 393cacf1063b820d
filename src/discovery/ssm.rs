//! AWS Systems Manager parameter store.

use async_trait::async_trait;
use aws_sdk_ssm::Client;
use tracing::debug;

use super::remote::{Parameter, ParameterPage, ParameterStore};
use super::{DiscoveryError, Result};
use crate::config::Config;

/// SSM-backed implementation of [`ParameterStore`].
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(config: &Config) -> Self {
        let sdk_config = crate::config::aws::sdk_config(config).await;
        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_parameters_by_path(
        &self,
        path: &str,
        continuation_token: Option<String>,
    ) -> Result<ParameterPage> {
        let output = self
            .client
            .get_parameters_by_path()
            .path(path)
            .recursive(true)
            .set_next_token(continuation_token)
            .send()
            .await
            .map_err(|e| DiscoveryError::Parameters(Box::new(e)))?;

        let items: Vec<Parameter> = output
            .parameters
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| {
                p.name.map(|path| Parameter {
                    path,
                    value: p.value,
                })
            })
            .collect();

        debug!(path = %path, count = items.len(), "Fetched parameter page");
        Ok(ParameterPage {
            items,
            continuation_token: output.next_token,
        })
    }
}
