//! Application context.
//!
//! `Tables` owns the configuration, both driver handles, the parameter store
//! and the client cache slot. It is cheap to clone; clones share the slot.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::{factory, ClientCache, DataClient, Result};
use crate::config::{Config, Mode};
use crate::discovery::{DiscoveryError, LocalResolver, ParameterStore, RemoteResolver, Resolver};
use crate::driver::{DocumentDriver, LowLevelDriver};

struct Inner {
    config: Config,
    db: Arc<dyn LowLevelDriver>,
    doc: Arc<dyn DocumentDriver>,
    parameters: Arc<dyn ParameterStore>,
    cache: ClientCache,
}

/// Entry point for application code.
#[derive(Clone)]
pub struct Tables {
    inner: Arc<Inner>,
}

impl Tables {
    pub fn new(
        config: Config,
        db: Arc<dyn LowLevelDriver>,
        doc: Arc<dyn DocumentDriver>,
        parameters: Arc<dyn ParameterStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                db,
                doc,
                parameters,
                cache: ClientCache::new(),
            }),
        }
    }

    /// Connect AWS-backed drivers and parameter store for `config`.
    #[cfg(feature = "aws")]
    pub async fn connect(config: Config) -> Self {
        use crate::discovery::SsmParameterStore;
        use crate::driver::DynamoDriver;

        let (dynamo, ssm) = tokio::join!(
            DynamoDriver::connect(&config),
            SsmParameterStore::connect(&config)
        );
        let dynamo = Arc::new(dynamo);

        tracing::info!(mode = ?config.mode, "Tables context connected");
        Self::new(config, dynamo.clone(), dynamo, Arc::new(ssm))
    }

    /// The data client.
    ///
    /// Outside local mode the first successful call discovers and builds;
    /// later calls return that same client. In local mode every call
    /// rediscovers so the client reflects the live table set.
    pub fn client(&self) -> BoxFuture<'static, Result<Arc<DataClient>>> {
        let this = self.clone();
        async move {
            let mode = this.inner.config.mode;
            this.inner
                .cache
                .get_or_build(mode, || this.discover_and_build())
                .await
        }
        .boxed()
    }

    async fn discover_and_build(&self) -> Result<DataClient> {
        let discovered = self.resolver()?.resolve().await?;
        discovered
            .mapping
            .require(self.inner.config.declared_tables.as_slice())?;

        Ok(factory::build(
            discovered,
            self.inner.db.clone(),
            self.inner.doc.clone(),
        ))
    }

    fn resolver(&self) -> Result<Box<dyn Resolver>> {
        let config = &self.inner.config;
        match config.mode {
            Mode::Testing => Ok(Box::new(LocalResolver::new(self.inner.db.clone(), config))),
            Mode::Deployed => {
                let deployment = config
                    .deployment
                    .clone()
                    .ok_or(DiscoveryError::MissingDeployment)?;
                Ok(Box::new(RemoteResolver::new(
                    self.inner.parameters.clone(),
                    deployment,
                )))
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Direct low-level driver handle.
    pub fn db(&self) -> &Arc<dyn LowLevelDriver> {
        &self.inner.db
    }

    /// Direct document driver handle.
    pub fn doc(&self) -> &Arc<dyn DocumentDriver> {
        &self.inner.doc
    }

    /// Forget the cached client.
    pub async fn reset(&self) {
        self.inner.cache.reset().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::discovery::{MockParameterStore, Parameter};
    use crate::driver::MemoryStore;

    fn deployed(deployment: Option<&str>, declared: &[&str]) -> Config {
        Config {
            mode: Mode::Deployed,
            deployment: deployment.map(str::to_string),
            declared_tables: declared.iter().map(|s| s.to_string()).collect(),
            ..Config::default()
        }
    }

    fn tables(config: Config, parameters: Arc<MockParameterStore>) -> Tables {
        let store = Arc::new(MemoryStore::new());
        Tables::new(config, store.clone(), store, parameters)
    }

    #[tokio::test]
    async fn test_missing_deployment() {
        let tables = tables(deployed(None, &[]), Arc::new(MockParameterStore::new()));

        let err = tables.client().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Discovery(DiscoveryError::MissingDeployment)
        ));
    }

    #[tokio::test]
    async fn test_declared_table_must_be_discovered() {
        let parameters = Arc::new(MockParameterStore::with_pages(vec![vec![Parameter::new(
            "/shop/tables/orders",
            "shop-Orders-1A",
        )]]));
        let tables = tables(deployed(Some("shop"), &["orders", "carts"]), parameters);

        let err = tables.client().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Discovery(DiscoveryError::MissingTable(name)) if name == "carts"
        ));
    }

    #[tokio::test]
    async fn test_local_declared_table_must_be_listed() {
        let store = Arc::new(MemoryStore::new());
        store.create_table("shop-staging-orders", &["id"]).await;
        store.create_table("arc-sessions", &["id"]).await;
        store.create_table("shop-production-carts", &["id"]).await;

        for missing in ["carts", "arc-sessions", "payments"] {
            let config = Config {
                declared_tables: vec!["orders".to_string(), missing.to_string()],
                ..Config::for_test()
            };
            let tables = Tables::new(
                config,
                store.clone(),
                store.clone(),
                Arc::new(MockParameterStore::new()),
            );

            let err = tables.client().await.unwrap_err();
            assert!(matches!(
                err,
                ClientError::Discovery(DiscoveryError::MissingTable(name)) if name == missing
            ));
        }
    }

    #[tokio::test]
    async fn test_reset_forces_rediscovery() {
        let parameters = Arc::new(MockParameterStore::with_pages(vec![vec![Parameter::new(
            "/shop/tables/orders",
            "shop-Orders-1A",
        )]]));
        let tables = tables(deployed(Some("shop"), &[]), parameters.clone());

        let first = tables.client().await.unwrap();
        tables.reset().await;
        let second = tables.client().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(parameters.requests().await.len(), 2);
    }
}
