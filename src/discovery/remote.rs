//! Remote discovery through a hierarchical parameter store.
//!
//! Parameters live under `/{deployment}/{category}/{logical}` with the
//! physical name as value. Pages are fetched strictly in sequence, each
//! continuation token gating the next request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Discovered, DiscoveryError, NameLookup, Resolver, Result, TableMapping};

/// Path segment holding the category (`/deployment/category/name`).
const CATEGORY_SEGMENT: usize = 2;
/// Path segment holding the logical name.
const NAME_SEGMENT: usize = 3;

/// Resource categories published under a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Tables,
    Events,
    Queues,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tables => "tables",
            Category::Events => "events",
            Category::Queues => "queues",
        }
    }
}

/// One stored parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub path: String,
    pub value: Option<String>,
}

impl Parameter {
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: Some(value.into()),
        }
    }
}

/// One page of a recursive path lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub items: Vec<Parameter>,
    pub continuation_token: Option<String>,
}

/// Paginated lookup of every parameter beneath a path.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameters_by_path(
        &self,
        path: &str,
        continuation_token: Option<String>,
    ) -> Result<ParameterPage>;
}

/// Resolver reading a deployment's published parameters.
pub struct RemoteResolver {
    store: Arc<dyn ParameterStore>,
    deployment: String,
    category: Category,
}

impl RemoteResolver {
    /// Resolver for the `tables` category of `deployment`.
    pub fn new(store: Arc<dyn ParameterStore>, deployment: impl Into<String>) -> Self {
        Self::for_category(store, deployment, Category::Tables)
    }

    pub fn for_category(
        store: Arc<dyn ParameterStore>,
        deployment: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            store,
            deployment: deployment.into(),
            category,
        }
    }

    /// Follow continuation tokens until exhausted, collecting every parameter
    /// of this resolver's category into name -> value.
    pub async fn lookup(&self) -> Result<TableMapping> {
        let path = format!("/{}", self.deployment);
        let mut mapping = TableMapping::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.store.get_parameters_by_path(&path, token.take()).await?;
            pages += 1;

            for parameter in page.items {
                if let Some((name, value)) = self.extract(parameter)? {
                    mapping.insert(name, value);
                }
            }

            match page.continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(
            deployment = %self.deployment,
            category = self.category.as_str(),
            pages = pages,
            count = mapping.len(),
            "Resolved parameters"
        );
        Ok(mapping)
    }

    fn extract(&self, parameter: Parameter) -> Result<Option<(String, String)>> {
        let segments: Vec<&str> = parameter.path.split('/').collect();
        if segments.get(CATEGORY_SEGMENT) != Some(&self.category.as_str()) {
            debug!(path = %parameter.path, "Skipping parameter outside category");
            return Ok(None);
        }

        let name = match segments.get(NAME_SEGMENT) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(DiscoveryError::MalformedParameter {
                    path: parameter.path,
                    message: "missing name segment".to_string(),
                })
            }
        };

        match parameter.value {
            Some(value) => Ok(Some((name, value))),
            None => Err(DiscoveryError::MalformedParameter {
                path: parameter.path,
                message: "missing value".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Resolver for RemoteResolver {
    async fn resolve(&self) -> Result<Discovered> {
        Ok(Discovered {
            mapping: self.lookup().await?,
            lookup: NameLookup::Exact,
        })
    }
}
