//! Table discovery.
//!
//! Resolves logical table names to the physical tables backing them:
//! - Remote resolution through a hierarchical parameter store (deployed)
//! - Local resolution by listing the store and parsing table names (testing)
//!
//! Both produce a [`Discovered`] so client construction is resolver-agnostic.

pub mod local;
pub mod mock;
pub mod remote;
#[cfg(feature = "aws")]
pub mod ssm;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

pub use local::LocalResolver;
pub use mock::MockParameterStore;
pub use remote::{Category, Parameter, ParameterPage, ParameterStore, RemoteResolver};
#[cfg(feature = "aws")]
pub use ssm::SsmParameterStore;

use crate::driver::DriverError;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Errors that abort a discovery. No partial mapping is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Parameter lookup failed: {0}")]
    Parameters(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Malformed parameter '{path}': {message}")]
    MalformedParameter { path: String, message: String },

    #[error("Table listing failed: {0}")]
    Listing(#[from] DriverError),

    #[error("No deployment identifier configured for remote discovery")]
    MissingDeployment,

    #[error("Declared table '{0}' was not discovered")]
    MissingTable(String),
}

/// Logical table name -> physical table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TableMapping(BTreeMap<String, String>);

impl TableMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical: impl Into<String>, physical: impl Into<String>) {
        self.0.insert(logical.into(), physical.into());
    }

    /// Physical name for `logical`, if mapped.
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.0.get(logical).map(String::as_str)
    }

    pub fn contains(&self, logical: &str) -> bool {
        self.0.contains_key(logical)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// (logical, physical) pairs in logical-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, p)| (l.as_str(), p.as_str()))
    }

    /// Fail with the first declared name that is not mapped.
    pub fn require<S: AsRef<str>>(&self, declared: &[S]) -> Result<()> {
        match declared.iter().find(|name| !self.contains(name.as_ref())) {
            Some(name) => Err(DiscoveryError::MissingTable(name.as_ref().to_string())),
            None => Ok(()),
        }
    }
}

impl<L: Into<String>, P: Into<String>> FromIterator<(L, P)> for TableMapping {
    fn from_iter<I: IntoIterator<Item = (L, P)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(l, p)| (l.into(), p.into()))
                .collect(),
        )
    }
}

/// How a client answers "which physical tables back this name".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameLookup {
    /// Exact logical-name match against the mapping.
    Exact,
    /// Suffix match against every visible physical table; may match many.
    Pattern(Vec<String>),
}

/// Output of a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    pub mapping: TableMapping,
    pub lookup: NameLookup,
}

impl Discovered {
    /// Physical names answering to `name`.
    ///
    /// Exact lookups return one name or `None`. Pattern lookups return every
    /// visible physical table ending in `name`, possibly none.
    pub fn physical_names(&self, name: &str) -> Option<Vec<String>> {
        match &self.lookup {
            NameLookup::Exact => self.mapping.get(name).map(|p| vec![p.to_string()]),
            NameLookup::Pattern(tables) => Some(
                tables
                    .iter()
                    .filter(|t| t.ends_with(name))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Resolves the table mapping for the current deployment.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self) -> Result<Discovered>;
}
