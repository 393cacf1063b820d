//! Data client.
//!
//! This module contains:
//! - `DataClient`: one `TableHandle` per logical table plus reflection
//! - `factory`: builds a client from a discovery result and driver handles
//! - `ClientCache`: process-lifetime memoization of the built client
//! - `Tables`: the application context tying config, drivers and cache

pub mod cache;
pub mod context;
pub mod factory;
mod table;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use cache::ClientCache;
pub use context::Tables;
pub use factory::build;
pub use table::TableHandle;

use crate::discovery::{Discovered, DiscoveryError, TableMapping};
use crate::driver::{DocumentDriver, DriverError, LowLevelDriver};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the data client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Composed client over every discovered table.
///
/// Never mutated after construction; a new discovery produces a new client.
pub struct DataClient {
    tables: BTreeMap<String, TableHandle>,
    discovered: Discovered,
    db: Arc<dyn LowLevelDriver>,
    doc: Arc<dyn DocumentDriver>,
}

impl std::fmt::Debug for DataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataClient")
            .field("tables", &self.discovered.mapping)
            .finish()
    }
}

impl DataClient {
    /// Handle for a logical table.
    pub fn table(&self, logical: &str) -> Result<&TableHandle> {
        self.tables
            .get(logical)
            .ok_or_else(|| ClientError::UnknownTable(logical.to_string()))
    }

    /// Logical table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// The mapping this client was built from.
    pub async fn reflect(&self) -> TableMapping {
        self.discovered.mapping.clone()
    }

    /// Physical tables answering to `name`.
    ///
    /// A remotely discovered client matches logical names exactly and fails
    /// for unknown ones. A locally discovered client matches every visible
    /// table ending in `name`, which may be several or none.
    pub fn physical_names(&self, name: &str) -> Result<Vec<String>> {
        self.discovered
            .physical_names(name)
            .ok_or_else(|| ClientError::UnknownTable(name.to_string()))
    }

    /// Low-level driver handle.
    #[doc(hidden)]
    pub fn db(&self) -> &Arc<dyn LowLevelDriver> {
        &self.db
    }

    /// Document driver handle.
    #[doc(hidden)]
    pub fn doc(&self) -> &Arc<dyn DocumentDriver> {
        &self.doc
    }
}
