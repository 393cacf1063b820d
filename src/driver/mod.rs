//! Store driver seam.
//!
//! This module contains:
//! - `LowLevelDriver` trait: table listing against the raw store
//! - `DocumentDriver` trait: CRUD over JSON documents, addressed by table name
//! - Parameter and result shapes shared by every driver
//! - Implementations: DynamoDB (feature `aws`), in-memory mock

use async_trait::async_trait;

mod params;

#[cfg(feature = "aws")]
pub mod dynamo;
pub mod mock;

pub use params::{
    DeleteOutput, GetOutput, Item, ItemPage, Key, PutOutput, QueryParams, ScanParams,
    UpdateOutput, UpdateParams,
};

#[cfg(feature = "aws")]
pub use dynamo::DynamoDriver;
pub use mock::MemoryStore;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors surfaced by a store driver.
///
/// These are handed to callers as-is; nothing above the driver retries.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Store request failed: {0}")]
    Sdk(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Attribute conversion failed: {0}")]
    Conversion(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Wrap an SDK error without altering it.
    pub fn sdk(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Sdk(Box::new(err))
    }
}

/// Low-level store handle.
#[async_trait]
pub trait LowLevelDriver: Send + Sync {
    /// List every physical table visible to this handle.
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// Document-flavored store handle.
///
/// Every call names its physical table explicitly. Outputs are the driver's
/// native shapes; callers that want only the item unwrap them.
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    async fn get(&self, table: &str, key: Key) -> Result<GetOutput>;

    async fn put(&self, table: &str, item: Item) -> Result<PutOutput>;

    async fn update(&self, table: &str, params: UpdateParams) -> Result<UpdateOutput>;

    async fn delete(&self, table: &str, key: Key) -> Result<DeleteOutput>;

    async fn query(&self, table: &str, params: QueryParams) -> Result<ItemPage>;

    async fn scan(&self, table: &str, params: ScanParams) -> Result<ItemPage>;
}
