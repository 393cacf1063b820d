//! Dynatables - discovery-driven table clients
//!
//! Resolves which physical DynamoDB tables back an application's logical
//! table names, builds a per-table client over them, memoizes that client
//! for the life of a process, and dispatches stream mutation batches to
//! per-record handlers.

pub mod client;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod trigger;
pub mod utils;

pub use client::{ClientError, DataClient, TableHandle, Tables};
pub use config::{Config, Mode};
pub use discovery::TableMapping;
pub use trigger::{EventKind, MutationRecord, Trigger};
