//! Client construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::{DataClient, TableHandle};
use crate::discovery::Discovered;
use crate::driver::{DocumentDriver, LowLevelDriver};

/// Build a client with one handle per (logical, physical) pair.
pub fn build(
    discovered: Discovered,
    db: Arc<dyn LowLevelDriver>,
    doc: Arc<dyn DocumentDriver>,
) -> DataClient {
    let tables: BTreeMap<String, TableHandle> = discovered
        .mapping
        .iter()
        .map(|(logical, physical)| {
            (
                logical.to_string(),
                TableHandle::new(physical, doc.clone()),
            )
        })
        .collect();

    info!(count = tables.len(), "Built data client");

    DataClient {
        tables,
        discovered,
        db,
        doc,
    }
}
