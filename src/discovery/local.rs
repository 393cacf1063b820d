//! Local discovery by listing the store.
//!
//! Physical tables are named `{app}{delimiter}{logical}`. The reserved
//! session table and anything marked as production are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Discovered, NameLookup, Resolver, Result, TableMapping};
use crate::config::Config;
use crate::driver::LowLevelDriver;

/// Resolver enumerating the tables visible to a low-level driver.
pub struct LocalResolver {
    driver: Arc<dyn LowLevelDriver>,
    session_table: String,
    stage_delimiter: String,
    production_marker: String,
}

impl LocalResolver {
    pub fn new(driver: Arc<dyn LowLevelDriver>, config: &Config) -> Self {
        Self {
            driver,
            session_table: config.session_table.clone(),
            stage_delimiter: config.stage_delimiter.clone(),
            production_marker: config.production_marker.clone(),
        }
    }

    fn is_candidate(&self, table: &str) -> bool {
        table != self.session_table && !table.contains(&self.production_marker)
    }

    /// Split `table` at the first delimiter into (app, logical).
    ///
    /// Later delimiters stay in the logical name: `a-staging-b-staging-c`
    /// yields `b-staging-c`, not the segments joined as `bc`.
    fn split<'a>(&self, table: &'a str) -> Option<(&'a str, &'a str)> {
        table
            .split_once(self.stage_delimiter.as_str())
            .filter(|(_, logical)| !logical.is_empty())
    }
}

#[async_trait]
impl Resolver for LocalResolver {
    async fn resolve(&self) -> Result<Discovered> {
        let listed = self.driver.list_tables().await?;

        let tables: Vec<String> = listed
            .into_iter()
            .filter(|t| {
                let keep = self.is_candidate(t);
                if !keep {
                    debug!(table = %t, "Excluding table from local discovery");
                }
                keep
            })
            .collect();

        let mut mapping = TableMapping::new();
        for table in &tables {
            let Some((app, logical)) = self.split(table) else {
                debug!(table = %table, "Table does not follow the stage naming convention");
                continue;
            };
            if let Some(previous) = mapping.get(logical) {
                warn!(
                    logical = %logical,
                    previous = %previous,
                    table = %table,
                    "Logical name claimed by more than one local table"
                );
            }
            debug!(app = %app, logical = %logical, table = %table, "Discovered local table");
            mapping.insert(logical, table.as_str());
        }

        info!(count = mapping.len(), "Resolved local tables");
        Ok(Discovered {
            mapping,
            lookup: NameLookup::Pattern(tables),
        })
    }
}
