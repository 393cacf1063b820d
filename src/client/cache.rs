//! Client memoization.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{DataClient, Result};
use crate::config::Mode;

/// Single slot holding the built client.
///
/// Written at most once outside local mode and only with a fully built
/// client. Concurrent first callers may each build; the first to store wins
/// and every caller gets that stored client back.
#[derive(Default)]
pub struct ClientCache {
    slot: RwLock<Option<Arc<DataClient>>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached client, building it with `build` on a miss.
    ///
    /// In local mode the slot is neither read nor written; every call builds.
    pub async fn get_or_build<F, Fut>(&self, mode: Mode, build: F) -> Result<Arc<DataClient>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DataClient>>,
    {
        if mode.is_local() {
            debug!("Local mode, building fresh client");
            return Ok(Arc::new(build().await?));
        }

        if let Some(client) = self.slot.read().await.as_ref() {
            debug!("Client cache hit");
            return Ok(Arc::clone(client));
        }

        debug!("Client cache miss");
        let built = Arc::new(build().await?);

        let mut slot = self.slot.write().await;
        Ok(Arc::clone(slot.get_or_insert(built)))
    }

    /// The cached client, if any.
    pub async fn cached(&self) -> Option<Arc<DataClient>> {
        self.slot.read().await.clone()
    }

    /// Empty the slot.
    pub async fn reset(&self) {
        *self.slot.write().await = None;
    }
}
