//! Per-table handle.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::driver::{
    DeleteOutput, DocumentDriver, Item, ItemPage, Key, QueryParams, Result, ScanParams,
    UpdateOutput, UpdateParams,
};

/// CRUD surface bound to one physical table.
///
/// Every operation returns a `'static` future, so it can be awaited
/// directly or observed through
/// [`ErrbackExt::errback`](crate::utils::ErrbackExt::errback) with the same
/// outcome.
#[derive(Clone)]
pub struct TableHandle {
    physical: Arc<str>,
    doc: Arc<dyn DocumentDriver>,
}

impl std::fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("physical", &self.physical)
            .finish()
    }
}

impl TableHandle {
    pub fn new(physical: impl Into<Arc<str>>, doc: Arc<dyn DocumentDriver>) -> Self {
        Self {
            physical: physical.into(),
            doc,
        }
    }

    /// The physical table every call targets.
    pub fn physical_name(&self) -> &str {
        &self.physical
    }

    /// Read one item, unwrapped from the driver envelope.
    pub fn get(&self, key: Key) -> BoxFuture<'static, Result<Option<Item>>> {
        let (table, doc) = self.parts();
        async move { Ok(doc.get(&table, key).await?.item) }.boxed()
    }

    /// Write `item`, handing it back on success.
    pub fn put(&self, item: Item) -> BoxFuture<'static, Result<Item>> {
        let (table, doc) = self.parts();
        async move {
            doc.put(&table, item.clone()).await?;
            Ok(item)
        }
        .boxed()
    }

    pub fn update(&self, params: UpdateParams) -> BoxFuture<'static, Result<UpdateOutput>> {
        let (table, doc) = self.parts();
        async move { doc.update(&table, params).await }.boxed()
    }

    pub fn delete(&self, key: Key) -> BoxFuture<'static, Result<DeleteOutput>> {
        let (table, doc) = self.parts();
        async move { doc.delete(&table, key).await }.boxed()
    }

    pub fn query(&self, params: QueryParams) -> BoxFuture<'static, Result<ItemPage>> {
        let (table, doc) = self.parts();
        async move { doc.query(&table, params).await }.boxed()
    }

    pub fn scan(&self, params: ScanParams) -> BoxFuture<'static, Result<ItemPage>> {
        let (table, doc) = self.parts();
        async move { doc.scan(&table, params).await }.boxed()
    }

    fn parts(&self) -> (Arc<str>, Arc<dyn DocumentDriver>) {
        (self.physical.clone(), self.doc.clone())
    }
}
