//! Document store contract

use async_trait::async_trait;

use crate::{
    error::StoreResult,
    patch::{Patch, SetOptions},
    query::{Query, StoredDocument},
    value::Fields,
};

/// The narrow store surface the versioning core consumes
///
/// Every call is a suspension point. Implementations must be safe to share
/// across tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document; `None` if it does not exist
    async fn get(&self, path: &str) -> StoreResult<Option<Fields>>;

    /// Create or replace a document, or merge into it with `SetOptions::merge()`
    async fn set(&self, path: &str, data: Patch, options: SetOptions) -> StoreResult<()>;

    /// Shallow update of an existing document; fails with `NotFound` otherwise
    async fn update(&self, path: &str, patch: Patch) -> StoreResult<()>;

    /// Delete a document; deleting a missing document is not an error
    async fn delete(&self, path: &str) -> StoreResult<()>;

    /// Run a query over the direct children of a collection
    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>>;
}
