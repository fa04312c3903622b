//! Capability traits over the remote service.
//!
//! The operations modules depend only on these traits. `CosmosStore`
//! implements them over the Cosmos DB REST APIs and `MemoryStore` in memory.

use async_trait::async_trait;

use crate::errors::Result;
use crate::metrics::OperationMetrics;
use crate::model::{CollectionDescriptor, Entity, TableHandle, ThroughputOffer};

/// Table and entity operations of the Table API.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Create `name`, or return a handle to it if it already exists.
    async fn create_table_if_not_exists(&self, name: &str)
    -> Result<(TableHandle, OperationMetrics)>;

    /// Delete `name`. Returns false if there was no such table.
    async fn delete_table_if_exists(&self, name: &str) -> Result<(bool, OperationMetrics)>;

    async fn table_exists(&self, name: &str) -> Result<(bool, OperationMetrics)>;

    /// Insert, or merge the given properties into the stored entity.
    ///
    /// Returns the entity carrying its new etag. An implementation may
    /// return only the sent properties; re-read to see the merged state.
    async fn upsert(&self, table: &str, entity: &Entity) -> Result<(Entity, OperationMetrics)>;

    /// Point lookup. A missing entity is `Ok(None)`.
    async fn point_query(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<(Option<Entity>, OperationMetrics)>;

    /// Delete the entity only if its stored etag still equals `entity.etag`.
    ///
    /// Fails with `PreconditionFailed` when the etag is stale.
    async fn delete_if_unchanged(&self, table: &str, entity: &Entity) -> Result<OperationMetrics>;
}

/// Offer operations of the Documents API.
#[async_trait]
pub trait ThroughputStore: Send + Sync {
    /// Read the collection backing `table` in `database`.
    async fn read_collection(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(CollectionDescriptor, OperationMetrics)>;

    /// All offers whose `resource` equals `self_link`.
    async fn query_offer_by_resource_link(
        &self,
        self_link: &str,
    ) -> Result<(Vec<ThroughputOffer>, OperationMetrics)>;

    /// Replace an offer. Returns the offer as stored.
    async fn replace_offer(
        &self,
        offer: &ThroughputOffer,
    ) -> Result<(ThroughputOffer, OperationMetrics)>;
}
