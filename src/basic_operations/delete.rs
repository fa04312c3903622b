//! Delete entity operation.

use tracing::debug;

use crate::conversions::{TableEntity, validate_key};
use crate::errors::{Result, TableError};
use crate::metrics::OperationMetrics;
use crate::model::Entity;
use crate::store::TableStore;

/// Prepared delete: the entity key plus the etag it must still match.
pub struct PreparedDeleteEntity {
    pub table: String,
    pub entity: Entity,
}

/// Check the record is deletable and convert it.
pub fn prepare_delete_entity<T: TableEntity>(table: &str, record: &T) -> Result<PreparedDeleteEntity> {
    let entity = record.to_entity();
    validate_key("PartitionKey", &entity.partition_key)?;
    validate_key("RowKey", &entity.row_key)?;
    if entity.etag.is_none() {
        return Err(TableError::Validation(format!(
            "entity ({}, {}) has no etag; read it before deleting",
            entity.partition_key, entity.row_key
        )));
    }
    Ok(PreparedDeleteEntity {
        table: table.to_string(),
        entity,
    })
}

/// Delete `record` if nobody changed it since it was read.
///
/// # Errors
///
/// `PreconditionFailed` when the record's etag is stale. Re-read the entity
/// and retry to delete the newer version.
pub async fn delete_entity<S, T>(store: &S, table: &str, record: &T) -> Result<OperationMetrics>
where
    S: TableStore + ?Sized,
    T: TableEntity,
{
    let prepared = prepare_delete_entity(table, record)?;
    let metrics = store
        .delete_if_unchanged(&prepared.table, &prepared.entity)
        .await?;
    debug!(
        table,
        partition_key = %prepared.entity.partition_key,
        row_key = %prepared.entity.row_key,
        "deleted entity"
    );
    Ok(metrics)
}
