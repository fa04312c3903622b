//! Insert-or-merge operation.

use tracing::debug;

use crate::conversions::{TableEntity, validate_key};
use crate::errors::Result;
use crate::metrics::OperationMetrics;
use crate::store::TableStore;

/// Upsert `record` into `table`.
///
/// Fields the record leaves unset are kept as stored. The returned record
/// carries the etag assigned by the service.
pub async fn insert_or_merge_entity<S, T>(
    store: &S,
    table: &str,
    record: &T,
) -> Result<(T, OperationMetrics)>
where
    S: TableStore + ?Sized,
    T: TableEntity,
{
    let entity = record.to_entity();
    validate_key("PartitionKey", &entity.partition_key)?;
    validate_key("RowKey", &entity.row_key)?;

    let (stored, metrics) = store.upsert(table, &entity).await?;
    debug!(
        table,
        partition_key = %stored.partition_key,
        row_key = %stored.row_key,
        etag = ?stored.etag,
        "upserted entity"
    );
    Ok((T::from_entity(stored)?, metrics))
}
