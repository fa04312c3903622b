//! Point query operation.

use tracing::debug;

use crate::conversions::{TableEntity, validate_key};
use crate::errors::Result;
use crate::metrics::OperationMetrics;
use crate::store::TableStore;

/// Read one entity by its full key. `None` means it does not exist.
pub async fn retrieve_entity<S, T>(
    store: &S,
    table: &str,
    partition_key: &str,
    row_key: &str,
) -> Result<(Option<T>, OperationMetrics)>
where
    S: TableStore + ?Sized,
    T: TableEntity,
{
    validate_key("PartitionKey", partition_key)?;
    validate_key("RowKey", row_key)?;

    let (found, metrics) = store.point_query(table, partition_key, row_key).await?;
    debug!(table, partition_key, row_key, found = found.is_some(), "point query");
    let record = found.map(T::from_entity).transpose()?;
    Ok((record, metrics))
}
