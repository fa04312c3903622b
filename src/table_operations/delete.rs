//! Delete table operation.

use tracing::info;

use crate::conversions::validate_table_name;
use crate::errors::Result;
use crate::metrics::OperationMetrics;
use crate::store::TableStore;

/// Delete `name`. Returns false when the table did not exist.
pub async fn delete_table_if_exists<S>(store: &S, name: &str) -> Result<(bool, OperationMetrics)>
where
    S: TableStore + ?Sized,
{
    validate_table_name(name)?;
    let (deleted, metrics) = store.delete_table_if_exists(name).await?;
    if deleted {
        info!(table = name, "deleted table");
    }
    Ok((deleted, metrics))
}
