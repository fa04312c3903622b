//! Check if table exists.

use crate::conversions::validate_table_name;
use crate::errors::Result;
use crate::store::TableStore;

/// True if `name` exists. Metrics are dropped; this is a probe.
pub async fn table_exists<S>(store: &S, name: &str) -> Result<bool>
where
    S: TableStore + ?Sized,
{
    validate_table_name(name)?;
    let (exists, _) = store.table_exists(name).await?;
    Ok(exists)
}
