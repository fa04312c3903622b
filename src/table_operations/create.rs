//! Create table operation.

use tracing::info;
use uuid::Uuid;

use crate::conversions::validate_table_name;
use crate::errors::Result;
use crate::metrics::OperationMetrics;
use crate::model::TableHandle;
use crate::store::TableStore;

/// Number of UUID characters appended to a generated table name.
const TABLE_SUFFIX_LEN: usize = 5;

/// A unique table name: `prefix` followed by the first characters of a v4 UUID.
pub fn generate_table_name(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &id[..TABLE_SUFFIX_LEN])
}

/// Create `name`, or reference it if it already exists.
///
/// # Errors
///
/// Returns a validation error for a malformed name, and propagates any
/// service error unchanged.
pub async fn create_table_if_not_exists<S>(
    store: &S,
    name: &str,
) -> Result<(TableHandle, OperationMetrics)>
where
    S: TableStore + ?Sized,
{
    validate_table_name(name)?;
    let (handle, metrics) = store.create_table_if_not_exists(name).await?;
    if handle.created {
        info!(table = name, "created table");
    } else {
        info!(table = name, "table already exists");
    }
    Ok((handle, metrics))
}
