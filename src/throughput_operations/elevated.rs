//! Scoped throughput elevation.
//!
//! The baseline is restored after the workload on every exit path. Async
//! code cannot await in `Drop`, so the release is an explicit step that
//! runs before the workload's result is returned.

use std::future::Future;
use tracing::warn;

use super::update::update_table_throughput;
use crate::errors::Result;
use crate::store::ThroughputStore;

/// Throughput during and after a workload, in RU/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputLevels {
    pub elevated: u32,
    pub baseline: u32,
}

impl Default for ThroughputLevels {
    fn default() -> Self {
        ThroughputLevels {
            elevated: 1000,
            baseline: 400,
        }
    }
}

/// Raise `table` to `levels.elevated`, run `workload`, then lower it to
/// `levels.baseline`.
///
/// The lowering runs even if raising or the workload fails; a failed raise
/// skips the workload. The first failure is returned; a lowering failure
/// that follows an earlier one is only logged.
pub async fn with_elevated_throughput<S, F, Fut, T>(
    store: &S,
    database: &str,
    table: &str,
    levels: ThroughputLevels,
    workload: F,
) -> Result<T>
where
    S: ThroughputStore + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let outcome = match update_table_throughput(store, database, table, levels.elevated).await {
        Ok(_) => workload().await,
        Err(e) => Err(e),
    };

    let restore = update_table_throughput(store, database, table, levels.baseline).await;

    match (outcome, restore) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(restore_err)) => {
            warn!(table, error = %restore_err, "failed to restore baseline throughput");
            Err(e)
        }
    }
}
