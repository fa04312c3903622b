//! Offer lookup and replace.

use tracing::{info, warn};

use crate::errors::{Result, TableError};
use crate::metrics::OperationMetrics;
use crate::model::ThroughputOffer;
use crate::store::ThroughputStore;

/// Lowest throughput a collection can be provisioned with, in RU/s.
pub const MIN_THROUGHPUT: u32 = 400;

/// Provisioned throughput must be a multiple of this.
pub const THROUGHPUT_STEP: u32 = 100;

/// Check a target throughput before sending it.
pub fn validate_throughput(target_rus: u32) -> Result<()> {
    if target_rus < MIN_THROUGHPUT || target_rus % THROUGHPUT_STEP != 0 {
        return Err(TableError::Validation(format!(
            "throughput must be at least {} RU/s and a multiple of {}, got {}",
            MIN_THROUGHPUT, THROUGHPUT_STEP, target_rus
        )));
    }
    Ok(())
}

/// Set the throughput of the collection backing `table` to `target_rus`.
///
/// Steps:
/// 1. Read the collection to get its self link
/// 2. Query the offer whose resource is that link
/// 3. Replace it with a copy carrying the target
///
/// Returns `None` without replacing anything when no offer governs the
/// collection (e.g. throughput provisioned at database level).
///
/// # Errors
///
/// `AmbiguousOffer` when more than one offer matches. Service errors are
/// propagated unchanged.
pub async fn update_table_throughput<S>(
    store: &S,
    database: &str,
    table: &str,
    target_rus: u32,
) -> Result<(Option<ThroughputOffer>, OperationMetrics)>
where
    S: ThroughputStore + ?Sized,
{
    validate_throughput(target_rus)?;
    let mut metrics = OperationMetrics::default();

    let (collection, read_metrics) = store.read_collection(database, table).await?;
    metrics.accumulate(&read_metrics);

    let (mut offers, query_metrics) = store
        .query_offer_by_resource_link(&collection.self_link)
        .await?;
    metrics.accumulate(&query_metrics);

    let offer = match offers.len() {
        0 => {
            warn!(table, resource = %collection.self_link, "no throughput offer found for collection");
            return Ok((None, metrics));
        }
        1 => offers.remove(0),
        count => {
            return Err(TableError::AmbiguousOffer {
                resource: collection.self_link,
                count,
            });
        }
    };

    let previous = offer.throughput();
    let (replaced, replace_metrics) = store
        .replace_offer(&offer.with_throughput(target_rus))
        .await?;
    metrics.accumulate(&replace_metrics);

    info!(
        table,
        from = previous,
        to = replaced.throughput(),
        "updated table throughput"
    );
    Ok((Some(replaced), metrics))
}
