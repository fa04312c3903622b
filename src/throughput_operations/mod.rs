//! Provisioned-throughput operations.
//!
//! - `update` - Replace the offer of a table's backing collection
//! - `elevated` - Run a workload with raised throughput, restoring it afterwards

mod elevated;
mod update;

pub use elevated::{ThroughputLevels, with_elevated_throughput};
pub use update::{MIN_THROUGHPUT, THROUGHPUT_STEP, update_table_throughput, validate_throughput};
