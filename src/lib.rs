//! Table storage samples for Azure Cosmos DB.
//!
//! Demonstrates table CRUD and provisioned-throughput changes:
//! - `table_operations` - create, delete and probe tables
//! - `basic_operations` - insert-or-merge, point query, conditional delete
//! - `throughput_operations` - replace a collection's offer, scoped elevation
//! - `samples` - the end-to-end workflow printed to the console
//!
//! Operations depend only on the [`TableStore`] and [`ThroughputStore`]
//! traits. [`CosmosStore`] talks to the Cosmos DB REST APIs;
//! [`MemoryStore`] keeps everything in memory.

pub mod basic_operations;
pub mod config;
pub mod conversions;
pub mod cosmos;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod samples;
pub mod store;
pub mod table_operations;
pub mod throughput_operations;

pub use config::CosmosConfig;
pub use conversions::TableEntity;
pub use cosmos::CosmosStore;
pub use errors::{Result, TableError};
pub use memory::MemoryStore;
pub use metrics::OperationMetrics;
pub use model::{CollectionDescriptor, CustomerRecord, Entity, TableHandle, ThroughputOffer};
pub use samples::{ConsoleReporter, Reporter, SampleOutcome, SampleSettings, run_samples};
pub use store::{TableStore, ThroughputStore};
