//! Single-entity operations.
//!
//! Each operation is one round trip and returns its `OperationMetrics`:
//! - `put` - Insert or merge an entity
//! - `get` - Point query by partition key and row key
//! - `delete` - Delete an entity if its etag is still current

mod delete;
mod get;
mod put;

pub use delete::delete_entity;
pub use get::retrieve_entity;
pub use put::insert_or_merge_entity;
