//! Table management operations.
//!
//! This module provides table lifecycle operations:
//! - `create` - Create a table unless it already exists
//! - `delete` - Delete a table if it exists
//! - `exists` - Check if a table exists

mod create;
mod delete;
mod exists;

// Re-export public functions
pub use create::{create_table_if_not_exists, generate_table_name};
pub use delete::delete_table_if_exists;
pub use exists::table_exists;
