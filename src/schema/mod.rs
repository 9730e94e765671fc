//! Schema subsystem
//!
//! Column types, table schemas, compatibility rules and the explicit
//! registry through which callers add custom table types without touching
//! the parser.

mod compat;
mod registry;
mod types;

pub use compat::{ensure_compatible, is_compatible};
pub use registry::SchemaRegistry;
pub use types::{Column, ColumnType, NativeKind, Schema};
