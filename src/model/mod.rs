//! Entity types: column metadata, declaration tables and inheritance.

mod association;
mod columns;
mod configuration;
mod entity;
mod inheritance;

pub use association::Association;
pub use columns::{ColumnCache, ColumnMap};
pub use configuration::Configuration;
pub use entity::EntityType;
pub use inheritance::{InheritableTable, InheritableTables};
