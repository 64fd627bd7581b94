// ============================================================================
// protorecord: message <-> relational entity mapping
// ============================================================================

//! Moves values between structured messages and relational entities.
//!
//! An [`EntityType`] describes one table: its column metadata (mapped lazily
//! from a [`RecordStore`]), its converters and transformers, its searchable
//! fields and its upsert key groups. Subtypes are declared with
//! [`EntityType::derive`] and start from a copy of every table.
//!
//! ```
//! use protorecord::{
//!     Column, ColumnType, DynamicMessage, EntityType, FieldDescriptor, FieldOptions,
//!     FieldType, InMemoryStore, MessageDescriptor, ScopeOptions, Value,
//! };
//!
//! # fn main() -> protorecord::Result<()> {
//! let store = InMemoryStore::shared();
//! store.create_table(
//!     "users",
//!     vec![
//!         Column::new("id", ColumnType::Integer),
//!         Column::new("guid", ColumnType::Text),
//!         Column::new("born_on", ColumnType::Date),
//!     ],
//! )?;
//!
//! let message = MessageDescriptor::new(
//!     "UserMessage",
//!     vec![
//!         FieldDescriptor::optional("guid", 1, FieldType::String),
//!         FieldDescriptor::optional("born_on", 2, FieldType::Int64),
//!     ],
//! )
//! .into_shared();
//!
//! let user = EntityType::new("User", "users", store);
//! user.declare_message(message.clone(), FieldOptions::default())?;
//! user.define_in_scope("by_guid", "guid")?;
//! user.field_scope("guid", ScopeOptions::new())?;
//! user.upsert_key(["guid"])?;
//!
//! let incoming = DynamicMessage::builder(&message)
//!     .set("guid", "U1")
//!     .set("born_on", 1_577_923_200i64)
//!     .build()?;
//! let record = user.upsert(&incoming)?;
//! assert!(!record.is_new_record());
//!
//! let outgoing = user.to_message(&record, &FieldOptions::default())?;
//! assert_eq!(outgoing.values().get("born_on"), Some(&Value::Integer(1_577_923_200)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod message;
pub mod model;
mod persistence;
pub mod scope;
pub mod storage;
pub mod transform;

pub use config::BridgeConfig;
pub use core::{Column, ColumnType, ErrorClass, MappingError, Result, Value};
pub use message::{
    DynamicMessage, EnumDescriptor, FieldDescriptor, FieldType, Label, Message, MessageDescriptor,
};
pub use model::{Association, ColumnMap, Configuration, EntityType};
pub use scope::{ScopeOptions, SearchField};
pub use storage::{InMemoryStore, Predicate, Query, Record, RecordStore};
pub use transform::{
    Attributes, Direction, FieldOptions, FieldValues, NullifyList, RecordTransformerRef,
    Resolvable, TransformerOptions, TransformerRef,
};
