//! Message collaborator
//!
//! The engine only needs presence, repetition, enum and deprecation metadata
//! from a message, plus read access to field values. [`Message`] captures that
//! boundary; [`DynamicMessage`] is a map-backed implementation usable without
//! generated code.

mod descriptor;
mod dynamic;

pub use descriptor::{EnumDescriptor, FieldDescriptor, FieldType, Label, MessageDescriptor};
pub use dynamic::{DynamicMessage, MessageBuilder};

use crate::core::Value;

pub trait Message: Send + Sync {
    fn descriptor(&self) -> &MessageDescriptor;

    /// Raw value of a field, if the field has been set.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Codec presence: the field is declared and set. Repeated fields count
    /// as set only when they hold at least one element.
    fn has_field(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => self.descriptor().has_field(key),
        }
    }

    /// Set and non-blank.
    fn is_present(&self, key: &str) -> bool {
        self.has_field(key) && self.get(key).is_some_and(|value| !value.is_blank())
    }

    fn is_repeated(&self, key: &str) -> bool {
        self.descriptor()
            .field(key)
            .is_some_and(FieldDescriptor::is_repeated)
    }

    fn is_enum(&self, key: &str) -> bool {
        self.descriptor()
            .field(key)
            .is_some_and(FieldDescriptor::is_enum)
    }

    fn is_deprecated(&self, key: &str) -> bool {
        self.descriptor().field(key).is_some_and(|field| field.deprecated)
    }

    /// Integer representation of a scalar enum field.
    fn enum_tag(&self, key: &str) -> Option<i64> {
        let field = self.descriptor().field(key)?;
        let descriptor = field.enum_descriptor()?;
        self.get(key).and_then(|value| descriptor.tag_for(value))
    }
}
