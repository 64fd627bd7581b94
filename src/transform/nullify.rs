//! Explicit "clear these attributes" signal carried in a reserved repeated
//! string field of the inbound message.

use std::collections::BTreeSet;

use tracing::{trace, warn};

use crate::config::BridgeConfig;
use crate::core::Value;
use crate::message::{FieldType, Message, MessageDescriptor};

/// Attribute names the caller asked to force to null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullifyList {
    names: BTreeSet<String>,
}

impl NullifyList {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the list from `message`. A message that does not declare the
    /// field yields an empty list; one that declares it with the wrong shape
    /// yields an empty list and a warning.
    pub fn from_message(message: &dyn Message, config: &BridgeConfig) -> Self {
        let descriptor = message.descriptor();
        let Some(field) = descriptor.field(&config.nullify_field) else {
            trace!(message = %descriptor.name, "message has no nullify field");
            return Self::default();
        };

        if !field.is_repeated() || field.field_type != FieldType::String {
            warn!(
                message = %descriptor.name,
                field = %config.nullify_field,
                "nullify field must be a repeated string; ignoring it"
            );
            return Self::default();
        }

        let names = message
            .get(&config.nullify_field)
            .and_then(Value::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string);

        Self {
            names: names.collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether `descriptor` declares the nullify field as a repeated string.
pub fn carries_nullify_field(descriptor: &MessageDescriptor, config: &BridgeConfig) -> bool {
    descriptor
        .field(&config.nullify_field)
        .is_some_and(|field| field.is_repeated() && field.field_type == FieldType::String)
}
