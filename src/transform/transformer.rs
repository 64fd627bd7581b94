use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::nullify::{NullifyList, carries_nullify_field};
use crate::core::{MappingError, Result, Value};
use crate::message::Message;
use crate::model::EntityType;
use crate::storage::Record;

/// Message-wide inbound function.
pub type MessageFn = Arc<dyn Fn(&dyn Message) -> Result<Value> + Send + Sync>;

/// Record-wide outbound function.
pub type RecordFn = Arc<dyn Fn(&Record) -> Result<Value> + Send + Sync>;

/// Names an inbound transformer.
#[derive(Clone)]
pub enum TransformerRef {
    Callable(MessageFn),
    /// A function registered with [`EntityType::define_message_method`].
    Named(String),
}

impl TransformerRef {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&dyn Message) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<&str> for TransformerRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

/// Names an outbound transformer.
#[derive(Clone)]
pub enum RecordTransformerRef {
    Callable(RecordFn),
    /// A function registered with [`EntityType::define_record_method`].
    Named(String),
}

impl RecordTransformerRef {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<&str> for RecordTransformerRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformerOptions {
    /// When this name appears in the nullify list, the attribute is forced
    /// to null and the transformer's result is discarded.
    pub nullify_on: Option<String>,
}

impl TransformerOptions {
    pub fn nullify_on(name: impl Into<String>) -> Self {
        Self {
            nullify_on: Some(name.into()),
        }
    }
}

#[derive(Clone)]
pub struct AttributeTransformer {
    callable: MessageFn,
    options: TransformerOptions,
}

impl AttributeTransformer {
    pub fn new(callable: MessageFn, options: TransformerOptions) -> Self {
        Self { callable, options }
    }

    pub fn options(&self) -> &TransformerOptions {
        &self.options
    }

    pub fn call(&self, message: &dyn Message) -> Result<Value> {
        (self.callable)(message)
    }

    /// Whether the nullify list names this transformer's trigger.
    pub fn is_nullified(&self, nullify: &NullifyList) -> bool {
        self.options
            .nullify_on
            .as_deref()
            .is_some_and(|name| nullify.contains(name))
    }
}

impl fmt::Debug for AttributeTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeTransformer")
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Clone)]
pub struct FieldTransformer {
    callable: RecordFn,
}

impl FieldTransformer {
    pub fn new(callable: RecordFn) -> Self {
        Self { callable }
    }

    pub fn call(&self, record: &Record) -> Result<Value> {
        (self.callable)(record)
    }
}

impl fmt::Debug for FieldTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldTransformer")
    }
}

impl EntityType {
    /// Derives `attribute` from the whole inbound message. Takes priority
    /// over any converter on the same key.
    pub fn attribute_from_message(
        &self,
        attribute: &str,
        transformer: impl Into<TransformerRef>,
        options: TransformerOptions,
    ) -> Result<()> {
        let transformer = transformer.into();
        self.declare(|configuration| {
            let callable = match transformer {
                TransformerRef::Callable(f) => f,
                TransformerRef::Named(name) => configuration
                    .message_methods
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| MappingError::AttributeTransformerError(attribute.to_string()))?,
            };

            if options.nullify_on.is_some()
                && let Some(descriptor) = configuration.message.as_deref()
                && !carries_nullify_field(descriptor, &configuration.config)
            {
                warn!(
                    attribute,
                    message = %descriptor.name,
                    "nullify_on declared but message has no repeated string nullify field"
                );
            }

            configuration
                .attribute_transformers
                .insert(attribute.to_string(), AttributeTransformer::new(callable, options));
            Ok(())
        })
    }

    /// Derives outbound `field` from the whole record.
    pub fn field_from_record(
        &self,
        field: &str,
        transformer: impl Into<RecordTransformerRef>,
    ) -> Result<()> {
        let transformer = transformer.into();
        self.declare(|configuration| {
            let callable = match transformer {
                RecordTransformerRef::Callable(f) => f,
                RecordTransformerRef::Named(name) => configuration
                    .record_methods
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| MappingError::FieldTransformerError(field.to_string()))?,
            };
            configuration
                .field_transformers
                .insert(field.to_string(), FieldTransformer::new(callable));
            Ok(())
        })
    }

    /// Maps message field `alias` onto `attribute` in both directions.
    pub fn alias_field(&self, alias: &str, attribute: &str) -> Result<()> {
        self.declare(|configuration| {
            configuration
                .aliases
                .insert(alias.to_string(), attribute.to_string());
            Ok(())
        })
    }

    pub fn define_message_method<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&dyn Message) -> Result<Value> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration
                .message_methods
                .insert(name.to_string(), Arc::new(f));
            Ok(())
        })
    }

    pub fn define_record_method<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration
                .record_methods
                .insert(name.to_string(), Arc::new(f));
            Ok(())
        })
    }

    pub fn has_attribute_transformer(&self, attribute: &str) -> Result<bool> {
        Ok(self
            .configuration()?
            .attribute_transformers
            .contains_key(attribute))
    }

    pub fn has_field_transformer(&self, field: &str) -> Result<bool> {
        Ok(self.configuration()?.field_transformers.contains_key(field))
    }
}
