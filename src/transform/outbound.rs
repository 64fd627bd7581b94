//! Outbound engine: entity attributes to message fields.
//!
//! Each field resolves to an accessor once per configuration and column
//! generation; serializing a record is then a walk over the resolved field
//! list with no per-call probing.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::convert::{Converter, Direction, coerce_outbound};
use super::transformer::{FieldTransformer, RecordFn};
use crate::config::BridgeConfig;
use crate::core::{ColumnType, MappingError, Result, Value};
use crate::message::{DynamicMessage, FieldType, MessageDescriptor};
use crate::model::{Association, ColumnMap, Configuration, EntityType};
use crate::storage::Record;

/// Field selection for outbound serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub only: Option<Vec<String>>,
    pub except: Option<Vec<String>>,
    pub include: Option<Vec<String>>,
    /// Overrides `BridgeConfig::include_deprecated` when set.
    pub deprecated: Option<bool>,
}

fn names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.only = Some(names(fields));
        self
    }

    pub fn except<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.except = Some(names(fields));
        self
    }

    pub fn include<I: IntoIterator<Item = S>, S: Into<String>>(mut self, fields: I) -> Self {
        self.include = Some(names(fields));
        self
    }

    pub fn deprecated(mut self, include: bool) -> Self {
        self.deprecated = Some(include);
        self
    }

    /// Per-call options over declared defaults. Each key set on the call
    /// wins; setting only one of `only`/`except` clears the default other.
    pub fn merged_over(&self, defaults: &FieldOptions) -> FieldOptions {
        let mut merged = defaults.clone();
        if self.only.is_some() {
            merged.only = self.only.clone();
            if self.except.is_none() {
                merged.except = None;
            }
        }
        if self.except.is_some() {
            merged.except = self.except.clone();
            if self.only.is_none() {
                merged.only = None;
            }
        }
        if self.include.is_some() {
            merged.include = self.include.clone();
        }
        if self.deprecated.is_some() {
            merged.deprecated = self.deprecated;
        }
        merged
    }

    /// Ordered field list for `descriptor`.
    pub fn resolve_fields(&self, descriptor: &MessageDescriptor, config: &BridgeConfig) -> Vec<String> {
        let include_deprecated = self.deprecated.unwrap_or(config.include_deprecated);
        let mut fields: Vec<String> = descriptor
            .fields()
            .iter()
            .filter(|field| include_deprecated || !field.deprecated)
            .map(|field| field.name.clone())
            .collect();

        if let Some(only) = self.only.as_ref().filter(|only| !only.is_empty()) {
            fields.retain(|field| only.contains(field));
        }
        if let Some(except) = &self.except {
            fields.retain(|field| !except.contains(field));
        }
        if let Some(include) = &self.include {
            for field in include {
                if !fields.contains(field) {
                    fields.push(field.clone());
                }
            }
        }
        fields
    }
}

/// How one outbound field gets its value.
#[derive(Clone)]
pub(crate) enum Accessor {
    Transformer(FieldTransformer),
    Computed(RecordFn),
    Attribute {
        column: String,
        column_type: Option<ColumnType>,
        converter: Option<Converter>,
    },
    Association(Association),
    Missing,
}

impl Accessor {
    fn resolve(configuration: &Configuration, columns: &ColumnMap, field: &str) -> Self {
        if let Some(transformer) = configuration.field_transformers.get(field) {
            return Self::Transformer(transformer.clone());
        }
        if let Some(computed) = configuration.computed_accessors.get(field) {
            return Self::Computed(Arc::clone(computed));
        }

        let column = configuration
            .aliases
            .get(field)
            .map(String::as_str)
            .unwrap_or(field);
        if columns.contains(column) {
            let converter = configuration
                .converters
                .converter_for(Direction::Outbound, column)
                .or_else(|| configuration.converters.converter_for(Direction::Outbound, field))
                .cloned();
            return Self::Attribute {
                column: column.to_string(),
                column_type: columns.column_type(column).cloned(),
                converter,
            };
        }

        if let Some(association) = configuration.associations.get(field) {
            return Self::Association(association.clone());
        }
        Self::Missing
    }

    fn read(&self, entity: &str, field: &str, record: &Record) -> Result<Value> {
        match self {
            Self::Transformer(transformer) => transformer.call(record),
            Self::Computed(computed) => computed(record),
            Self::Attribute {
                column,
                column_type,
                converter,
            } => {
                let Some(value) = record.get(column) else {
                    debug!(entity, field, column = %column, "record lacks attribute; reading null");
                    return Ok(Value::Null);
                };
                match converter {
                    Some(converter) => converter.call(value.clone()),
                    None => coerce_outbound(column_type.as_ref(), value.clone()),
                }
            }
            Self::Association(association) => {
                let child = association.child();
                let messages = record
                    .association(association.name())
                    .iter()
                    .map(|associated| {
                        child
                            .to_message(associated, &FieldOptions::default())
                            .map(Value::from)
                    })
                    .collect::<Result<Vec<Value>>>()?;
                Ok(Value::Array(messages))
            }
            Self::Missing => {
                trace!(entity, field, "no accessor; reading null");
                Ok(Value::Null)
            }
        }
    }
}

/// Accessors for every declared message field, tagged with the column
/// generation and declaration version they were built from.
pub(crate) struct AccessorTable {
    generation: u64,
    version: u64,
    accessors: HashMap<String, Accessor>,
}

impl AccessorTable {
    fn build(configuration: &Configuration, columns: &ColumnMap, generation: u64, version: u64) -> Self {
        let mut accessors = HashMap::new();
        if let Some(descriptor) = &configuration.message {
            for field in descriptor.field_names() {
                accessors.insert(field.to_string(), Accessor::resolve(configuration, columns, field));
            }
        }
        for field in configuration
            .field_transformers
            .keys()
            .chain(configuration.computed_accessors.keys())
        {
            accessors
                .entry(field.clone())
                .or_insert_with(|| Accessor::resolve(configuration, columns, field));
        }
        Self {
            generation,
            version,
            accessors,
        }
    }

    fn is_current(&self, generation: u64, version: u64) -> bool {
        self.generation == generation && self.version == version
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }
}

/// Outbound values in resolved field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    entries: Vec<(String, Value)>,
}

impl FieldValues {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Adjusts a value to the declared field type where the mapping is lossless.
fn fit_to_field(field_type: &FieldType, value: Value) -> Value {
    match (field_type, value) {
        (FieldType::String, Value::Uuid(uuid)) => Value::Text(uuid.to_string()),
        (FieldType::Double, Value::Integer(i)) => Value::Float(i as f64),
        (_, value) => value,
    }
}

impl EntityType {
    /// Declares the message this type serializes to, with default field
    /// options for outbound calls.
    pub fn declare_message(&self, descriptor: Arc<MessageDescriptor>, options: FieldOptions) -> Result<()> {
        self.declare(|configuration| {
            configuration.message = Some(descriptor);
            configuration.field_options = options;
            Ok(())
        })
    }

    pub fn message_descriptor(&self) -> Result<Option<Arc<MessageDescriptor>>> {
        Ok(self.configuration()?.message)
    }

    /// Computed outbound value for `field`.
    pub fn define_accessor<F>(&self, field: &str, f: F) -> Result<()>
    where
        F: Fn(&Record) -> Result<Value> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration
                .computed_accessors
                .insert(field.to_string(), Arc::new(f));
            Ok(())
        })
    }

    fn accessor_table(
        &self,
        configuration: &Configuration,
        columns: &ColumnMap,
        generation: u64,
        version: u64,
    ) -> Result<Arc<AccessorTable>> {
        if let Some(table) = self.cached_accessors()?
            && table.is_current(generation, version)
        {
            return Ok(table);
        }

        let table = Arc::new(AccessorTable::build(configuration, columns, generation, version));
        debug!(entity = %self.name(), accessors = table.len(), "built accessor table");
        self.cache_accessors(Arc::clone(&table))?;
        Ok(table)
    }

    /// Field values for `record`, in resolved field order. Fields without
    /// an accessor read as null.
    pub fn fields_from(&self, record: &Record, options: &FieldOptions) -> Result<FieldValues> {
        let version = self.version();
        let columns = self.columns()?;
        let generation = columns.generation();
        let configuration = self.configuration()?;

        let descriptor = configuration
            .message
            .clone()
            .ok_or_else(|| MappingError::MessageNotDefined(self.name().to_string()))?;
        let options = options.merged_over(&configuration.field_options);
        let fields = options.resolve_fields(&descriptor, &configuration.config);
        let table = self.accessor_table(&configuration, &columns, generation, version)?;

        let mut values = FieldValues::default();
        for field in fields {
            let value = match table.accessors.get(&field) {
                Some(accessor) => accessor.read(self.name(), &field, record)?,
                None => Accessor::resolve(&configuration, &columns, &field).read(self.name(), &field, record)?,
            };
            values.entries.push((field, value));
        }
        Ok(values)
    }

    /// Serializes `record` into this type's declared message. Null values
    /// and fields the message does not declare are left unset.
    pub fn to_message(&self, record: &Record, options: &FieldOptions) -> Result<DynamicMessage> {
        let descriptor = self
            .message_descriptor()?
            .ok_or_else(|| MappingError::MessageNotDefined(self.name().to_string()))?;
        let values = self.fields_from(record, options)?;

        let mut message = DynamicMessage::new(Arc::clone(&descriptor));
        for (field, value) in values {
            if value.is_null() {
                continue;
            }
            let Some(declared) = descriptor.field(&field) else {
                continue;
            };
            let value = match value {
                Value::Array(items) if declared.is_repeated() => Value::Array(
                    items
                        .into_iter()
                        .map(|item| fit_to_field(&declared.field_type, item))
                        .collect(),
                ),
                other => fit_to_field(&declared.field_type, other),
            };
            message.set(&field, value)?;
        }
        Ok(message)
    }
}
