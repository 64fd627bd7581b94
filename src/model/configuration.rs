use std::fmt;
use std::sync::Arc;

use im::{OrdMap, OrdSet, Vector};

use super::association::Association;
use crate::config::BridgeConfig;
use crate::message::MessageDescriptor;
use crate::scope::{ScopeFn, SearchField};
use crate::transform::{
    AttributeTransformer, ConverterRegistry, ConverterTable, FieldOptions, FieldTransformer,
    MessageFn, RecordFn,
};

/// Every declaration table of one entity type.
///
/// All tables are persistent collections, so `clone` is the shallow copy a
/// derived subtype starts from and never aliases the source.
#[derive(Clone)]
pub struct Configuration {
    pub(crate) config: Arc<BridgeConfig>,
    pub(crate) converter_table: ConverterTable,
    pub(crate) converters: ConverterRegistry,
    pub(crate) attribute_transformers: OrdMap<String, AttributeTransformer>,
    pub(crate) field_transformers: OrdMap<String, FieldTransformer>,
    pub(crate) message_methods: OrdMap<String, MessageFn>,
    pub(crate) record_methods: OrdMap<String, RecordFn>,
    pub(crate) computed_accessors: OrdMap<String, RecordFn>,
    /// alias field -> attribute
    pub(crate) aliases: OrdMap<String, String>,
    pub(crate) search_fields: Vector<SearchField>,
    pub(crate) scopes: OrdMap<String, ScopeFn>,
    pub(crate) upsert_keys: Vector<Vec<String>>,
    pub(crate) associations: OrdMap<String, Association>,
    pub(crate) nested_attributes: Vector<String>,
    pub(crate) protected: OrdSet<String>,
    pub(crate) accessible: Option<OrdSet<String>>,
    pub(crate) message: Option<Arc<MessageDescriptor>>,
    pub(crate) field_options: FieldOptions,
}

impl Configuration {
    pub fn new(config: Arc<BridgeConfig>) -> Self {
        Self {
            config,
            converter_table: ConverterTable::with_builtins(),
            converters: ConverterRegistry::default(),
            attribute_transformers: OrdMap::new(),
            field_transformers: OrdMap::new(),
            message_methods: OrdMap::new(),
            record_methods: OrdMap::new(),
            computed_accessors: OrdMap::new(),
            aliases: OrdMap::new(),
            search_fields: Vector::new(),
            scopes: OrdMap::new(),
            upsert_keys: Vector::new(),
            associations: OrdMap::new(),
            nested_attributes: Vector::new(),
            protected: OrdSet::new(),
            accessible: None,
            message: None,
            field_options: FieldOptions::default(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn message(&self) -> Option<&Arc<MessageDescriptor>> {
        self.message.as_ref()
    }

    pub fn search_field(&self, field: &str) -> Option<&SearchField> {
        self.search_fields.iter().find(|declared| declared.field() == field)
    }

    /// Whether an attribute passes the mass-assignment filter.
    pub fn is_assignable(&self, attribute: &str) -> bool {
        match &self.accessible {
            Some(accessible) => accessible.contains(attribute),
            None => !self.protected.contains(attribute),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("converters", &self.converters)
            .field(
                "attribute_transformers",
                &self.attribute_transformers.keys().collect::<Vec<_>>(),
            )
            .field(
                "field_transformers",
                &self.field_transformers.keys().collect::<Vec<_>>(),
            )
            .field("search_fields", &self.search_fields)
            .field("upsert_keys", &self.upsert_keys)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .field("message", &self.message.as_ref().map(|m| m.name.as_str()))
            .finish()
    }
}
