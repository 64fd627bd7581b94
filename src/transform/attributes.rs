use std::collections::BTreeMap;

use crate::core::Value;

/// Result of an inbound transformation: attribute values to assign, plus
/// transformed nested association entries.
///
/// A key that is absent means "no opinion"; a key mapped to `Null` means
/// "clear this attribute".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, Value>,
    nested: BTreeMap<String, NestedAttributes>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn nested(&self) -> &BTreeMap<String, NestedAttributes> {
        &self.nested
    }

    pub fn nested_for(&self, association: &str) -> Option<&NestedAttributes> {
        self.nested.get(association)
    }

    pub(crate) fn insert_nested(&mut self, association: impl Into<String>, nested: NestedAttributes) {
        self.nested.insert(association.into(), nested);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.nested.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

/// Transformed entries for one to-many association.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedAttributes {
    entity: String,
    table: String,
    items: Vec<Attributes>,
}

impl NestedAttributes {
    pub fn new(entity: impl Into<String>, table: impl Into<String>, items: Vec<Attributes>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            items,
        }
    }

    /// Entity type name of the associated records.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn items(&self) -> &[Attributes] {
        &self.items
    }
}
