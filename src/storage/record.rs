use std::collections::{BTreeMap, BTreeSet};

use crate::core::Value;
use crate::transform::Attributes;

/// In-memory image of one relational row plus any loaded to-many associations.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entity: String,
    table: String,
    id: Option<u64>,
    attributes: BTreeMap<String, Value>,
    associations: BTreeMap<String, Vec<Record>>,
    new_record: bool,
    destroyed: bool,
    changed: BTreeSet<String>,
}

impl Record {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            id: None,
            attributes: BTreeMap::new(),
            associations: BTreeMap::new(),
            new_record: true,
            destroyed: false,
            changed: BTreeSet::new(),
        }
    }

    /// A record as loaded from storage: persisted and clean.
    pub fn loaded(
        entity: impl Into<String>,
        table: impl Into<String>,
        id: u64,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id: Some(id),
            attributes,
            new_record: false,
            ..Self::new(entity, table)
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id(&self) -> Option<u64> {
        self.id
    }

    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// `None` when the record carries no such attribute at all, which is
    /// distinct from an attribute explicitly holding `Null`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn read(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if self.attributes.get(&name) != Some(&value) {
            self.changed.insert(name.clone());
        }
        self.attributes.insert(name, value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn association(&self, name: &str) -> &[Record] {
        self.associations.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn association_names(&self) -> impl Iterator<Item = &str> {
        self.associations.keys().map(String::as_str)
    }

    pub fn associate(&mut self, name: impl Into<String>, record: Record) {
        self.associations.entry(name.into()).or_default().push(record);
    }

    pub fn set_association(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.associations.insert(name.into(), records);
    }

    /// Applies a transformed attribute set. Nested entries update the
    /// associated record with a matching `id`, or append a new one.
    pub fn assign(&mut self, attributes: &Attributes) {
        for (name, value) in attributes.values() {
            self.set(name.clone(), value.clone());
        }

        for (name, nested) in attributes.nested() {
            let children = self.associations.entry(name.clone()).or_default();
            for child_attributes in nested.items() {
                let target_id = child_attributes.get("id").and_then(Value::as_i64);
                let existing = target_id.and_then(|id| {
                    children.iter().position(|child| {
                        child.id.and_then(|cid| i64::try_from(cid).ok()) == Some(id)
                    })
                });

                match existing {
                    Some(idx) => children[idx].assign(child_attributes),
                    None => {
                        let mut child = Record::new(nested.entity(), nested.table());
                        child.assign(child_attributes);
                        children.push(child);
                    }
                }
            }
        }
    }

    pub(crate) fn mark_persisted(&mut self, id: u64) {
        self.id = Some(id);
        self.new_record = false;
        self.changed.clear();
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }
}
