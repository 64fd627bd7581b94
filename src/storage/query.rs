use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::Record;
use crate::core::Value;

pub type RecordMatcher = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// One conjunct of a [`Query`].
#[derive(Clone)]
pub enum Predicate {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    Filter { name: String, matcher: RecordMatcher },
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { column, value } => record.get(column).is_some_and(|v| v == value),
            Self::In { column, values } => record
                .get(column)
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Self::Filter { matcher, .. } => matcher(record),
        }
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Eq { column: a, value: x }, Self::Eq { column: b, value: y }) => a == b && x == y,
            (Self::In { column: a, values: x }, Self::In { column: b, values: y }) => {
                a == b && x == y
            }
            (Self::Filter { name: a, .. }, Self::Filter { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, value } => write!(f, "{} = {}", column, value),
            Self::In { column, values } => {
                write!(f, "{} IN {}", column, Value::Array(values.clone()))
            }
            Self::Filter { name, .. } => write!(f, "FILTER {}", name),
        }
    }
}

/// An AND-composed selection over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    entity: String,
    table: String,
    predicates: Vec<Predicate>,
    limit: Option<usize>,
}

impl Query {
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            predicates: Vec::new(),
            limit: None,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn where_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Predicate::Eq {
            column: column.into(),
            value: value.into(),
        })
    }

    pub fn where_in(self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.and(Predicate::In {
            column: column.into(),
            values,
        })
    }

    pub fn filter<F>(self, name: impl Into<String>, matcher: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.and(Predicate::Filter {
            name: name.into(),
            matcher: Arc::new(matcher),
        })
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|predicate| predicate.matches(record))
    }

    /// Attributes a new record built from this query starts with: every
    /// equality, and every `IN` over exactly one value.
    pub fn creation_attributes(&self) -> BTreeMap<String, Value> {
        let mut attributes = BTreeMap::new();
        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq { column, value } => {
                    attributes.insert(column.clone(), value.clone());
                }
                Predicate::In { column, values } if values.len() == 1 => {
                    attributes.insert(column.clone(), values[0].clone());
                }
                _ => {}
            }
        }
        attributes
    }

    /// A fresh unsaved record seeded with [`Query::creation_attributes`].
    pub fn new_record(&self) -> Record {
        let mut record = Record::new(&self.entity, &self.table);
        for (name, value) in self.creation_attributes() {
            record.set(name, value);
        }
        record
    }
}
