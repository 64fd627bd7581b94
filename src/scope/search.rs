use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::core::{MappingError, Result, Value};
use crate::message::Message;
use crate::model::{Configuration, EntityType};
use crate::storage::{Query, Record};
use crate::transform::{ConvertFn, Resolvable};

/// A named, composable predicate builder. Always receives a collection of
/// values, even for a single scalar.
pub type ScopeFn = Arc<dyn Fn(Query, Vec<Value>) -> Result<Query> + Send + Sync>;

/// A searchable field: the predicate builder it maps to and an optional
/// value parser.
#[derive(Clone)]
pub struct SearchField {
    field: String,
    scope: String,
    parser: Option<ConvertFn>,
}

impl SearchField {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// Values handed to the predicate builder: parsed, flattened, and
    /// mapped to integer tags for enum fields.
    pub fn values_from(&self, message: &dyn Message) -> Result<Vec<Value>> {
        let raw = message.get(&self.field).cloned().unwrap_or(Value::Null);
        let parsed = match &self.parser {
            Some(parser) => parser(raw)?,
            None => raw,
        };

        let enum_type = message
            .descriptor()
            .field(&self.field)
            .and_then(|field| field.enum_descriptor());

        Ok(parsed
            .into_values()
            .into_iter()
            .map(|value| match enum_type.and_then(|e| e.tag_for(&value)) {
                Some(tag) => Value::Integer(tag),
                None => value,
            })
            .collect())
    }
}

impl fmt::Debug for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchField")
            .field("field", &self.field)
            .field("scope", &self.scope)
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeOptions {
    /// Predicate builder name; defaults to the configured prefix plus the
    /// field name.
    pub scope: Option<String>,
    pub parser: Option<Resolvable>,
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scope = Some(name.into());
        self
    }

    pub fn parser(mut self, parser: impl Into<Resolvable>) -> Self {
        self.parser = Some(parser.into());
        self
    }
}

/// Applies the predicate builder declared for `declared` to `query`.
pub(crate) fn apply_search_field(
    entity: &str,
    configuration: &Configuration,
    declared: &SearchField,
    query: Query,
    message: &dyn Message,
) -> Result<Query> {
    let scope = configuration
        .scopes
        .get(declared.scope())
        .ok_or_else(|| MappingError::UndefinedScope {
            entity: entity.to_string(),
            scope: declared.scope().to_string(),
        })?;
    let values = declared.values_from(message)?;
    trace!(
        entity,
        field = declared.field(),
        scope = declared.scope(),
        values = values.len(),
        "applying scope"
    );
    scope(query, values)
}

impl EntityType {
    /// Declares `field` searchable. Re-declaring a field replaces it in
    /// place. A parser is resolved now and fails like a converter would.
    pub fn field_scope(&self, field: &str, options: ScopeOptions) -> Result<()> {
        let column_type = self.column_type(field)?;
        self.declare(|configuration| {
            let scope = options
                .scope
                .unwrap_or_else(|| configuration.config.default_scope_for(field));
            let parser = options
                .parser
                .map(|parser| {
                    configuration
                        .converter_table
                        .resolve(field, parser, column_type.as_ref())
                })
                .transpose()?;

            let declared = SearchField {
                field: field.to_string(),
                scope,
                parser,
            };
            match configuration
                .search_fields
                .iter()
                .position(|existing| existing.field == field)
            {
                Some(index) => {
                    configuration.search_fields.set(index, declared);
                }
                None => configuration.search_fields.push_back(declared),
            }
            Ok(())
        })
    }

    /// Registers a predicate builder under `name`.
    pub fn define_scope<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Query, Vec<Value>) -> Result<Query> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration.scopes.insert(name.to_string(), Arc::new(f));
            Ok(())
        })
    }

    /// Registers `name` as a membership predicate on `column`.
    pub fn define_in_scope(&self, name: &str, column: &str) -> Result<()> {
        let column = column.to_string();
        self.define_scope(name, move |query, values| Ok(query.where_in(column.clone(), values)))
    }

    pub fn has_scope(&self, name: &str) -> Result<bool> {
        Ok(self.configuration()?.scopes.contains_key(name))
    }

    /// Declared searchable fields in declaration order.
    pub fn searchable_fields(&self) -> Result<Vec<SearchField>> {
        Ok(self.configuration()?.search_fields.iter().cloned().collect())
    }

    /// Invokes a predicate builder directly.
    pub fn apply_scope(&self, query: Query, name: &str, values: Vec<Value>) -> Result<Query> {
        let scope = self
            .configuration()?
            .scopes
            .get(name)
            .cloned()
            .ok_or_else(|| MappingError::UndefinedScope {
                entity: self.name().to_string(),
                scope: name.to_string(),
            })?;
        scope(query, values)
    }

    /// Narrows the base query by every searchable field present in
    /// `message`, in declaration order. Absent and blank fields are skipped.
    pub fn search_scope(&self, message: &dyn Message) -> Result<Query> {
        let configuration = self.configuration()?;
        let mut query = self.base_query();

        for declared in configuration.search_fields.iter() {
            if !message.is_present(declared.field()) {
                continue;
            }
            query = apply_search_field(self.name(), &configuration, declared, query, message)?;
        }
        Ok(query)
    }

    pub fn scope_from_message(&self, message: &dyn Message) -> Result<Query> {
        self.search_scope(message)
    }

    pub fn by_fields(&self, message: &dyn Message) -> Result<Query> {
        self.search_scope(message)
    }

    /// Records matching [`EntityType::search_scope`].
    pub fn search(&self, message: &dyn Message) -> Result<Vec<Record>> {
        let query = self.search_scope(message)?;
        self.store().select(&query)
    }
}
