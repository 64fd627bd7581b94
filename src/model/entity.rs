use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::columns::{ColumnCache, ColumnMap};
use super::configuration::Configuration;
use super::inheritance::{InheritableTables, declaration_guard};
use crate::config::BridgeConfig;
use crate::core::{ColumnType, Result};
use crate::storage::{Query, RecordStore};
use crate::transform::AccessorTable;

/// Descriptor of one relational entity type and everything declared on it.
///
/// Declarations (`convert_field`, `field_scope`, `upsert_key`, ...) are
/// expected during setup; request-time operations read a snapshot of the
/// configuration and never hold its lock while calling user code.
pub struct EntityType {
    name: String,
    table: String,
    parent: Option<String>,
    store: Arc<dyn RecordStore>,
    pub(crate) columns: ColumnCache,
    configuration: RwLock<Configuration>,
    pub(crate) extensions: RwLock<InheritableTables>,
    version: AtomicU64,
    accessors: RwLock<Option<Arc<AccessorTable>>>,
}

pub(crate) struct EntityParts {
    pub name: String,
    pub table: String,
    pub parent: Option<String>,
    pub store: Arc<dyn RecordStore>,
    pub columns: ColumnCache,
    pub configuration: Configuration,
    pub extensions: InheritableTables,
}

impl EntityType {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        store: Arc<dyn RecordStore>,
    ) -> Arc<Self> {
        Self::from_parts(EntityParts {
            name: name.into(),
            table: table.into(),
            parent: None,
            store,
            columns: ColumnCache::new(),
            configuration: Configuration::new(Arc::new(BridgeConfig::default())),
            extensions: InheritableTables::new(),
        })
    }

    pub fn with_config(
        name: impl Into<String>,
        table: impl Into<String>,
        store: Arc<dyn RecordStore>,
        config: BridgeConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        Ok(Self::from_parts(EntityParts {
            name: name.into(),
            table: table.into(),
            parent: None,
            store,
            columns: ColumnCache::new(),
            configuration: Configuration::new(Arc::new(config)),
            extensions: InheritableTables::new(),
        }))
    }

    pub(crate) fn from_parts(parts: EntityParts) -> Arc<Self> {
        Arc::new(Self {
            name: parts.name,
            table: parts.table,
            parent: parts.parent,
            store: parts.store,
            columns: parts.columns,
            configuration: RwLock::new(parts.configuration),
            extensions: RwLock::new(parts.extensions),
            version: AtomicU64::new(0),
            accessors: RwLock::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the type this one was derived from.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn config(&self) -> Result<Arc<BridgeConfig>> {
        Ok(Arc::clone(&self.configuration.read()?.config))
    }

    /// Column metadata, mapped from the store on first use.
    pub fn columns(&self) -> Result<Arc<ColumnMap>> {
        self.columns.get_or_map(|| self.store.columns(&self.table))
    }

    /// Discards the memoized columns and maps them again.
    pub fn remap_columns(&self) -> Result<Arc<ColumnMap>> {
        self.columns.remap(|| self.store.columns(&self.table))
    }

    pub fn column_type(&self, name: &str) -> Result<Option<ColumnType>> {
        Ok(self.columns()?.column_type(name).cloned())
    }

    pub fn is_temporal(&self, name: &str) -> Result<bool> {
        Ok(self.columns()?.is_temporal(name))
    }

    pub fn attribute_names(&self) -> Result<Vec<String>> {
        Ok(self.columns()?.names().map(str::to_string).collect())
    }

    /// Unfiltered query over this type's table.
    pub fn base_query(&self) -> Query {
        Query::new(&self.name, &self.table)
    }

    /// Snapshot of the current configuration.
    pub fn configuration(&self) -> Result<Configuration> {
        Ok(self.configuration.read()?.clone())
    }

    /// Runs one declaration under the process-wide declaration lock.
    pub(crate) fn declare<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Configuration) -> Result<R>,
    {
        let _guard = declaration_guard()?;
        let mut configuration = self.configuration.write()?;
        let result = f(&mut configuration)?;
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(result)
    }

    /// Counts successful declarations; cached derived tables compare it.
    pub(crate) fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn cached_accessors(&self) -> Result<Option<Arc<AccessorTable>>> {
        Ok(self.accessors.read()?.clone())
    }

    pub(crate) fn cache_accessors(&self, table: Arc<AccessorTable>) -> Result<()> {
        *self.accessors.write()? = Some(table);
        Ok(())
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("parent", &self.parent)
            .finish()
    }
}
