//! Copy-on-derive configuration inheritance
//!
//! Every configuration table an entity type owns is either an `im`
//! persistent collection or an `Arc` to immutable data, so deriving a
//! subtype is a cheap structural copy after which parent and child evolve
//! independently. Registration and derivation both run under one
//! process-wide declaration lock.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use lazy_static::lazy_static;
use tracing::debug;

use super::entity::{EntityParts, EntityType};
use crate::core::{MappingError, Result};

lazy_static! {
    static ref DECLARATION_LOCK: Mutex<()> = Mutex::new(());
}

/// Serializes configuration registration and subtype derivation across all
/// entity types.
pub(crate) fn declaration_guard() -> Result<MutexGuard<'static, ()>> {
    Ok(DECLARATION_LOCK.lock()?)
}

/// A user table that follows the copy-on-derive rule.
pub trait InheritableTable: Any + Send + Sync {
    fn inherit(&self) -> Box<dyn InheritableTable>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Send + Sync + 'static> InheritableTable for T {
    fn inherit(&self) -> Box<dyn InheritableTable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Named user tables registered on one entity type.
#[derive(Default)]
pub struct InheritableTables {
    tables: BTreeMap<String, Box<dyn InheritableTable>>,
}

impl InheritableTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table unless one with that name already exists. Returns
    /// whether the value was stored.
    pub fn register<T: Clone + Send + Sync + 'static>(&mut self, name: &str, value: T) -> bool {
        if self.tables.contains_key(name) {
            return false;
        }
        self.tables.insert(name.to_string(), Box::new(value));
        true
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        let table: &dyn InheritableTable = self.tables.get(name)?.as_ref();
        table.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        let table: &mut dyn InheritableTable = self.tables.get_mut(name)?.as_mut();
        table.as_any_mut().downcast_mut::<T>()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Independent copy of every table.
    pub fn inherit(&self) -> Self {
        Self {
            tables: self
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.as_ref().inherit()))
                .collect(),
        }
    }
}

impl EntityType {
    /// Declares a subtype. The subtype starts from a copy of every table this
    /// type currently holds, including the column cache.
    pub fn derive(self: &Arc<Self>, name: impl Into<String>) -> Result<Arc<EntityType>> {
        let name = name.into();
        let _guard = declaration_guard()?;

        let configuration = self.configuration()?;
        let extensions = self.extensions.read()?.inherit();
        let columns = self.columns.inherit()?;

        debug!(parent = %self.name(), child = %name, "derived entity type");
        Ok(EntityType::from_parts(EntityParts {
            name,
            table: self.table().to_string(),
            parent: Some(self.name().to_string()),
            store: Arc::clone(self.store()),
            columns,
            configuration,
            extensions,
        }))
    }

    /// Registers a user table on this type. Subtypes derived afterwards get
    /// their own copy; an existing table of the same name is left untouched.
    pub fn register_inheritable<T>(&self, name: &str, value: T) -> Result<bool>
    where
        T: Clone + Send + Sync + 'static,
    {
        let _guard = declaration_guard()?;
        Ok(self.extensions.write()?.register(name, value))
    }

    /// Runs `f` against this type's copy of a user table.
    pub fn with_inheritable<T, R, F>(&self, name: &str, f: F) -> Result<R>
    where
        T: 'static,
        F: FnOnce(&mut T) -> R,
    {
        let _guard = declaration_guard()?;
        let mut extensions = self.extensions.write()?;
        let table = extensions.get_mut::<T>(name).ok_or_else(|| {
            MappingError::ConfigError(format!(
                "No inheritable table '{}' of the requested type on '{}'",
                name,
                self.name()
            ))
        })?;
        Ok(f(table))
    }

    pub fn inheritable_names(&self) -> Result<Vec<String>> {
        Ok(self
            .extensions
            .read()?
            .names()
            .map(str::to_string)
            .collect())
    }
}
