//! Per-entity-type column metadata cache
//!
//! The column listing is pulled from the relational collaborator on first
//! access and memoized. Concurrent first accesses converge on one load:
//! check the flag, take the mutex, check again, load, publish. The published
//! map is an immutable `Arc` snapshot, so a forced remap swaps it wholesale
//! and readers see either the old map or the new one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::core::{Column, ColumnType, Result};

/// Immutable column descriptors plus the type index derived from them.
/// Each published map carries the cache generation it was published under.
#[derive(Debug, Default, PartialEq)]
pub struct ColumnMap {
    columns: BTreeMap<String, Column>,
    order: Vec<String>,
    by_type: BTreeMap<ColumnType, BTreeSet<String>>,
    generation: u64,
}

impl ColumnMap {
    /// Builds the map. A repeated name replaces the earlier descriptor and
    /// keeps its original position.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut map = Self::default();
        for column in columns {
            let name = column.name.clone();
            let column_type = column.column_type.clone();
            match map.columns.insert(name.clone(), column) {
                Some(previous) => map.unindex(&previous),
                None => map.order.push(name.clone()),
            }
            map.by_type.entry(column_type).or_default().insert(name);
        }
        map
    }

    fn unindex(&mut self, column: &Column) {
        if let Some(names) = self.by_type.get_mut(&column.column_type) {
            names.remove(&column.name);
            if names.is_empty() {
                self.by_type.remove(&column.column_type);
            }
        }
    }

    fn published(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Generation this map was published under; 0 for a map never published.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
        self.columns.get(name).map(|column| &column.column_type)
    }

    pub fn is_temporal(&self, name: &str) -> bool {
        self.column_type(name).is_some_and(ColumnType::is_temporal)
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn names_of_type(&self, column_type: &ColumnType) -> Option<&BTreeSet<String>> {
        self.by_type.get(column_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub struct ColumnCache {
    mapped: AtomicBool,
    lock: Mutex<()>,
    current: RwLock<Arc<ColumnMap>>,
    generation: AtomicU64,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self {
            mapped: AtomicBool::new(false),
            lock: Mutex::new(()),
            current: RwLock::new(Arc::new(ColumnMap::default())),
            generation: AtomicU64::new(0),
        }
    }

    /// A cache for a subtype, starting from this cache's current state.
    pub(crate) fn inherit(&self) -> Result<Self> {
        let _guard = self.lock.lock()?;
        Ok(Self {
            mapped: AtomicBool::new(self.mapped.load(Ordering::Acquire)),
            lock: Mutex::new(()),
            current: RwLock::new(Arc::clone(&*self.current.read()?)),
            generation: AtomicU64::new(self.generation.load(Ordering::Acquire)),
        })
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    /// Bumped every time a new map is published.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Result<Arc<ColumnMap>> {
        Ok(Arc::clone(&*self.current.read()?))
    }

    /// Returns the memoized map, loading it first if needed. When the loader
    /// reports no table, the cache stays unmapped and the empty map is
    /// returned, so a later call retries.
    pub fn get_or_map<F>(&self, load: F) -> Result<Arc<ColumnMap>>
    where
        F: FnOnce() -> Result<Option<Vec<Column>>>,
    {
        if self.is_mapped() {
            return self.snapshot();
        }

        let _guard = self.lock.lock()?;
        if self.is_mapped() {
            return self.snapshot();
        }

        self.load_and_publish(load)
    }

    /// Recomputes the map from scratch, e.g. after a schema change. A missing
    /// table leaves the previous state in place.
    pub fn remap<F>(&self, load: F) -> Result<Arc<ColumnMap>>
    where
        F: FnOnce() -> Result<Option<Vec<Column>>>,
    {
        let _guard = self.lock.lock()?;
        self.load_and_publish(load)
    }

    fn load_and_publish<F>(&self, load: F) -> Result<Arc<ColumnMap>>
    where
        F: FnOnce() -> Result<Option<Vec<Column>>>,
    {
        let Some(columns) = load()? else {
            debug!("column source has no table; cache left unmapped");
            return self.snapshot();
        };

        let generation = self.generation.load(Ordering::Acquire) + 1;
        let map = Arc::new(ColumnMap::from_columns(columns).published(generation));
        *self.current.write()? = Arc::clone(&map);
        self.generation.store(generation, Ordering::Release);
        self.mapped.store(true, Ordering::Release);

        debug!(columns = map.len(), generation, "mapped columns");
        Ok(map)
    }
}

impl Default for ColumnCache {
    fn default() -> Self {
        Self::new()
    }
}
