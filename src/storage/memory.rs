use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{Query, Record, RecordStore, Table, TableSchema};
use crate::core::{Column, MappingError, Result, Row, Value};

/// Name of the column that mirrors a record's row id, when a table declares it.
pub const ID_COLUMN: &str = "id";

/// Thread-safe in-memory implementation of [`RecordStore`].
#[derive(Default)]
pub struct InMemoryStore {
    /// Each table has its own lock; the outer lock only guards the name map.
    tables: RwLock<HashMap<String, Arc<RwLock<Table>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn create_table(&self, name: &str, columns: Vec<Column>) -> Result<()> {
        let mut tables = self.tables.write()?;
        if tables.contains_key(name) {
            return Err(MappingError::ConstraintViolation(format!(
                "Table '{}' already exists",
                name
            )));
        }

        let table = Table::new(TableSchema::new(name, columns));
        tables.insert(name.to_string(), Arc::new(RwLock::new(table)));
        Ok(())
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.write()?.remove(name).is_none() {
            return Err(MappingError::TableNotFound(name.to_string()));
        }
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables
            .read()
            .map(|tables| tables.contains_key(name))
            .unwrap_or(false)
    }

    pub fn add_column(&self, table: &str, column: Column) -> Result<()> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.add_column(column)
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let handle = self.get_table(table)?;
        let mut table = handle.write()?;
        table.drop_column(column)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        let handle = self.get_table(table)?;
        let table = handle.read()?;
        Ok(table.row_count())
    }

    fn get_table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| MappingError::TableNotFound(name.to_string()))
    }

    fn row_from_record(schema: &TableSchema, record: &Record, id: Option<u64>) -> Result<Row> {
        schema
            .columns()
            .iter()
            .map(|column| match (column.name.as_str(), id) {
                (ID_COLUMN, Some(id)) => i64::try_from(id)
                    .map(Value::Integer)
                    .map_err(|_| MappingError::ConstraintViolation(format!("Row id {} out of range", id))),
                _ => Ok(record.read(&column.name)),
            })
            .collect()
    }

    fn record_from_row(query: &Query, schema: &TableSchema, id: u64, row: &Row) -> Record {
        let attributes: BTreeMap<String, Value> = schema
            .columns()
            .iter()
            .zip(row.iter())
            .map(|(column, value)| (column.name.clone(), value.clone()))
            .collect();
        Record::loaded(query.entity(), query.table(), id, attributes)
    }
}

impl RecordStore for InMemoryStore {
    fn columns(&self, table: &str) -> Result<Option<Vec<Column>>> {
        let handle = match self.tables.read()?.get(table) {
            Some(handle) => Arc::clone(handle),
            None => return Ok(None),
        };
        let table = handle.read()?;
        Ok(Some(table.schema().columns().to_vec()))
    }

    fn select(&self, query: &Query) -> Result<Vec<Record>> {
        let handle = self.get_table(query.table())?;
        let table = handle.read()?;

        let mut records = Vec::new();
        for (id, row) in table.scan_with_ids() {
            let record = Self::record_from_row(query, table.schema(), id, row);
            if query.matches(&record) {
                records.push(record);
                if query.limit_value().is_some_and(|limit| records.len() >= limit) {
                    break;
                }
            }
        }
        Ok(records)
    }

    fn insert(&self, record: &mut Record) -> Result<()> {
        let handle = self.get_table(record.table())?;
        let mut table = handle.write()?;

        let has_id_column = table.schema().find_column_index(ID_COLUMN).is_some();
        let row = Self::row_from_record(table.schema(), record, None)?;
        let id = table.insert(row)?;

        if has_id_column {
            let row = Self::row_from_record(table.schema(), record, Some(id))?;
            table.update(id, row)?;
            record.set(ID_COLUMN, Value::Integer(i64::try_from(id).unwrap_or(i64::MAX)));
        }
        record.mark_persisted(id);
        Ok(())
    }

    fn update(&self, record: &mut Record) -> Result<()> {
        let id = record.id().ok_or_else(|| {
            MappingError::ConstraintViolation("Cannot update a record that was never saved".into())
        })?;

        let handle = self.get_table(record.table())?;
        let mut table = handle.write()?;
        let row = Self::row_from_record(table.schema(), record, Some(id))?;
        if !table.update(id, row)? {
            return Err(MappingError::RecordNotFound {
                table: record.table().to_string(),
                id,
            });
        }
        record.mark_persisted(id);
        Ok(())
    }

    fn delete(&self, record: &mut Record) -> Result<bool> {
        let Some(id) = record.id() else {
            return Ok(false);
        };

        let handle = self.get_table(record.table())?;
        let deleted = handle.write()?.delete(id);
        if deleted {
            record.mark_destroyed();
        }
        Ok(deleted)
    }
}
