use std::collections::BTreeMap;

use crate::core::{Column, MappingError, Result, Row, Value};

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.find_column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: BTreeMap<u64, Row>,
    next_row_id: u64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_row_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn insert(&mut self, row: Row) -> Result<u64> {
        self.validate_row(&row)?;

        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.insert(id, row);
        Ok(id)
    }

    pub fn update(&mut self, id: u64, row: Row) -> Result<bool> {
        self.validate_row(&row)?;

        match self.rows.get_mut(&id) {
            Some(existing) => {
                *existing = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete(&mut self, id: u64) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn get(&self, id: u64) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn scan_with_ids(&self) -> impl Iterator<Item = (u64, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Appends a column; existing rows get `NULL`.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema.find_column_index(&column.name).is_some() {
            return Err(MappingError::ConstraintViolation(format!(
                "Column '{}' already exists in table '{}'",
                column.name, self.schema.name
            )));
        }
        if !column.nullable && !self.rows.is_empty() {
            return Err(MappingError::ConstraintViolation(format!(
                "Cannot add NOT NULL column '{}' to non-empty table '{}'",
                column.name, self.schema.name
            )));
        }

        self.schema.columns.push(column);
        for row in self.rows.values_mut() {
            row.push(Value::Null);
        }
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let idx = self
            .schema
            .find_column_index(name)
            .ok_or_else(|| MappingError::ColumnNotFound(name.to_string(), self.schema.name.clone()))?;

        self.schema.columns.remove(idx);
        for row in self.rows.values_mut() {
            row.remove(idx);
        }
        Ok(())
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        let columns = self.schema.columns();
        if row.len() != columns.len() {
            return Err(MappingError::ConstraintViolation(format!(
                "Expected {} columns, got {}",
                columns.len(),
                row.len()
            )));
        }
        for (column, value) in columns.iter().zip(row.iter()) {
            column.validate(value)?;
        }
        Ok(())
    }
}
