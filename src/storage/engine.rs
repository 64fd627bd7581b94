use super::{Query, Record};
use crate::core::{Column, Result};

/// Relational collaborator: everything the mapping layer needs from a
/// persistence engine. Implementations must be shareable across request
/// threads.
pub trait RecordStore: Send + Sync {
    /// Column listing for a table, or `None` when the table does not exist.
    fn columns(&self, table: &str) -> Result<Option<Vec<Column>>>;

    /// All records matching the query, in storage order.
    fn select(&self, query: &Query) -> Result<Vec<Record>>;

    fn first(&self, query: &Query) -> Result<Option<Record>> {
        Ok(self.select(&query.clone().limit(1))?.into_iter().next())
    }

    /// Persists a new record and marks it persisted.
    fn insert(&self, record: &mut Record) -> Result<()>;

    /// Writes the attributes of a persisted record.
    fn update(&self, record: &mut Record) -> Result<()>;

    /// Removes a persisted record. Returns whether a row was deleted.
    fn delete(&self, record: &mut Record) -> Result<bool>;
}
