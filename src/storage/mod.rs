pub mod engine;
pub mod memory;
pub mod query;
pub mod record;
pub mod table;

pub use engine::RecordStore;
pub use memory::{ID_COLUMN, InMemoryStore};
pub use query::{Predicate, Query, RecordMatcher};
pub use record::Record;
pub use table::{Table, TableSchema};
