pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorClass, MappingError, Result};
pub use types::{Column, ColumnType, Row};
pub use value::Value;
