use std::fmt;

use super::{MappingError, Result, Value};

pub type Row = Vec<Value>;

/// Declared type of a relational column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Binary,
    Uuid,
    Date,
    DateTime,
    Time,
    Timestamp,
    Other(String),
}

impl ColumnType {
    /// Canonical lowercase name, as used when synthesizing `(from, to)`
    /// converter keys from a column's type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "string",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "bigint" | "int64" => Self::Integer,
            "float" | "double" | "decimal" | "real" => Self::Float,
            "string" | "text" | "varchar" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "binary" | "bytes" | "blob" => Self::Binary,
            "uuid" => Self::Uuid,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::DateTime | Self::Time | Self::Timestamp
        )
    }

    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_) | Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Binary, Value::Bytes(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Date, Value::Date(_)) => true,
            (Self::DateTime | Self::Time | Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Other(_), _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column descriptor as reported by the relational collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(MappingError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.column_type.is_compatible(value) {
            return Err(MappingError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.column_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}
