use thiserror::Error;

/// Coarse classification of a [`MappingError`].
///
/// Configuration errors surface while an entity type is being declared and
/// should abort setup. Everything else surfaces while handling a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Configuration,
    Predicate,
    UpsertEligibility,
    Conversion,
    Message,
    Storage,
}

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Converter for '{key}' is not callable: {reason}")]
    ConverterNotCallable { key: String, reason: String },

    #[error("Attribute transformer for '{0}' must be a callable or a defined method")]
    AttributeTransformerError(String),

    #[error("Field transformer for '{0}' must be a callable or a defined method")]
    FieldTransformerError(String),

    #[error("Upsert key field '{field}' on '{entity}' has no field scope")]
    UpsertKeyUndeclared { entity: String, field: String },

    #[error("Association '{association}' is not declared on '{entity}'")]
    AssociationNotDeclared { entity: String, association: String },

    #[error("Undefined predicate builder '{scope}' on '{entity}'")]
    UndefinedScope { entity: String, scope: String },

    #[error("No eligible upsert key for '{0}'")]
    UpsertNotFound(String),

    #[error("'{0}' does not declare a message")]
    MessageNotDefined(String),

    #[error("Field '{field}' not found in message '{message}'")]
    UnknownField { message: String, field: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: u64 },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl MappingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ConverterNotCallable { .. }
            | Self::AttributeTransformerError(_)
            | Self::FieldTransformerError(_)
            | Self::UpsertKeyUndeclared { .. }
            | Self::AssociationNotDeclared { .. }
            | Self::ConfigError(_) => ErrorClass::Configuration,
            Self::UndefinedScope { .. } => ErrorClass::Predicate,
            Self::UpsertNotFound(_) => ErrorClass::UpsertEligibility,
            Self::TypeMismatch(_) | Self::Conversion(_) => ErrorClass::Conversion,
            Self::MessageNotDefined(_) | Self::UnknownField { .. } => ErrorClass::Message,
            Self::TableNotFound(_)
            | Self::ColumnNotFound(..)
            | Self::RecordNotFound { .. }
            | Self::ConstraintViolation(_)
            | Self::LockError(_)
            | Self::IoError(_) => ErrorClass::Storage,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.class() == ErrorClass::Configuration
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;

impl<T> From<std::sync::PoisonError<T>> for MappingError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for MappingError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for MappingError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
