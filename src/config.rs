use std::path::Path;

use serde::Deserialize;

use crate::core::{MappingError, Result};

/// Mapping configuration shared by an entity type and its subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Reserved repeated string field listing attributes to force to null
    pub nullify_field: String,

    /// Prefix of the predicate builder used when a field scope names none
    pub scope_prefix: String,

    /// Suffix probed first when reading nested association messages
    pub nested_suffix: String,

    /// Whether outbound serialization includes deprecated fields by default
    pub include_deprecated: bool,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self {
            nullify_field: "nullify".to_string(),
            scope_prefix: "by_".to_string(),
            nested_suffix: "_attributes".to_string(),
            include_deprecated: true,
        }
    }

    /// Set the nullify field name
    pub fn nullify_field(mut self, name: &str) -> Self {
        self.nullify_field = name.to_string();
        self
    }

    /// Set the default scope prefix
    pub fn scope_prefix(mut self, prefix: &str) -> Self {
        self.scope_prefix = prefix.to_string();
        self
    }

    /// Set the nested attributes suffix
    pub fn nested_suffix(mut self, suffix: &str) -> Self {
        self.nested_suffix = suffix.to_string();
        self
    }

    /// Include or skip deprecated fields by default
    pub fn include_deprecated(mut self, include: bool) -> Self {
        self.include_deprecated = include;
        self
    }

    /// Parse from a JSON document; missing keys keep their defaults.
    ///
    /// ```
    /// # use protorecord::BridgeConfig;
    /// let config = BridgeConfig::from_json_str(r#"{"scope_prefix": "with_"}"#).unwrap();
    /// assert_eq!(config.scope_prefix, "with_");
    /// assert_eq!(config.nullify_field, "nullify");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Default predicate builder name for a field.
    pub fn default_scope_for(&self, field: &str) -> String {
        format!("{}{}", self.scope_prefix, field)
    }

    pub fn nested_field_for(&self, association: &str) -> String {
        format!("{}{}", association, self.nested_suffix)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.nullify_field.trim().is_empty() {
            return Err(MappingError::ConfigError(
                "nullify_field cannot be empty".into(),
            ));
        }
        if self.nested_suffix.is_empty() {
            return Err(MappingError::ConfigError(
                "nested_suffix cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
