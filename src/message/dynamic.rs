//! Map-backed message
//!
//! JSON loading follows the same field-by-field conversion the relational
//! side uses for rows: each JSON value is converted according to the declared
//! field type, and anything that does not fit is rejected.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{FieldDescriptor, FieldType, Message, MessageDescriptor};
use crate::core::{MappingError, Result, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    values: BTreeMap<String, Value>,
}

impl DynamicMessage {
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
        }
    }

    pub fn builder(descriptor: &Arc<MessageDescriptor>) -> MessageBuilder {
        MessageBuilder {
            message: Self::new(Arc::clone(descriptor)),
            error: None,
        }
    }

    pub fn shared_descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Set a field, checking that it is declared and that the value fits.
    /// Setting `Null` clears the field.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = self.field_descriptor(key)?;

        if !field.accepts(&value) {
            return Err(MappingError::TypeMismatch(format!(
                "Field '{}.{}' expects {}{}, got {}",
                self.descriptor.name,
                key,
                if field.is_repeated() { "repeated " } else { "" },
                field.field_type.name(),
                value.type_name()
            )));
        }

        if value.is_null() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value);
        }
        Ok(())
    }

    pub fn clear(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    fn field_descriptor(&self, key: &str) -> Result<&FieldDescriptor> {
        self.descriptor
            .field(key)
            .ok_or_else(|| MappingError::UnknownField {
                message: self.descriptor.name.clone(),
                field: key.to_string(),
            })
    }

    pub fn from_json(descriptor: &Arc<MessageDescriptor>, json: &JsonValue) -> Result<Self> {
        let obj = json.as_object().ok_or_else(|| {
            MappingError::TypeMismatch(format!(
                "Expected JSON object for message '{}'",
                descriptor.name
            ))
        })?;

        let mut message = Self::new(Arc::clone(descriptor));
        for (key, json_value) in obj {
            let field = message.field_descriptor(key)?.clone();
            let value = if field.is_repeated() {
                match json_value {
                    JsonValue::Null => Value::Null,
                    JsonValue::Array(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| json_to_value(item, &field.field_type))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    other => Value::Array(vec![json_to_value(other, &field.field_type)?]),
                }
            } else {
                json_to_value(json_value, &field.field_type)?
            };
            message.set(key, value)?;
        }

        Ok(message)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = serde_json::Map::new();
        for field in self.descriptor.fields() {
            if let Some(value) = self.values.get(&field.name) {
                obj.insert(field.name.clone(), value.to_json());
            }
        }
        JsonValue::Object(obj)
    }
}

fn json_to_value(json_value: &JsonValue, field_type: &FieldType) -> Result<Value> {
    match (json_value, field_type) {
        (JsonValue::Null, _) => Ok(Value::Null),

        (JsonValue::Bool(b), FieldType::Bool) => Ok(Value::Boolean(*b)),

        (JsonValue::Number(n), FieldType::Int64) => n
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| MappingError::TypeMismatch(format!("Cannot convert {} to int64", n))),

        (JsonValue::Number(n), FieldType::Double) => n
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| MappingError::TypeMismatch(format!("Cannot convert {} to double", n))),

        (JsonValue::String(s), FieldType::String) => Ok(Value::Text(s.clone())),

        (JsonValue::Array(bytes), FieldType::Bytes) => bytes
            .iter()
            .map(|b| {
                b.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| MappingError::TypeMismatch(format!("Invalid byte: {}", b)))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Value::Bytes),

        (JsonValue::String(s), FieldType::Bytes) => Ok(Value::Bytes(s.as_bytes().to_vec())),

        (JsonValue::String(s), FieldType::Enum(e)) => e
            .tag_of(s)
            .map(Value::Integer)
            .ok_or_else(|| MappingError::TypeMismatch(format!("'{}' is not a {} value", s, e.name))),

        (JsonValue::Number(n), FieldType::Enum(e)) => n
            .as_i64()
            .and_then(|tag| e.name_of(tag).map(|_| Value::Integer(tag)))
            .ok_or_else(|| MappingError::TypeMismatch(format!("{} is not a {} tag", n, e.name))),

        (JsonValue::Object(_), FieldType::Message(descriptor)) => {
            DynamicMessage::from_json(descriptor, json_value).map(Value::from)
        }

        _ => Err(MappingError::TypeMismatch(format!(
            "Cannot convert JSON {} to field type {}",
            json_value,
            field_type.name()
        ))),
    }
}

impl Message for DynamicMessage {
    fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Builder that defers the first `set` error to `build`.
pub struct MessageBuilder {
    message: DynamicMessage,
    error: Option<MappingError>,
}

impl MessageBuilder {
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        if self.error.is_none()
            && let Err(err) = self.message.set(key, value)
        {
            self.error = Some(err);
        }
        self
    }

    pub fn build(self) -> Result<DynamicMessage> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.message),
        }
    }
}
