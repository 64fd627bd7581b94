use std::sync::Arc;

use crate::core::Value;

/// Enumeration declared by a message schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: String,
    values: Vec<(String, i64)>,
}

impl EnumDescriptor {
    pub fn new<N: Into<String>>(name: impl Into<String>, values: Vec<(N, i64)>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(|(n, tag)| (n.into(), tag)).collect(),
        }
    }

    pub fn values(&self) -> &[(String, i64)] {
        &self.values
    }

    pub fn tag_of(&self, name: &str) -> Option<i64> {
        self.values
            .iter()
            .find(|(value_name, _)| value_name == name)
            .map(|(_, tag)| *tag)
    }

    pub fn name_of(&self, tag: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, value_tag)| *value_tag == tag)
            .map(|(name, _)| name.as_str())
    }

    /// Integer representation of an enum value given either by tag or by name.
    pub fn tag_for(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Integer(tag) => self.name_of(*tag).map(|_| *tag),
            Value::Text(name) => self.tag_of(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Int64,
    Double,
    String,
    Bool,
    Bytes,
    Enum(EnumDescriptor),
    Message(Arc<MessageDescriptor>),
}

impl FieldType {
    pub fn name(&self) -> &str {
        match self {
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::Enum(e) => &e.name,
            Self::Message(m) => &m.name,
        }
    }

    /// Whether a single (non-repeated) value fits this field type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Int64, Value::Integer(_)) => true,
            (Self::Double, Value::Float(_) | Value::Integer(_)) => true,
            (Self::String, Value::Text(_)) => true,
            (Self::Bool, Value::Boolean(_)) => true,
            (Self::Bytes, Value::Bytes(_)) => true,
            (Self::Enum(e), v) => e.tag_for(v).is_some(),
            (Self::Message(descriptor), Value::Message(message)) => {
                message.shared_descriptor().name == descriptor.name
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub field_type: FieldType,
    pub label: Label,
    pub deprecated: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            field_type,
            label: Label::Optional,
            deprecated: false,
        }
    }

    pub fn optional(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self::new(name, number, field_type)
    }

    pub fn required(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self::new(name, number, field_type).with_label(Label::Required)
    }

    pub fn repeated(name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        Self::new(name, number, field_type).with_label(Label::Repeated)
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.field_type, FieldType::Enum(_))
    }

    pub fn enum_descriptor(&self) -> Option<&EnumDescriptor> {
        match &self.field_type {
            FieldType::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match (self.is_repeated(), value) {
            (_, Value::Null) => true,
            (true, Value::Array(items)) => items.iter().all(|item| self.field_type.accepts(item)),
            (true, _) => false,
            (false, v) => self.field_type.accepts(v),
        }
    }
}

/// Schema of a structured message: an ordered list of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    pub fn deprecated_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.deprecated)
            .map(|field| field.name.as_str())
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> EnumDescriptor {
        EnumDescriptor::new("Status", vec![("ACTIVE", 1), ("DISABLED", 2)])
    }

    #[test]
    fn test_enum_tag_lookup() {
        let e = status();
        assert_eq!(e.tag_for(&Value::from("DISABLED")), Some(2));
        assert_eq!(e.tag_for(&Value::Integer(1)), Some(1));
        assert_eq!(e.tag_for(&Value::Integer(9)), None);
        assert_eq!(e.name_of(1), Some("ACTIVE"));
    }

    #[test]
    fn test_repeated_field_accepts_arrays_only() {
        let tags = FieldDescriptor::repeated("tags", 1, FieldType::String);
        assert!(tags.accepts(&Value::from(vec!["a", "b"])));
        assert!(!tags.accepts(&Value::from("a")));
        assert!(!tags.accepts(&Value::from(vec![1i64])));
    }

    #[test]
    fn test_message_field_accepts_matching_descriptor_only() {
        use crate::message::DynamicMessage;

        let post = MessageDescriptor::new(
            "PostMessage",
            vec![FieldDescriptor::optional("title", 1, FieldType::String)],
        )
        .into_shared();
        let other = MessageDescriptor::new("OtherMessage", vec![]).into_shared();
        let field = FieldType::Message(Arc::clone(&post));

        assert!(field.accepts(&Value::from(DynamicMessage::new(post))));
        assert!(!field.accepts(&Value::from(DynamicMessage::new(other))));
        assert!(!field.accepts(&Value::from("title")));
        assert!(field.accepts(&Value::Null));
    }

    #[test]
    fn test_deprecated_fields_listed_in_order() {
        let descriptor = MessageDescriptor::new(
            "User",
            vec![
                FieldDescriptor::optional("guid", 1, FieldType::String),
                FieldDescriptor::optional("email_domain", 2, FieldType::String).deprecated(),
                FieldDescriptor::optional("legacy", 3, FieldType::String).deprecated(),
            ],
        );
        let deprecated: Vec<_> = descriptor.deprecated_fields().collect();
        assert_eq!(deprecated, vec!["email_domain", "legacy"]);
    }
}
