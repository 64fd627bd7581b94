//! Converter registry and default coercions
//!
//! A converter is a one-value function bound to a field (inbound) or a column
//! (outbound). Declarations name their function in one of three ways, see
//! [`Resolvable`]; every form is resolved once at registration against the
//! entity type's method and conversion tables, so request handling only does
//! a map lookup.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use im::OrdMap;
use uuid::Uuid;

use crate::core::{ColumnType, MappingError, Result, Value};
use crate::model::EntityType;

pub type ConvertFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Message field to entity attribute
    Inbound,
    /// Entity attribute to message field
    Outbound,
}

/// `(from, to)` key of the conversion table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversionKey {
    pub from: String,
    pub to: String,
}

impl ConversionKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Conventional method name for this pair, e.g. `convert_base64_to_string`.
    pub fn method_name(&self) -> String {
        format!("convert_{}_to_{}", self.from, self.to)
    }
}

impl fmt::Display for ConversionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// How a converter or parser declaration names its function.
#[derive(Clone)]
pub enum Resolvable {
    Callable(ConvertFn),
    /// Looked up in the conversion table, then as the conventional method name.
    Pair { from: String, to: String },
    /// A defined method; otherwise the source type of a conversion to the
    /// column's declared type.
    Named(String),
}

impl Resolvable {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Callable(Arc::new(f))
    }

    pub fn pair(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Pair {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Debug for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => write!(f, "Callable"),
            Self::Pair { from, to } => write!(f, "Pair({} -> {})", from, to),
            Self::Named(name) => write!(f, "Named({})", name),
        }
    }
}

impl From<&str> for Resolvable {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Resolvable {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<(&str, &str)> for Resolvable {
    fn from((from, to): (&str, &str)) -> Self {
        Self::pair(from, to)
    }
}

impl From<ConvertFn> for Resolvable {
    fn from(f: ConvertFn) -> Self {
        Self::Callable(f)
    }
}

/// Per-type named methods and `(from, to)` conversions that declarations
/// resolve against.
#[derive(Clone)]
pub struct ConverterTable {
    methods: OrdMap<String, ConvertFn>,
    conversions: OrdMap<ConversionKey, ConvertFn>,
}

impl ConverterTable {
    pub fn empty() -> Self {
        Self {
            methods: OrdMap::new(),
            conversions: OrdMap::new(),
        }
    }

    /// Table seeded with epoch and uuid conversions.
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.define_conversion("int64", "date", Arc::new(epoch_to_date));
        for to in ["datetime", "time", "timestamp"] {
            table.define_conversion("int64", to, Arc::new(epoch_to_timestamp));
        }
        for from in ["date", "datetime", "time", "timestamp"] {
            table.define_conversion(from, "int64", Arc::new(to_epoch));
        }
        table.define_conversion("string", "uuid", Arc::new(string_to_uuid));
        table.define_conversion("uuid", "string", Arc::new(uuid_to_string));
        table
    }

    pub fn define_method(&mut self, name: impl Into<String>, f: ConvertFn) {
        self.methods.insert(name.into(), f);
    }

    pub fn define_conversion(&mut self, from: &str, to: &str, f: ConvertFn) {
        self.conversions.insert(ConversionKey::new(from, to), f);
    }

    pub fn method(&self, name: &str) -> Option<ConvertFn> {
        self.methods.get(name).cloned()
    }

    /// Conversion for a pair: the tuple table first, then a method carrying
    /// the conventional name.
    pub fn conversion(&self, key: &ConversionKey) -> Option<ConvertFn> {
        self.conversions
            .get(key)
            .cloned()
            .or_else(|| self.method(&key.method_name()))
    }

    pub fn has_conversion(&self, from: &str, to: &str) -> bool {
        self.conversion(&ConversionKey::new(from, to)).is_some()
    }

    /// Binds a declaration to a function. `column_type` is the declared
    /// type of the column the key maps to, if any.
    pub fn resolve(
        &self,
        key: &str,
        resolvable: Resolvable,
        column_type: Option<&ColumnType>,
    ) -> Result<ConvertFn> {
        match resolvable {
            Resolvable::Callable(f) => Ok(f),
            Resolvable::Pair { from, to } => {
                let pair = ConversionKey::new(from, to);
                self.conversion(&pair).ok_or_else(|| MappingError::ConverterNotCallable {
                    key: key.to_string(),
                    reason: format!("no conversion {} or method '{}'", pair, pair.method_name()),
                })
            }
            Resolvable::Named(name) => {
                if let Some(f) = self.method(&name) {
                    return Ok(f);
                }
                let Some(column_type) = column_type else {
                    return Err(MappingError::ConverterNotCallable {
                        key: key.to_string(),
                        reason: format!("no method '{}' and no column type to convert to", name),
                    });
                };
                let pair = ConversionKey::new(name.as_str(), column_type.as_str());
                self.conversion(&pair).ok_or_else(|| MappingError::ConverterNotCallable {
                    key: key.to_string(),
                    reason: format!("no method '{}' or '{}'", name, pair.method_name()),
                })
            }
        }
    }
}

impl Default for ConverterTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("conversions", &self.conversions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A resolved converter entry.
#[derive(Clone)]
pub struct Converter {
    key: String,
    direction: Direction,
    func: ConvertFn,
}

impl Converter {
    pub fn new(key: impl Into<String>, direction: Direction, func: ConvertFn) -> Self {
        Self {
            key: key.into(),
            direction,
            func,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Null passes through without invoking the function.
    pub fn call(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        (self.func)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Converter({:?} {})", self.direction, self.key)
    }
}

/// Registered converters in both directions.
#[derive(Clone, Default, Debug)]
pub struct ConverterRegistry {
    inbound: OrdMap<String, Converter>,
    outbound: OrdMap<String, Converter>,
}

impl ConverterRegistry {
    /// Replaces any entry under the same key and direction.
    pub fn register(&mut self, converter: Converter) {
        let table = match converter.direction {
            Direction::Inbound => &mut self.inbound,
            Direction::Outbound => &mut self.outbound,
        };
        table.insert(converter.key.clone(), converter);
    }

    pub fn converter_for(&self, direction: Direction, key: &str) -> Option<&Converter> {
        match direction {
            Direction::Inbound => self.inbound.get(key),
            Direction::Outbound => self.outbound.get(key),
        }
    }

    pub fn keys(&self, direction: Direction) -> impl Iterator<Item = &str> {
        let table = match direction {
            Direction::Inbound => &self.inbound,
            Direction::Outbound => &self.outbound,
        };
        table.keys().map(String::as_str)
    }
}

fn epoch_seconds(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(secs) => Ok(*secs),
        Value::Float(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        Value::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| MappingError::Conversion(format!("'{}' is not epoch seconds", text))),
        other => Err(MappingError::Conversion(format!(
            "Cannot read epoch seconds from {}",
            other.type_name()
        ))),
    }
}

fn instant(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| MappingError::Conversion(format!("Epoch {} out of range", secs)))
}

/// Epoch seconds to a UTC calendar date.
pub fn epoch_to_date(value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::Date(_) => Ok(value),
        Value::Timestamp(ts) => Ok(Value::Date(ts.date_naive())),
        other => Ok(Value::Date(instant(epoch_seconds(&other)?)?.date_naive())),
    }
}

/// Epoch seconds to a UTC instant.
pub fn epoch_to_timestamp(value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::Timestamp(_) => Ok(value),
        other => Ok(Value::Timestamp(instant(epoch_seconds(&other)?)?)),
    }
}

/// Instants to epoch seconds; dates map to UTC midnight.
pub fn to_epoch(value: Value) -> Result<Value> {
    match value {
        Value::Null | Value::Integer(_) => Ok(value),
        Value::Timestamp(ts) => Ok(Value::Integer(ts.timestamp())),
        Value::Date(date) => {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
                MappingError::Conversion(format!("No midnight for {}", date))
            })?;
            Ok(Value::Integer(midnight.and_utc().timestamp()))
        }
        other => Ok(Value::Integer(epoch_seconds(&other)?)),
    }
}

pub fn string_to_uuid(value: Value) -> Result<Value> {
    match value {
        Value::Text(text) => Uuid::parse_str(text.trim())
            .map(Value::Uuid)
            .map_err(|e| MappingError::Conversion(format!("Invalid uuid '{}': {}", text, e))),
        Value::Null | Value::Uuid(_) => Ok(value),
        other => Err(MappingError::Conversion(format!(
            "Cannot convert {} to uuid",
            other.type_name()
        ))),
    }
}

pub fn uuid_to_string(value: Value) -> Result<Value> {
    match value {
        Value::Uuid(uuid) => Ok(Value::Text(uuid.to_string())),
        other => Ok(other),
    }
}

/// Default inbound coercion for a column without a registered converter.
pub fn coerce_inbound(column_type: Option<&ColumnType>, value: Value) -> Result<Value> {
    match column_type {
        Some(ColumnType::Date) => epoch_to_date(value),
        Some(ColumnType::DateTime | ColumnType::Time | ColumnType::Timestamp) => {
            epoch_to_timestamp(value)
        }
        _ => Ok(value),
    }
}

/// Inverse of [`coerce_inbound`].
pub fn coerce_outbound(column_type: Option<&ColumnType>, value: Value) -> Result<Value> {
    match column_type {
        Some(column_type) if column_type.is_temporal() => to_epoch(value),
        _ => Ok(value),
    }
}

impl EntityType {
    /// Registers a converter, resolving `resolvable` against this type's
    /// tables now. Fails with `ConverterNotCallable` if nothing binds.
    pub fn register_converter(
        &self,
        direction: Direction,
        key: &str,
        resolvable: impl Into<Resolvable>,
    ) -> Result<()> {
        let resolvable = resolvable.into();
        let column_type = self.column_type(key)?;
        self.declare(|configuration| {
            let func = configuration
                .converter_table
                .resolve(key, resolvable, column_type.as_ref())?;
            configuration
                .converters
                .register(Converter::new(key, direction, func));
            Ok(())
        })
    }

    /// Inbound converter for a message field.
    pub fn convert_field(&self, field: &str, resolvable: impl Into<Resolvable>) -> Result<()> {
        self.register_converter(Direction::Inbound, field, resolvable)
    }

    /// Outbound converter for a column.
    pub fn convert_column(&self, column: &str, resolvable: impl Into<Resolvable>) -> Result<()> {
        self.register_converter(Direction::Outbound, column, resolvable)
    }

    pub fn converter_for(&self, direction: Direction, key: &str) -> Result<Option<Converter>> {
        Ok(self
            .configuration()?
            .converters
            .converter_for(direction, key)
            .cloned())
    }

    pub fn define_method<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration.converter_table.define_method(name, Arc::new(f));
            Ok(())
        })
    }

    pub fn define_conversion<F>(&self, from: &str, to: &str, f: F) -> Result<()>
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.declare(|configuration| {
            configuration
                .converter_table
                .define_conversion(from, to, Arc::new(f));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const NOON_2020_01_02: i64 = 1_577_966_400;
    const MIDNIGHT_2020_01_02: i64 = 1_577_923_200;

    #[test]
    fn test_epoch_to_date_truncates_in_utc() {
        let date = epoch_to_date(Value::Integer(NOON_2020_01_02)).unwrap();
        assert_eq!(date, Value::Date(NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()));
        assert_eq!(to_epoch(date).unwrap(), Value::Integer(MIDNIGHT_2020_01_02));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = coerce_inbound(Some(&ColumnType::DateTime), Value::Integer(NOON_2020_01_02)).unwrap();
        assert!(matches!(ts, Value::Timestamp(_)));
        let back = coerce_outbound(Some(&ColumnType::DateTime), ts).unwrap();
        assert_eq!(back, Value::Integer(NOON_2020_01_02));
    }

    #[test]
    fn test_numeric_text_and_float_epochs() {
        assert_eq!(
            epoch_to_timestamp(Value::from("0")).unwrap(),
            epoch_to_timestamp(Value::Float(0.7)).unwrap()
        );
        assert!(epoch_to_date(Value::from("yesterday")).is_err());
        assert!(epoch_to_date(Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_non_temporal_passes_through() {
        let value = Value::from("abc");
        assert_eq!(coerce_inbound(Some(&ColumnType::Text), value.clone()).unwrap(), value);
        assert_eq!(coerce_inbound(None, value.clone()).unwrap(), value);
        assert_eq!(coerce_outbound(None, value.clone()).unwrap(), value);
    }

    #[test]
    fn test_uuid_conversions() {
        let id = Uuid::new_v4();
        let parsed = string_to_uuid(Value::Text(id.to_string())).unwrap();
        assert_eq!(parsed, Value::Uuid(id));
        assert_eq!(uuid_to_string(parsed).unwrap(), Value::Text(id.to_string()));
        assert!(string_to_uuid(Value::from("nope")).is_err());
    }

    #[test]
    fn test_resolve_callable_and_pair() {
        let mut table = ConverterTable::with_builtins();
        let f = table
            .resolve("x", Resolvable::callable(|v| Ok(v)), None)
            .unwrap();
        assert_eq!(f(Value::Integer(1)).unwrap(), Value::Integer(1));

        table.define_method(
            "convert_base64_to_string",
            Arc::new(|_| Ok(Value::from("decoded"))),
        );
        let f = table.resolve("email", ("base64", "string").into(), None).unwrap();
        assert_eq!(f(Value::from("ZGVjb2RlZA==")).unwrap(), Value::from("decoded"));
    }

    #[test]
    fn test_resolve_named_falls_back_to_column_type() {
        let table = ConverterTable::with_builtins();
        let f = table
            .resolve("born_on", "int64".into(), Some(&ColumnType::Date))
            .unwrap();
        assert!(matches!(f(Value::Integer(0)).unwrap(), Value::Date(_)));

        let err = table.resolve("born_on", "int64".into(), None).err().unwrap();
        assert!(err.is_configuration());

        let err = table
            .resolve("name", "base64".into(), Some(&ColumnType::Text))
            .err()
            .unwrap();
        assert!(matches!(err, MappingError::ConverterNotCallable { .. }));
    }

    #[test]
    fn test_registry_replaces_by_key() {
        let mut registry = ConverterRegistry::default();
        registry.register(Converter::new("a", Direction::Inbound, Arc::new(|_| Ok(Value::Integer(1)))));
        registry.register(Converter::new("a", Direction::Inbound, Arc::new(|_| Ok(Value::Integer(2)))));

        let converter = registry.converter_for(Direction::Inbound, "a").unwrap();
        assert_eq!(converter.call(Value::from("x")).unwrap(), Value::Integer(2));
        assert_eq!(converter.call(Value::Null).unwrap(), Value::Null);
        assert!(registry.converter_for(Direction::Outbound, "a").is_none());
    }
}
