//! Inbound engine: message fields to entity attributes.

use im::OrdSet;

use super::convert::{Direction, coerce_inbound};
use super::nested::nested_attributes_from;
use super::nullify::NullifyList;
use super::Attributes;
use crate::core::{Result, Value};
use crate::message::Message;
use crate::model::{ColumnMap, Configuration, EntityType};

/// Keys considered for one inbound pass: columns in column order that are
/// assignable or carry a transformer, then transformer keys that are not
/// columns. Protection never hides a transformer.
fn eligible_keys(configuration: &Configuration, columns: &ColumnMap) -> Vec<String> {
    let mut keys: Vec<String> = columns
        .names()
        .filter(|name| {
            configuration.is_assignable(name)
                || configuration.attribute_transformers.contains_key(*name)
        })
        .map(str::to_string)
        .collect();

    for key in configuration.attribute_transformers.keys() {
        if !columns.contains(key) {
            keys.push(key.clone());
        }
    }
    keys
}

/// The message field an attribute reads from: an alias first, then the
/// same-named field. Absent and repeated fields do not count.
fn source_field<'a>(
    configuration: &'a Configuration,
    message: &dyn Message,
    attribute: &'a str,
) -> Option<&'a str> {
    let aliases = configuration
        .aliases
        .iter()
        .filter(|(_, target)| target.as_str() == attribute)
        .map(|(alias, _)| alias.as_str());

    aliases
        .chain(std::iter::once(attribute))
        .find(|field| message.has_field(field) && !message.is_repeated(field))
}

impl EntityType {
    /// Attribute map for `message`.
    ///
    /// Transformers win over converters, converters over the default
    /// temporal coercion. Names in the nullify list always end up null.
    pub fn attributes_from(&self, message: &dyn Message) -> Result<Attributes> {
        let configuration = self.configuration()?;
        let columns = self.columns()?;
        let nullify = NullifyList::from_message(message, &configuration.config);
        let mut attributes = Attributes::new();

        for key in eligible_keys(&configuration, &columns) {
            if let Some(transformer) = configuration.attribute_transformers.get(&key) {
                if transformer.is_nullified(&nullify) {
                    attributes.insert(key, Value::Null);
                    continue;
                }
                let value = transformer.call(message)?;
                if !value.is_null() || nullify.contains(&key) {
                    attributes.insert(key, value);
                }
                continue;
            }

            let Some(field) = source_field(&configuration, message, &key) else {
                continue;
            };
            let raw = message.get(field).cloned().unwrap_or(Value::Null);

            let converter = configuration
                .converters
                .converter_for(Direction::Inbound, &key)
                .or_else(|| configuration.converters.converter_for(Direction::Inbound, field));
            let value = match converter {
                Some(converter) => converter.call(raw)?,
                None => coerce_inbound(columns.column_type(&key), raw)?,
            };
            attributes.insert(key, value);
        }

        for (association, nested) in nested_attributes_from(&configuration, message)? {
            attributes.insert_nested(association, nested);
        }

        for name in nullify.names() {
            if columns.contains(name) {
                attributes.insert(name, Value::Null);
            }
        }

        Ok(attributes)
    }

    /// Excludes attributes from inbound assignment.
    pub fn protect_attributes<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.declare(|configuration| {
            configuration.protected.extend(names);
            Ok(())
        })
    }

    /// Restricts inbound assignment to the listed attributes. Takes
    /// precedence over protected attributes.
    pub fn accessible_attributes<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: OrdSet<String> = names.into_iter().map(Into::into).collect();
        self.declare(|configuration| {
            let accessible = configuration.accessible.get_or_insert_with(OrdSet::new);
            accessible.extend(names);
            Ok(())
        })
    }
}
