use tracing::trace;

use super::{Attributes, NestedAttributes};
use crate::core::{MappingError, Result, Value};
use crate::message::Message;
use crate::model::Configuration;

/// Transforms the nested association messages an inbound message carries.
/// Each declared association is read from `<name><suffix>`, falling back to
/// `<name>`, and every entry goes through the child type's inbound engine.
pub(crate) fn nested_attributes_from(
    configuration: &Configuration,
    message: &dyn Message,
) -> Result<Vec<(String, NestedAttributes)>> {
    let mut nested = Vec::new();

    for name in configuration.nested_attributes.iter() {
        let Some(association) = configuration.associations.get(name) else {
            continue;
        };

        let suffixed = configuration.config.nested_field_for(name);
        let Some(field) = [suffixed.as_str(), name.as_str()]
            .into_iter()
            .find(|field| message.has_field(field))
        else {
            continue;
        };

        let entries: &[Value] = match message.get(field) {
            Some(Value::Array(items)) => items,
            Some(single @ Value::Message(_)) => std::slice::from_ref(single),
            _ => continue,
        };

        let child = association.child();
        let items = entries
            .iter()
            .map(|entry| match entry {
                Value::Message(nested_message) => child.attributes_from(&**nested_message),
                other => Err(MappingError::TypeMismatch(format!(
                    "Nested entry for '{}' must be a message, got {}",
                    name,
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<Attributes>>>()?;

        trace!(association = %name, field, entries = items.len(), "nested attributes");
        nested.push((
            name.clone(),
            NestedAttributes::new(child.name(), child.table(), items),
        ));
    }

    Ok(nested)
}
