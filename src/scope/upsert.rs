use tracing::trace;

use super::search::apply_search_field;
use crate::core::{MappingError, Result};
use crate::message::Message;
use crate::model::EntityType;
use crate::storage::Record;

impl EntityType {
    /// Adds a key group to the upsert preference list. Every field must
    /// already be declared with `field_scope`.
    pub fn upsert_key<I, S>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let entity = self.name().to_string();
        self.declare(|configuration| {
            if fields.is_empty() {
                return Err(MappingError::ConfigError(format!(
                    "Upsert key group on '{}' has no fields",
                    entity
                )));
            }
            if let Some(field) = fields
                .iter()
                .find(|field| configuration.search_field(field).is_none())
            {
                return Err(MappingError::UpsertKeyUndeclared {
                    entity,
                    field: field.clone(),
                });
            }
            configuration.upsert_keys.push_back(fields);
            Ok(())
        })
    }

    pub fn upsert_keys(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.configuration()?.upsert_keys.iter().cloned().collect())
    }

    /// The existing record matched by the first key group fully present in
    /// `message`, or a new unsaved record seeded from that group's values.
    pub fn locate(&self, message: &dyn Message) -> Result<Record> {
        let configuration = self.configuration()?;
        let group = configuration
            .upsert_keys
            .iter()
            .find(|group| group.iter().all(|field| message.is_present(field)))
            .ok_or_else(|| MappingError::UpsertNotFound(self.name().to_string()))?;
        trace!(entity = %self.name(), key = ?group, "selected upsert key");

        let mut query = self.base_query();
        for field in group {
            let declared = configuration.search_field(field).ok_or_else(|| {
                MappingError::UpsertKeyUndeclared {
                    entity: self.name().to_string(),
                    field: field.clone(),
                }
            })?;
            query = apply_search_field(self.name(), &configuration, declared, query, message)?;
        }

        match self.store().first(&query)? {
            Some(record) => Ok(record),
            None => Ok(query.new_record()),
        }
    }

    /// `locate`, assign every attribute the whole message carries, save.
    pub fn upsert(&self, message: &dyn Message) -> Result<Record> {
        let mut record = self.locate(message)?;
        self.assign_attributes(&mut record, message)?;
        self.save(&mut record)?;
        Ok(record)
    }
}
