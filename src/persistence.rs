//! Record lifecycle on top of the inbound engine and the relational store.

use tracing::debug;

use crate::core::Result;
use crate::message::Message;
use crate::model::EntityType;
use crate::storage::{ID_COLUMN, Record};

impl EntityType {
    /// Blank unsaved record of this type.
    pub fn build(&self) -> Record {
        Record::new(self.name(), self.table())
    }

    /// Unsaved record initialized from `message`.
    pub fn new_record(&self, message: &dyn Message) -> Result<Record> {
        let mut record = self.build();
        self.assign_attributes(&mut record, message)?;
        Ok(record)
    }

    /// Applies the inbound attribute map of `message` to `record`.
    pub fn assign_attributes(&self, record: &mut Record, message: &dyn Message) -> Result<()> {
        let attributes = self.attributes_from(message)?;
        record.assign(&attributes);
        Ok(())
    }

    /// Inserts new records, updates persisted ones.
    pub fn save(&self, record: &mut Record) -> Result<()> {
        if record.is_new_record() {
            self.store().insert(record)?;
            debug!(entity = %self.name(), id = ?record.id(), "created record");
        } else {
            self.store().update(record)?;
            debug!(entity = %self.name(), id = ?record.id(), "updated record");
        }
        Ok(())
    }

    pub fn create(&self, message: &dyn Message) -> Result<Record> {
        let mut record = self.new_record(message)?;
        self.save(&mut record)?;
        Ok(record)
    }

    pub fn update(&self, record: &mut Record, message: &dyn Message) -> Result<()> {
        self.assign_attributes(record, message)?;
        self.save(record)
    }

    /// Returns whether a stored row was removed.
    pub fn destroy(&self, record: &mut Record) -> Result<bool> {
        self.store().delete(record)
    }

    /// Record whose row id is `id`.
    pub fn find(&self, id: u64) -> Result<Option<Record>> {
        let query = self
            .base_query()
            .filter(ID_COLUMN, move |record| record.id() == Some(id));
        self.store().first(&query)
    }

    pub fn all(&self) -> Result<Vec<Record>> {
        self.store().select(&self.base_query())
    }
}
