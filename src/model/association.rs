use std::fmt;
use std::sync::Arc;

use super::EntityType;
use crate::core::{MappingError, Result};

/// A declared to-many association.
#[derive(Clone)]
pub struct Association {
    name: String,
    child: Arc<EntityType>,
}

impl Association {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn child(&self) -> &Arc<EntityType> {
        &self.child
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Association({} -> {})", self.name, self.child.name())
    }
}

impl EntityType {
    /// Declares a to-many association whose records are of type `child`.
    pub fn has_many(&self, name: &str, child: &Arc<EntityType>) -> Result<()> {
        let association = Association {
            name: name.to_string(),
            child: Arc::clone(child),
        };
        self.declare(|configuration| {
            configuration
                .associations
                .insert(name.to_string(), association);
            Ok(())
        })
    }

    /// Lets inbound messages carry entries for an association, transformed
    /// with the child type's engine.
    pub fn accepts_nested_attributes_for(&self, name: &str) -> Result<()> {
        let entity = self.name().to_string();
        self.declare(|configuration| {
            if !configuration.associations.contains_key(name) {
                return Err(MappingError::AssociationNotDeclared {
                    entity,
                    association: name.to_string(),
                });
            }
            if !configuration.nested_attributes.iter().any(|declared| declared == name) {
                configuration.nested_attributes.push_back(name.to_string());
            }
            Ok(())
        })
    }

    pub fn association(&self, name: &str) -> Result<Option<Association>> {
        Ok(self.configuration()?.associations.get(name).cloned())
    }
}
