//! Association Reflection - metadata describing the shape of a through association

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::Attributes;

/// Macro kind of a single association hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationMacro {
    /// One-to-many hop; the foreign key lives on the related table
    HasMany,
    /// Many-to-one hop; the foreign key lives on the owning side
    BelongsTo,
}

impl AssociationMacro {
    /// Returns true if this hop exposes a collection
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Returns true if the hop's foreign key is stored on the owning record
    pub fn foreign_key_on_owner(self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

/// One hop of a through association: Owner to through model, or through
/// model to target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// Association name (field name on the owning model)
    pub name: String,

    /// The kind of hop
    pub macro_kind: AssociationMacro,

    /// Foreign key column: on the related table for `HasMany` hops, on the
    /// owning record for `BelongsTo` hops
    pub foreign_key: String,

    /// Counter-cache attribute maintained on the owner for this hop's
    /// collection, when configured
    pub counter_cache: Option<String>,

    /// Whether the inverse association already maintains that counter cache
    pub inverse_updates_counter: bool,
}

impl Reflection {
    /// Create a has-many hop
    pub fn has_many(name: &str, foreign_key: &str) -> Self {
        Self {
            name: name.to_string(),
            macro_kind: AssociationMacro::HasMany,
            foreign_key: foreign_key.to_string(),
            counter_cache: None,
            inverse_updates_counter: false,
        }
    }

    /// Create a belongs-to hop
    pub fn belongs_to(name: &str, foreign_key: &str) -> Self {
        Self {
            name: name.to_string(),
            macro_kind: AssociationMacro::BelongsTo,
            foreign_key: foreign_key.to_string(),
            counter_cache: None,
            inverse_updates_counter: false,
        }
    }

    /// Maintain a counter-cache attribute for this hop's collection
    pub fn with_counter_cache(mut self, attribute: &str) -> Self {
        self.counter_cache = Some(attribute.to_string());
        self
    }

    /// Mark the inverse association as the maintainer of the counter cache
    pub fn with_inverse_counter(mut self) -> Self {
        self.inverse_updates_counter = true;
        self
    }

    /// Validate this hop's configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Association hop must have a name".to_string(),
            ));
        }
        if self.foreign_key.is_empty() {
            return Err(ModelError::Configuration(format!(
                "Association '{}' must have a foreign key",
                self.name
            )));
        }
        if let Some(attribute) = &self.counter_cache {
            if attribute.is_empty() {
                return Err(ModelError::Configuration(format!(
                    "Association '{}' has an empty counter-cache attribute",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// The full shape of a has-many-through association: the chained pair of
/// hops plus the owner-side configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughReflection {
    /// Owner to through model
    pub through: Reflection,

    /// Through model to target
    pub source: Reflection,

    /// Declared target model name, checked against candidate records before
    /// any mutation
    pub target_model: String,

    /// Table holding the through rows
    pub join_table: String,

    /// Counter-cache attribute on the owner for the primary association
    pub counter_cache: Option<String>,

    /// Extra conditions scoping which through rows belong to the association
    pub scope_conditions: Attributes,

    /// Maintain created_at/updated_at columns on new through rows
    pub join_timestamps: bool,
}

impl ThroughReflection {
    /// Create a new through reflection
    pub fn new(through: Reflection, source: Reflection, target_model: &str, join_table: &str) -> Self {
        Self {
            through,
            source,
            target_model: target_model.to_string(),
            join_table: join_table.to_string(),
            counter_cache: None,
            scope_conditions: Attributes::new(),
            join_timestamps: false,
        }
    }

    /// Maintain a counter-cache attribute on the owner for this association
    pub fn with_counter_cache(mut self, attribute: &str) -> Self {
        self.counter_cache = Some(attribute.to_string());
        self
    }

    /// Add extra conditions scoping the through rows
    pub fn with_scope(mut self, conditions: Attributes) -> Self {
        self.scope_conditions = conditions;
        self
    }

    /// Enable timestamp columns on new through rows
    pub fn with_join_timestamps(mut self) -> Self {
        self.join_timestamps = true;
        self
    }

    /// Validate the reflection for consistency
    pub fn validate(&self) -> ModelResult<()> {
        self.through.validate()?;
        self.source.validate()?;

        if self.target_model.is_empty() {
            return Err(ModelError::Configuration(
                "Through reflection must declare a target model".to_string(),
            ));
        }
        if self.join_table.is_empty() {
            return Err(ModelError::Configuration(
                "Through reflection must name a join table".to_string(),
            ));
        }
        if self.scope_conditions.contains_key(&self.source.foreign_key) {
            return Err(ModelError::Configuration(format!(
                "Scope conditions must not constrain the source foreign key '{}'",
                self.source.foreign_key
            )));
        }
        if self.counter_cache.is_some() && self.counter_cache == self.through.counter_cache {
            return Err(ModelError::Configuration(format!(
                "Association and through association share the counter-cache attribute '{}'",
                self.counter_cache.as_deref().unwrap_or_default()
            )));
        }
        Ok(())
    }
}
