//! HasManyThrough Association - collection loading and mutation through a join model

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{is_blank, Attributes, Record};

use super::join_attributes::{join_attributes, join_attributes_filter};
use super::reflection::{AssociationMacro, ThroughReflection};
use super::traits::{CounterStore, ThroughStorage};

/// How through-rows are removed from the association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalMethod {
    /// Remove each matching through-row individually (row-level path)
    Destroy,
    /// Keep the through-rows but clear their target foreign key
    Nullify,
    /// Bulk-delete the matching through-rows
    #[default]
    Delete,
}

/// A has-many-through association held by one owner record.
///
/// Targets are reached via through-rows in a join table; membership changes
/// are persisted as through-row mutations, and counter caches on the owner
/// are kept in sync. The in-memory target collection is loaded lazily and
/// cached until [`reset`](HasManyThrough::reset).
///
/// Operations run to completion one at a time; a failure partway through a
/// batch leaves earlier records committed. Rollback, when wanted, belongs to
/// the surrounding transaction.
pub struct HasManyThrough<O, S>
where
    O: Record,
    S: ThroughStorage,
{
    owner: O,
    reflection: ThroughReflection,
    storage: S,
    counters: Box<dyn CounterStore>,
    target: Vec<S::Target>,
    loaded: bool,
}

impl<O, S> HasManyThrough<O, S>
where
    O: Record,
    S: ThroughStorage,
{
    /// Create the association for an owner, validating the reflection
    pub fn new(
        owner: O,
        reflection: ThroughReflection,
        storage: S,
        counters: Box<dyn CounterStore>,
    ) -> ModelResult<Self> {
        reflection.validate()?;
        Ok(Self {
            owner,
            reflection,
            storage,
            counters,
            target: Vec::new(),
            loaded: false,
        })
    }

    /// The owning record
    pub fn owner(&self) -> &O {
        &self.owner
    }

    /// The association's reflection metadata
    pub fn reflection(&self) -> &ThroughReflection {
        &self.reflection
    }

    /// Whether the in-memory collection has been loaded
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// The cached target collection (empty until loaded or staged)
    pub fn get(&self) -> &[S::Target] {
        &self.target
    }

    /// Number of records in the cached collection
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// First record of the cached collection
    pub fn first(&self) -> Option<&S::Target> {
        self.target.first()
    }

    /// Iterate over the cached collection
    pub fn iter(&self) -> std::slice::Iter<'_, S::Target> {
        self.target.iter()
    }

    /// Clear the cached collection and loading state
    pub fn reset(&mut self) {
        self.target.clear();
        self.loaded = false;
    }

    /// Size of the association.
    ///
    /// Reads the owner's counter cache when one is configured (no query),
    /// falls back to the cached collection when loaded, and otherwise counts
    /// through the join without materializing targets.
    pub async fn size(&self) -> ModelResult<i64> {
        if let Some(attribute) = self.reflection.counter_cache.as_deref() {
            return Ok(self.counters.read(attribute).unwrap_or(0));
        }
        if self.loaded {
            return Ok(self.target.len() as i64);
        }
        self.storage.count().await
    }

    /// Whether the association has no members
    pub async fn is_empty(&self) -> ModelResult<bool> {
        Ok(self.size().await? == 0)
    }

    /// Load the target collection, returning the cached sequence when it is
    /// already loaded.
    pub async fn load(&mut self) -> ModelResult<&[S::Target]> {
        if !self.loaded {
            self.target = self.find_target().await?;
            self.loaded = true;
        }
        Ok(&self.target)
    }

    /// Whether the association can possibly have members.
    ///
    /// False exactly when the through hop is a belongs-to relation and the
    /// owner's through foreign key is blank: the join condition could never
    /// match, so no query is worth issuing.
    pub fn possibly_has_targets(&self) -> bool {
        if self.reflection.through.macro_kind == AssociationMacro::BelongsTo {
            let key = self.owner.read_attribute(&self.reflection.through.foreign_key);
            return !is_blank(key.as_ref());
        }
        true
    }

    async fn find_target(&self) -> ModelResult<Vec<S::Target>> {
        // An unsaved owner cannot have through-rows yet.
        if self.owner.is_new_record() || !self.possibly_has_targets() {
            return Ok(Vec::new());
        }
        self.storage.load_targets().await
    }

    /// Append records to the association.
    ///
    /// For a persisted owner each record is processed in call order: type
    /// check, save when unpersisted (a rejected save fails the whole call
    /// with a validation error; earlier records stay committed), then
    /// through-row creation and a counter increment. For an unsaved owner
    /// the records are only staged in the in-memory collection - through
    /// rows cannot exist until the owner has a durable identity.
    pub async fn append(&mut self, records: Vec<S::Target>) -> ModelResult<Vec<S::Target>> {
        if self.owner.is_new_record() {
            self.load().await?;
            self.target.extend(records.iter().cloned());
            return Ok(records);
        }

        self.ensure_target_type()?;

        let total = records.len();
        let mut appended = Vec::with_capacity(total);
        for mut record in records {
            if record.is_new_record() && !self.storage.save_target(&mut record, true).await? {
                tracing::warn!(
                    "append to '{}' aborted at record {} of {}: validation failed ({} committed)",
                    self.reflection.source.name,
                    appended.len() + 1,
                    total,
                    appended.len()
                );
                return Err(ModelError::Validation(format!(
                    "failed to save new {} record during append",
                    self.reflection.target_model
                )));
            }
            if let Some(record) = self.insert_record(record, true).await? {
                appended.push(record);
            }
        }
        Ok(appended)
    }

    /// Link one persisted record into the association.
    ///
    /// An unpersisted record is first saved with the given validation flag;
    /// when that save is rejected the insert is a silent no-op and `None` is
    /// returned. Otherwise exactly one through-row is created and the
    /// primary counter cache incremented.
    pub async fn insert_record(
        &mut self,
        mut record: S::Target,
        validate: bool,
    ) -> ModelResult<Option<S::Target>> {
        if record.is_new_record() && !self.storage.save_target(&mut record, validate).await? {
            return Ok(None);
        }
        if record.is_new_record() {
            // The save reported success without assigning identity; there is
            // nothing to link against.
            return Ok(None);
        }

        let attrs = join_attributes(&self.reflection, &record)?;
        self.storage.create(attrs).await?;
        self.update_counter(1, self.reflection.counter_cache.as_deref())
            .await?;

        if self.loaded {
            self.target.push(record.clone());
        }
        Ok(Some(record))
    }

    /// Instantiate an unsaved target from attributes and stage it in the
    /// in-memory collection. Nothing is persisted.
    pub fn build(&mut self, attrs: Attributes) -> ModelResult<S::Target> {
        self.ensure_target_type()?;
        let record = S::Target::from_attributes(attrs)?;
        self.target.push(record.clone());
        Ok(record)
    }

    /// Instantiate, save, and link a target, returning the persisted record.
    pub async fn create(&mut self, attrs: Attributes) -> ModelResult<S::Target> {
        if self.owner.is_new_record() {
            return Err(ModelError::Validation(
                "cannot create a through record for an unsaved owner".to_string(),
            ));
        }
        self.ensure_target_type()?;

        let mut record = S::Target::from_attributes(attrs)?;
        if !self.storage.save_target(&mut record, true).await? {
            return Err(ModelError::Validation(format!(
                "failed to save new {} record",
                self.reflection.target_model
            )));
        }
        self.insert_record(record, true).await?.ok_or_else(|| {
            ModelError::Validation(format!(
                "new {} record was not persisted",
                self.reflection.target_model
            ))
        })
    }

    /// Remove the given records' through-rows using `method`, returning how
    /// many rows were affected.
    ///
    /// The primary counter cache is always decremented by the affected row
    /// count. The through association's own counter is decremented only for
    /// methods that actually remove rows, and never twice for the same
    /// removal (see [`update_through_counter`](Self::update_through_counter)).
    pub async fn remove(
        &mut self,
        records: &[S::Target],
        method: RemovalMethod,
    ) -> ModelResult<usize> {
        let Some(filter) = join_attributes_filter(&self.reflection, records) else {
            return Ok(0);
        };

        let count = match method {
            RemovalMethod::Destroy => self.storage.destroy_all(filter).await?,
            RemovalMethod::Nullify => {
                let mut changes = Attributes::new();
                changes.insert(self.reflection.source.foreign_key.clone(), Value::Null);
                self.storage.update_all(filter, changes).await?
            }
            RemovalMethod::Delete => self.storage.delete_all(filter).await?,
        };

        let delta = -(count as i64);
        if self.reflection.through.macro_kind == AssociationMacro::HasMany
            && self.update_through_counter(method)
        {
            self.update_counter(delta, self.reflection.through.counter_cache.as_deref())
                .await?;
        }
        self.update_counter(delta, self.reflection.counter_cache.as_deref())
            .await?;

        if self.loaded {
            let removed: Vec<Value> = records.iter().filter_map(|r| r.primary_key()).collect();
            self.target
                .retain(|t| t.primary_key().map_or(true, |key| !removed.contains(&key)));
        }

        tracing::debug!(
            "removed {} through rows from '{}' via {:?}",
            count,
            self.reflection.through.name,
            method
        );
        Ok(count)
    }

    /// Whether removal with `method` should also decrement the through
    /// association's own counter cache.
    fn update_through_counter(&self, method: RemovalMethod) -> bool {
        match method {
            // Skip when the inverse association already counts the removal;
            // the through counter must not be decremented twice.
            RemovalMethod::Destroy => !self.reflection.through.inverse_updates_counter,
            RemovalMethod::Nullify => false,
            RemovalMethod::Delete => true,
        }
    }

    async fn update_counter(&self, delta: i64, attribute: Option<&str>) -> ModelResult<()> {
        let Some(attribute) = attribute else {
            return Ok(());
        };
        if delta == 0 {
            return Ok(());
        }
        self.counters.adjust(attribute, delta).await
    }

    fn ensure_target_type(&self) -> ModelResult<()> {
        let actual = <S::Target as Record>::model_name();
        if self.reflection.target_model != actual {
            return Err(ModelError::TypeMismatch {
                expected: self.reflection.target_model.clone(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

impl<'a, O, S> IntoIterator for &'a HasManyThrough<O, S>
where
    O: Record,
    S: ThroughStorage,
{
    type Item = &'a S::Target;
    type IntoIter = std::slice::Iter<'a, S::Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.target.iter()
    }
}
