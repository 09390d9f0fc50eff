//! Join-Attribute Constructor - derives through-row attributes from target identity
//!
//! Pure functions of reflection metadata plus target primary keys; no
//! storage access happens here.

use chrono::Utc;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{Attributes, Record};

use super::reflection::ThroughReflection;

/// Attributes that create exactly one through-row for a single target:
/// the source foreign key pointing at the target, any scope conditions,
/// and join-row timestamps when the reflection maintains them.
pub fn join_attributes<T: Record>(
    reflection: &ThroughReflection,
    record: &T,
) -> ModelResult<Attributes> {
    let key = record.primary_key().ok_or(ModelError::MissingPrimaryKey)?;

    let mut attrs = reflection.scope_conditions.clone();
    attrs.insert(reflection.source.foreign_key.clone(), key);

    if reflection.join_timestamps {
        let now = Value::String(Utc::now().to_rfc3339());
        attrs.insert("created_at".to_string(), now.clone());
        attrs.insert("updated_at".to_string(), now);
    }

    Ok(attrs)
}

/// A filter matching every through-row for the given targets: the source
/// foreign key against the set of target primary keys, plus scope
/// conditions. Unpersisted targets have no through-rows and are skipped;
/// returns `None` when nothing remains to match.
pub fn join_attributes_filter<T: Record>(
    reflection: &ThroughReflection,
    records: &[T],
) -> Option<Attributes> {
    let keys: Vec<Value> = records.iter().filter_map(|r| r.primary_key()).collect();
    if keys.is_empty() {
        return None;
    }

    let mut attrs = reflection.scope_conditions.clone();
    attrs.insert(reflection.source.foreign_key.clone(), Value::Array(keys));
    Some(attrs)
}
