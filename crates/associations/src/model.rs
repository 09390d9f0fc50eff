//! Record trait - the entity interface consumed by associations
//!
//! Defines what the association layer needs to know about a model instance:
//! table metadata, primary key identity, persistence state, and attribute
//! access as `serde_json::Value` maps.

use std::collections::HashMap;
use std::fmt::Debug;

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelResult;

/// Attribute name to value mapping used for join-row construction, filters,
/// and record instantiation.
pub type Attributes = HashMap<String, Value>;

/// Entity interface for models that participate in associations.
///
/// Attribute values travel as `serde_json::Value` so that join attributes,
/// filters, and counter columns stay uniform across key types (integer,
/// uuid-as-string, composite-free).
pub trait Record: Debug + Send + Sync + Serialize + for<'de> serde::Deserialize<'de> {
    /// Model name used for runtime type checks against association metadata
    fn model_name() -> &'static str
    where
        Self: Sized;

    /// Table name for this model
    fn table_name() -> &'static str
    where
        Self: Sized;

    /// Primary key column name
    fn primary_key_name() -> &'static str
    where
        Self: Sized,
    {
        "id"
    }

    /// Get the primary key value, if the record has been assigned one
    fn primary_key(&self) -> Option<Value>;

    /// Whether this record has not yet been persisted
    fn is_new_record(&self) -> bool {
        self.primary_key().is_none()
    }

    /// Read a single attribute by name
    fn read_attribute(&self, name: &str) -> Option<Value>
    where
        Self: Sized,
    {
        self.to_attributes().remove(name)
    }

    /// Convert the record to attribute-value pairs
    fn to_attributes(&self) -> Attributes
    where
        Self: Sized,
    {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Attributes::new(),
        }
    }

    /// Instantiate a record from attribute-value pairs
    fn from_attributes(attrs: Attributes) -> ModelResult<Self>
    where
        Self: Sized,
    {
        let map: serde_json::Map<String, Value> = attrs.into_iter().collect();
        serde_json::from_value(Value::Object(map)).map_err(Into::into)
    }

    /// Create a record from a database row
    fn from_row(row: &sqlx::postgres::PgRow) -> ModelResult<Self>
    where
        Self: Sized;
}

/// Whether an attribute value counts as absent for foreign-key checks.
///
/// Missing attributes, explicit NULLs, and empty/whitespace strings are all
/// blank; everything else (including 0 and false) is present.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
