//! Collaborator Traits - storage and counter seams for through associations

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::model::{Attributes, Record};

/// Storage collaborator for a through association.
///
/// An implementation is scoped to one owner: it fronts the owner's
/// collection of through rows (creation, bulk mutation) and the target read
/// path through the join. Owner foreign-key scoping is the implementation's
/// responsibility; callers pass only target-derived join attributes.
#[async_trait]
pub trait ThroughStorage: Send + Sync {
    /// The target model reachable through the join
    type Target: Record + Clone;

    /// Persist an unpersisted target, assigning its primary key.
    ///
    /// Returns `false` when validation rejects the record; storage failures
    /// are errors. Persisted targets are left untouched.
    async fn save_target(&self, target: &mut Self::Target, validate: bool) -> ModelResult<bool>;

    /// Create exactly one through-row from join attributes. Must error on
    /// failure; silent drops are not acceptable here.
    async fn create(&self, attrs: Attributes) -> ModelResult<()>;

    /// Remove matching through-rows one at a time, returning how many were
    /// removed. This is the row-level removal path.
    async fn destroy_all(&self, filter: Attributes) -> ModelResult<usize>;

    /// Bulk-update matching through-rows, returning how many were updated.
    async fn update_all(&self, filter: Attributes, changes: Attributes) -> ModelResult<usize>;

    /// Bulk-delete matching through-rows, returning how many were deleted.
    async fn delete_all(&self, filter: Attributes) -> ModelResult<usize>;

    /// Read every target currently reachable through the join.
    async fn load_targets(&self) -> ModelResult<Vec<Self::Target>>;

    /// Count reachable targets without materializing them.
    async fn count(&self) -> ModelResult<i64>;
}

/// Counter capability on the owner row.
///
/// The association never writes owner attributes directly; counter-cache
/// changes go through this injected store. `read` is synchronous because
/// implementations front the owner's already-materialized attributes - a
/// cached counter read must not issue a query.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read the current cached value of a counter attribute
    fn read(&self, attribute: &str) -> Option<i64>;

    /// Atomically add `delta` to a counter attribute on the owner row and
    /// persist that single attribute change
    async fn adjust(&self, attribute: &str, delta: i64) -> ModelResult<()>;
}
