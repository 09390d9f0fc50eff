//! # elif-associations: Has-Many-Through Associations for elif.rs
//!
//! Association layer managing many-to-many collections that are reachable
//! through an intermediate join model: lazy collection loading, join-row
//! mutation (append, delete, nullify, destroy), and counter-cache
//! maintenance on the owning model, including propagation to the through
//! association's own counter.
//!
//! The query builder, model trait, and Postgres adapter follow the elif-orm
//! conventions; the association core itself is storage-agnostic and talks to
//! collaborators through the [`ThroughStorage`] and [`CounterStore`] traits.

pub mod associations;
pub mod database;
pub mod error;
pub mod model;
pub mod query;

// Re-export core traits and types
pub use associations::*;
pub use database::*;
pub use error::*;
pub use model::*;
pub use query::*;
