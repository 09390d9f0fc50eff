//! Associations Module - has-many-through collections with counter caches

pub mod has_many_through;
pub mod join_attributes;
pub mod postgres;
pub mod reflection;
pub mod traits;


// Re-export main types
pub use has_many_through::*;
pub use join_attributes::*;
pub use postgres::*;
pub use reflection::*;
pub use traits::*;
