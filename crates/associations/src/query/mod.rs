//! Query Builder - SQL construction for association-scoped reads and writes

pub mod builder;
pub mod sql;
pub mod types;

pub use builder::*;
pub use types::*;
