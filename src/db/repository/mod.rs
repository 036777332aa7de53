//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`; callers own locking.

mod contact;
mod report;

pub use contact::*;
pub use report::*;
