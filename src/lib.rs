//! traitstate - Trait-based planner state store
//!
//! This crate re-exports all layers of the traitstate system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: traitstate_manager    - State lifecycle, handles, deferred destruction
//! Layer 1: traitstate_storage    - Schemas, trait tables, snapshots, matching, hashing
//! Layer 0: traitstate_foundation - Core types (ObjectId, Value, Error)
//! ```

pub use traitstate_foundation as foundation;
pub use traitstate_manager as manager;
pub use traitstate_storage as storage;
