//! Lifecycle management for traitstate snapshots.
//!
//! This crate provides:
//! - [`StateManager`] - Owns every live snapshot and is the sole mutator
//! - [`StateHandle`] - Generational handle that goes stale on destruction
//! - [`StateKey`] - Handle plus content hash, for bucketing by the planner

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod handle;
pub mod manager;

pub use handle::{StateHandle, StateKey};
pub use manager::StateManager;
