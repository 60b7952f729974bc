//! Trait-based state snapshots for the traitstate planner store.
//!
//! This crate provides:
//! - [`Schema`] - The validated set of trait types and their fields
//! - [`TraitBasedObject`] - Per-object trait slot descriptors and [`TraitFilter`]s
//! - [`TraitTable`] - Dense, swap-remove-compacting record storage per trait
//! - [`StateData`] - One planning state with object and trait operations
//! - [`ObjectCorrespondence`] - The bijection found by structural matching
//! - [`StateEdit`] - Queued structural edits
//! - [`TraitData`] - Typed access to trait records

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod correspondence;
pub mod edit;
mod matching;
pub mod object;
pub mod schema;
pub mod state;
pub mod table;
pub mod typed;

pub use config::StoreConfig;
pub use correspondence::ObjectCorrespondence;
pub use edit::StateEdit;
pub use object::{Access, MAX_SLOTS, Slot, TraitBasedObject, TraitFilter, UNSET};
pub use schema::{FieldSchema, MAX_TRAIT_TYPES, Schema, SchemaBuilder, TraitSchema};
pub use state::StateData;
pub use table::{Removed, TraitRecord, TraitTable};
pub use typed::{FromValue, TraitData, field};
