//! Core identifiers, values, and errors for traitstate.
//!
//! This crate provides:
//! - [`ObjectId`] / [`TraitBasedObjectId`] - Object identity within a planning session
//! - [`ObjectIdAllocator`] - Monotonic id generation
//! - [`TraitType`] - Schema-assigned index of a trait type
//! - [`Value`] / [`Type`] - Trait field values and their declared types
//! - [`Error`] - Error types with a category per failure class

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod types;
pub mod value;

pub use error::{Error, ErrorCategory, ErrorKind, Result};
pub use id::{ObjectId, ObjectIdAllocator, TraitBasedObjectId};
pub use types::{TraitType, Type};
pub use value::Value;
