//! Error types for traitstate.
//!
//! Uses `thiserror` for the error definitions. Expected absence (looking up
//! an id that is not in a state, removing a trait that is not there) is never
//! an error; it is reported through `Option` or `bool` by the store.

use thiserror::Error;

use crate::id::ObjectId;
use crate::types::{TraitType, Type};

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for store operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional note about the operation that failed.
    pub context: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Returns the failure class of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Creates an unknown trait name error.
    #[must_use]
    pub fn unknown_trait(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownTrait(name.into()))
    }

    /// Creates an unknown trait type error.
    #[must_use]
    pub fn unknown_trait_type(trait_type: TraitType) -> Self {
        Self::new(ErrorKind::UnknownTraitType(trait_type))
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(trait_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownField {
            trait_name: trait_name.into(),
            field: field.into(),
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: Type, actual: Type) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates an invalid schema error.
    #[must_use]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSchema(message.into()))
    }

    /// Creates an object index out of range error.
    #[must_use]
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::new(ErrorKind::ObjectIndexOutOfRange { index, len })
    }

    /// Creates an unknown object error.
    #[must_use]
    pub fn unknown_object(id: ObjectId) -> Self {
        Self::new(ErrorKind::UnknownObject(id))
    }

    /// Creates an invariant violation error.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvariantViolation(message.into()))
    }

    /// Creates a stale handle error.
    #[must_use]
    pub fn stale_handle(handle: impl Into<String>) -> Self {
        Self::new(ErrorKind::StaleHandle(handle.into()))
    }

    /// Creates a busy state error.
    #[must_use]
    pub fn state_busy(handle: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateBusy(handle.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// No trait with this name in the schema.
    #[error("unknown trait: {0}")]
    UnknownTrait(String),

    /// Trait type index does not belong to the schema.
    #[error("incorrect trait type used in object query: {0:?}")]
    UnknownTraitType(TraitType),

    /// No field with this name on the trait.
    #[error("field \"{field}\" does not exist on trait {trait_name}")]
    UnknownField {
        /// The trait that was queried.
        trait_name: String,
        /// The field name that was not found.
        field: String,
    },

    /// Value type does not match the declared field type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The declared type.
        expected: Type,
        /// The type of the supplied value.
        actual: Type,
    },

    /// Record arity does not match the trait schema.
    #[error("trait {trait_name} has {expected} fields, record has {actual}")]
    FieldCount {
        /// The trait the record was checked against.
        trait_name: String,
        /// Number of fields in the schema.
        expected: usize,
        /// Number of values in the record.
        actual: usize,
    },

    /// Schema failed validation at construction.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Object slot index past the end of the object sequence.
    #[error("object index out of bounds: {index} (length {len})")]
    ObjectIndexOutOfRange {
        /// The index that was accessed.
        index: usize,
        /// Number of objects in the state.
        len: usize,
    },

    /// No object with this id in the state.
    #[error("no object with id {0}")]
    UnknownObject(ObjectId),

    /// An object with this id is already present.
    #[error("duplicate object id: {0:?}")]
    DuplicateObject(ObjectId),

    /// The `NONE` sentinel was used as an object identity.
    #[error("ObjectId::NONE cannot name an object")]
    NullObjectId,

    /// A trait table reached the largest addressable slot.
    #[error("trait table for {trait_name} is full ({limit} records)")]
    CapacityExceeded {
        /// The trait whose table is full.
        trait_name: String,
        /// The maximum number of records.
        limit: usize,
    },

    /// Internal consistency of a state is broken.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Handle refers to a destroyed or never-created state.
    #[error("stale state handle: {0}")]
    StaleHandle(String),

    /// State is leased to a reader and cannot be mutated.
    #[error("state is leased and cannot be mutated: {0}")]
    StateBusy(String),
}

impl ErrorKind {
    /// Maps this kind onto its failure class.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTrait(_)
            | Self::UnknownTraitType(_)
            | Self::UnknownField { .. }
            | Self::TypeMismatch { .. }
            | Self::FieldCount { .. }
            | Self::InvalidSchema(_) => ErrorCategory::Schema,
            Self::ObjectIndexOutOfRange { .. } | Self::UnknownObject(_) | Self::StaleHandle(_) => {
                ErrorCategory::NotFound
            }
            Self::DuplicateObject(_) | Self::NullObjectId | Self::InvariantViolation(_) => {
                ErrorCategory::InvariantViolation
            }
            Self::CapacityExceeded { .. } => ErrorCategory::ResourceExhaustion,
            Self::StateBusy(_) => ErrorCategory::Busy,
        }
    }
}

/// Failure classes, from configuration mistakes to runtime contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Schema mismatch: unknown trait, field, or wrong value type. Not retried.
    Schema,
    /// The addressed object or state does not exist.
    NotFound,
    /// The state is internally inconsistent or would become so.
    InvariantViolation,
    /// A fixed-size resource ran out.
    ResourceExhaustion,
    /// The state is in use by a reader.
    Busy,
}
