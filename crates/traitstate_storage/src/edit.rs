//! Queued structural edits.
//!
//! An action-application layer describes what a planning action does as a
//! list of edits. Edits address objects by [`ObjectId`] because slot indices
//! shift whenever an earlier edit removes something.

use std::sync::Arc;

use traitstate_foundation::{ObjectId, TraitBasedObjectId, TraitType, Value};

use crate::table::TraitRecord;

/// One structural change to a state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateEdit {
    /// Add an object with default-initialised records for `traits`.
    ///
    /// A `NONE` id asks the state to allocate one. Later edits in the same
    /// batch cannot address such an object; allocate the id up front if
    /// they need to.
    AddObject {
        /// Identity of the new object.
        id: TraitBasedObjectId,
        /// Traits to attach.
        traits: Vec<TraitType>,
    },

    /// Remove an object and all its traits. No-op if absent.
    RemoveObject {
        /// Object to remove.
        id: ObjectId,
    },

    /// Attach or overwrite a whole trait record.
    SetTrait {
        /// Target object.
        id: ObjectId,
        /// Trait to set.
        trait_type: TraitType,
        /// New field values.
        record: TraitRecord,
    },

    /// Detach a trait. No-op if the object lacks it.
    RemoveTrait {
        /// Target object.
        id: ObjectId,
        /// Trait to remove.
        trait_type: TraitType,
    },

    /// Overwrite one field, attaching the trait first if needed.
    SetField {
        /// Target object.
        id: ObjectId,
        /// Trait holding the field.
        trait_type: TraitType,
        /// Field name.
        field: Arc<str>,
        /// New value.
        value: Value,
    },
}

impl StateEdit {
    /// Builds an [`AddObject`](Self::AddObject) edit.
    #[must_use]
    pub fn add_object(id: impl Into<TraitBasedObjectId>, traits: &[TraitType]) -> Self {
        Self::AddObject {
            id: id.into(),
            traits: traits.to_vec(),
        }
    }

    /// Builds a [`SetField`](Self::SetField) edit.
    #[must_use]
    pub fn set_field(
        id: ObjectId,
        trait_type: TraitType,
        field: impl Into<Arc<str>>,
        value: impl Into<Value>,
    ) -> Self {
        Self::SetField {
            id,
            trait_type,
            field: field.into(),
            value: value.into(),
        }
    }

    /// The object this edit targets, or `NONE` for an allocating add.
    #[must_use]
    pub fn target(&self) -> ObjectId {
        match self {
            Self::AddObject { id, .. } => id.id,
            Self::RemoveObject { id }
            | Self::SetTrait { id, .. }
            | Self::RemoveTrait { id, .. }
            | Self::SetField { id, .. } => *id,
        }
    }
}
