//! Trait records and densely packed trait tables.
//!
//! Each trait type owns one [`TraitTable`]. Records are addressed by slot
//! index and removal swaps the last record into the hole, so a removal moves
//! at most one other record. The caller is told which slot moved and is
//! responsible for retargeting whichever object pointed at it.

use traitstate_foundation::{Error, Result, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Field values of one trait attached to one object, in schema field order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitRecord {
    values: Vec<Value>,
}

impl TraitRecord {
    /// Creates a record from its field values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true for a tag trait with no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a field value by position.
    #[must_use]
    pub fn get(&self, field: usize) -> Option<&Value> {
        self.values.get(field)
    }

    /// Replaces a field value by position.
    ///
    /// Type checking is the caller's job; see
    /// [`TraitSchema::validate_value`](crate::TraitSchema::validate_value).
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the position is past the record.
    pub fn set(&mut self, field: usize, value: Value) -> Result<()> {
        let len = self.values.len();
        let slot = self.values.get_mut(field).ok_or_else(|| {
            Error::invariant(format!("field position {field} out of range ({len} fields)"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Returns all field values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for TraitRecord {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Outcome of a swap-remove on a [`TraitTable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Removed {
    /// The record that was removed.
    pub record: TraitRecord,
    /// Slot the former last record lived at before it was moved into the
    /// freed slot, or `None` if the removed record was the last one.
    pub moved_from: Option<usize>,
}

/// Dense, homogeneous storage for every record of one trait type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitTable {
    records: Vec<TraitRecord>,
}

impl TraitTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record and returns its slot.
    pub fn push(&mut self, record: TraitRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Returns the record at a slot.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&TraitRecord> {
        self.records.get(slot)
    }

    /// Returns the record at a slot mutably.
    #[must_use]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut TraitRecord> {
        self.records.get_mut(slot)
    }

    /// Removes the record at `slot` by moving the last record into its place.
    ///
    /// Returns `None` if the slot is out of range.
    pub fn swap_remove(&mut self, slot: usize) -> Option<Removed> {
        if slot >= self.records.len() {
            return None;
        }
        let last = self.records.len() - 1;
        let record = self.records.swap_remove(slot);
        Some(Removed {
            record,
            moved_from: (slot != last).then_some(last),
        })
    }

    /// Iterates records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TraitRecord> {
        self.records.iter()
    }
}
