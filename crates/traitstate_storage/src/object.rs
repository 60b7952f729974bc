//! Per-object trait slot descriptors and trait-presence filters.
//!
//! A [`TraitBasedObject`] records, for each trait type in the schema, where
//! this object's record sits in that trait's table, or [`UNSET`]. It is a
//! small `Copy` value: callers read it, change the copy, and write it back.

use std::fmt;

use traitstate_foundation::{Error, Result, TraitType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::schema::MAX_TRAIT_TYPES;

/// Index of a record within a trait table.
pub type Slot = u16;

/// Marks a trait the object does not have.
pub const UNSET: Slot = Slot::MAX;

/// Largest number of records a single trait table can address.
pub const MAX_SLOTS: usize = UNSET as usize;

/// Fixed-size vector of trait slots describing one object.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitBasedObject {
    slots: [Slot; MAX_TRAIT_TYPES],
    len: u8,
}

impl TraitBasedObject {
    /// Creates a descriptor with every slot unset.
    ///
    /// `trait_count` is the number of trait types in the schema and is
    /// clamped to [`MAX_TRAIT_TYPES`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(trait_count: usize) -> Self {
        Self {
            slots: [UNSET; MAX_TRAIT_TYPES],
            len: trait_count.min(MAX_TRAIT_TYPES) as u8,
        }
    }

    /// Number of trait types this descriptor covers.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Returns true if the descriptor covers no trait types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the table index for a trait, or `None` if unset or unknown.
    #[must_use]
    pub fn get(&self, trait_type: TraitType) -> Option<usize> {
        match self.raw(trait_type) {
            UNSET => None,
            slot => Some(usize::from(slot)),
        }
    }

    /// Returns the raw slot value, [`UNSET`] for absent or unknown traits.
    #[must_use]
    pub fn raw(&self, trait_type: TraitType) -> Slot {
        if trait_type.index() < self.len() {
            self.slots[trait_type.index()]
        } else {
            UNSET
        }
    }

    /// Points a trait slot at a table index.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the trait is outside this descriptor,
    /// or an invariant violation if `index` is not addressable.
    pub fn set(&mut self, trait_type: TraitType, index: usize) -> Result<()> {
        self.check(trait_type)?;
        let slot = Slot::try_from(index)
            .ok()
            .filter(|slot| *slot != UNSET)
            .ok_or_else(|| Error::invariant(format!("slot index {index} is not addressable")))?;
        self.slots[trait_type.index()] = slot;
        Ok(())
    }

    /// Marks a trait as absent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the trait is outside this descriptor.
    pub fn clear(&mut self, trait_type: TraitType) -> Result<()> {
        self.check(trait_type)?;
        self.slots[trait_type.index()] = UNSET;
        Ok(())
    }

    /// Returns true if the object has this trait.
    #[must_use]
    pub fn has(&self, trait_type: TraitType) -> bool {
        self.get(trait_type).is_some()
    }

    /// Iterates the trait types this object has, in schema order.
    pub fn trait_types(&self) -> impl Iterator<Item = TraitType> + '_ {
        self.slots[..self.len()]
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot != UNSET)
            .map(|(i, _)| Self::trait_type_at(i))
    }

    /// Number of traits set on this object.
    #[must_use]
    pub fn trait_count(&self) -> usize {
        self.slots[..self.len()]
            .iter()
            .filter(|slot| **slot != UNSET)
            .count()
    }

    /// Returns true if both objects have exactly the same trait types set.
    #[must_use]
    pub fn has_same_traits(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .slots
                .iter()
                .zip(other.slots.iter())
                .all(|(a, b)| (*a == UNSET) == (*b == UNSET))
    }

    /// Returns true if every trait set in `subset` is also set here.
    #[must_use]
    pub fn has_trait_subset(&self, subset: &Self) -> bool {
        subset
            .slots
            .iter()
            .zip(self.slots.iter())
            .all(|(required, own)| *required == UNSET || *own != UNSET)
    }

    /// Checks this object against a trait-presence filter.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the filter names a trait outside this
    /// descriptor; a filter built against another schema is a bug, not a
    /// non-match.
    pub fn matches_filter(&self, filter: &TraitFilter) -> Result<bool> {
        for (trait_type, access) in filter.iter() {
            self.check(trait_type)?;
            let present = self.has(trait_type);
            let wanted = access == Access::Include;
            if present != wanted {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check(&self, trait_type: TraitType) -> Result<()> {
        if trait_type.index() < self.len() {
            Ok(())
        } else {
            Err(Error::unknown_trait_type(trait_type))
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn trait_type_at(index: usize) -> TraitType {
        TraitType::new(index as u8)
    }
}

impl fmt::Debug for TraitBasedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitBasedObject[")?;
        for (i, slot) in self.slots[..self.len()].iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if *slot == UNSET {
                write!(f, "-")?;
            } else {
                write!(f, "{slot}")?;
            }
        }
        write!(f, "]")
    }
}

/// Whether a filter entry requires or forbids a trait.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Access {
    /// The object must have the trait.
    Include,
    /// The object must not have the trait.
    Exclude,
}

/// Sparse list of trait-presence constraints.
///
/// Only active constraints are stored; an empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitFilter {
    entries: Vec<(TraitType, Access)>,
}

impl TraitFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a trait.
    #[must_use]
    pub fn with(mut self, trait_type: TraitType) -> Self {
        self.entries.push((trait_type, Access::Include));
        self
    }

    /// Forbids a trait.
    #[must_use]
    pub fn without(mut self, trait_type: TraitType) -> Self {
        self.entries.push((trait_type, Access::Exclude));
        self
    }

    /// Builds a filter requiring every listed trait.
    #[must_use]
    pub fn all_of(trait_types: &[TraitType]) -> Self {
        Self {
            entries: trait_types.iter().map(|t| (*t, Access::Include)).collect(),
        }
    }

    /// Iterates the constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TraitType, Access)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the filter has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
