//! Structural equality and hashing of states.
//!
//! Two states are equal when some bijection between their objects preserves
//! trait sets, scalar field values, and relation targets. Object ids
//! themselves never take part in the comparison, only in the mapping.
//!
//! The search walks left objects in slot order and tries right candidates in
//! slot order. Each attempt seeds a traversal that follows relation fields
//! outward, pairing targets as it goes. A failed attempt is rolled back
//! before the next candidate is tried; when every candidate for a left
//! object fails, the search backs up and retries the previous one.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, trace};
use traitstate_foundation::{Error, ObjectId, Result};

use crate::correspondence::ObjectCorrespondence;
use crate::object::TraitBasedObject;
use crate::state::{StateData, relation};

const HASH_SEED: u64 = 3_860_031;
const HASH_MUL: u64 = 2779;
const HASH_MIX: u64 = 397;

// Set combine from O'Keefe, "How to Hash a Set". Commutative and associative,
// so table order does not affect the result.
fn combine(h: u64, y: u64) -> u64 {
    HASH_SEED
        .wrapping_add(h.wrapping_add(y).wrapping_mul(HASH_MUL))
        .wrapping_add(h.wrapping_mul(y).wrapping_mul(2))
}

impl StateData {
    /// Order-independent hash of the state's content.
    ///
    /// Mixes the object count with every trait record. Relation targets
    /// contribute only whether they are set, since their ids are arbitrary.
    /// Structurally equal states always hash the same.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let n = self.len() as u64;
        let mut h = HASH_SEED
            .wrapping_add(HASH_MIX.wrapping_add(n).wrapping_mul(HASH_MUL))
            .wrapping_add(HASH_MIX.wrapping_mul(n).wrapping_mul(2));

        for (trait_type, trait_schema) in self.schema.iter() {
            for record in self.tables[trait_type.index()].iter() {
                let mut hasher = DefaultHasher::new();
                trait_type.hash(&mut hasher);
                for (field, value) in trait_schema.fields.iter().zip(record.values()) {
                    if field.is_relation() {
                        value.as_object().is_none_or(ObjectId::is_none).hash(&mut hasher);
                    } else {
                        value.hash(&mut hasher);
                    }
                }
                h = combine(h, HASH_MIX ^ hasher.finish());
            }
        }
        h
    }

    /// Tests structural equality.
    ///
    /// # Panics
    ///
    /// Panics if either state is internally inconsistent (a dangling
    /// relation or a slot past its table). Use
    /// [`try_equals`](Self::try_equals) to get the error instead.
    #[must_use]
    pub fn equals(&self, other: &StateData) -> bool {
        match self.try_equals(other) {
            Ok(equal) => equal,
            Err(err) => panic!("cannot compare corrupt states: {err}"),
        }
    }

    /// Tests structural equality, reporting corrupt states as errors.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if a relation points at an object that
    /// is not in its state, or a slot points past its table.
    pub fn try_equals(&self, other: &StateData) -> Result<bool> {
        let mut map = ObjectCorrespondence::with_capacity(self.len());
        self.try_get_object_mapping(other, &mut map)
    }

    /// Finds the object bijection between two equal states.
    ///
    /// Returns `None` if the states are not structurally equal.
    ///
    /// # Errors
    ///
    /// See [`try_equals`](Self::try_equals).
    pub fn object_correspondence(&self, other: &StateData) -> Result<Option<ObjectCorrespondence>> {
        let mut map = ObjectCorrespondence::with_capacity(self.len());
        Ok(self.try_get_object_mapping(other, &mut map)?.then_some(map))
    }

    /// Runs the matcher into a caller-owned correspondence.
    ///
    /// The map is reset first. On success it holds a complete bijection from
    /// this state's ids to `other`'s; on failure its content is unspecified
    /// apart from [`traversal_count`](ObjectCorrespondence::traversal_count).
    ///
    /// # Errors
    ///
    /// See [`try_equals`](Self::try_equals).
    pub fn try_get_object_mapping(
        &self,
        other: &StateData,
        map: &mut ObjectCorrespondence,
    ) -> Result<bool> {
        map.reset();

        if !Arc::ptr_eq(&self.schema, &other.schema) && *self.schema != *other.schema {
            debug!("states built against different schemas");
            return Ok(false);
        }
        if self.len() != other.len() {
            debug!(lhs = self.len(), rhs = other.len(), "object counts differ");
            return Ok(false);
        }
        for (trait_type, (lhs, rhs)) in self
            .schema
            .trait_types()
            .zip(self.tables.iter().zip(&other.tables))
        {
            if lhs.len() != rhs.len() {
                debug!(?trait_type, lhs = lhs.len(), rhs = rhs.len(), "trait populations differ");
                return Ok(false);
            }
        }

        let equal = self.search(other, map, 0)?;
        debug!(equal, pairs = map.len(), traversals = map.traversal_count(), "states compared");
        Ok(equal)
    }

    // Pairs the first unmapped left object at or after `start`, then recurses.
    // Depth is bounded by the object count.
    fn search(&self, other: &StateData, map: &mut ObjectCorrespondence, start: usize) -> Result<bool> {
        let Some((position, lhs_id)) = self.object_ids[start..]
            .iter()
            .enumerate()
            .map(|(offset, id)| (start + offset, id.id))
            .find(|(_, id)| !map.contains_lhs(*id))
        else {
            return Ok(true);
        };

        for rhs_id in other.object_ids.iter().map(|id| id.id) {
            if map.contains_rhs(rhs_id) {
                continue;
            }
            map.begin_traversal();
            map.add(lhs_id, rhs_id);
            if self.drain(other, map)? && self.search(other, map, position + 1)? {
                return Ok(true);
            }
            map.revert_traversal();
        }
        trace!(%lhs_id, "no partner found");
        Ok(false)
    }

    fn drain(&self, other: &StateData, map: &mut ObjectCorrespondence) -> Result<bool> {
        while let Some((lhs_id, rhs_id)) = map.pop_pending() {
            let lhs = self.resolve(lhs_id)?;
            let rhs = other.resolve(rhs_id)?;
            if !self.attributes_equal(&lhs, other, &rhs)?
                || !self.check_relations_and_queue(&lhs, other, &rhs, map)?
            {
                trace!(%lhs_id, %rhs_id, "pair rejected");
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn resolve(&self, id: ObjectId) -> Result<TraitBasedObject> {
        let index = self
            .lookup(id)
            .ok_or_else(|| Error::invariant(format!("relation target {id} is not in the state")))?;
        self.object_at(index)
    }

    fn attributes_equal(
        &self,
        lhs: &TraitBasedObject,
        other: &StateData,
        rhs: &TraitBasedObject,
    ) -> Result<bool> {
        if !lhs.has_same_traits(rhs) {
            return Ok(false);
        }
        for trait_type in lhs.trait_types() {
            let (Some(lhs_slot), Some(rhs_slot)) = (lhs.get(trait_type), rhs.get(trait_type)) else {
                return Ok(false);
            };
            let trait_schema = self.schema.trait_schema(trait_type)?;
            let lhs_record = self.record(trait_type, lhs_slot)?;
            let rhs_record = other.record(trait_type, rhs_slot)?;
            let scalars_equal = trait_schema
                .fields
                .iter()
                .zip(lhs_record.values().iter().zip(rhs_record.values()))
                .filter(|(field, _)| !field.is_relation())
                .all(|(_, (a, b))| a == b);
            if !scalars_equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_relations_and_queue(
        &self,
        lhs: &TraitBasedObject,
        other: &StateData,
        rhs: &TraitBasedObject,
        map: &mut ObjectCorrespondence,
    ) -> Result<bool> {
        for trait_type in lhs.trait_types() {
            let trait_schema = self.schema.trait_schema(trait_type)?;
            if !trait_schema.has_relations() {
                continue;
            }
            let (Some(lhs_slot), Some(rhs_slot)) = (lhs.get(trait_type), rhs.get(trait_type)) else {
                return Ok(false);
            };
            let lhs_record = self.record(trait_type, lhs_slot)?;
            let rhs_record = other.record(trait_type, rhs_slot)?;

            for field in trait_schema.relation_fields() {
                let lhs_target = relation(lhs_record, trait_schema, field)?;
                let rhs_target = relation(rhs_record, trait_schema, field)?;

                if lhs_target.is_none() != rhs_target.is_none() {
                    return Ok(false);
                }
                if lhs_target.is_none() {
                    continue;
                }
                match map.get(lhs_target) {
                    Some(assigned) if assigned != rhs_target => return Ok(false),
                    Some(_) => {}
                    None => {
                        if !map.add(lhs_target, rhs_target) {
                            return Ok(false);
                        }
                    }
                }
            }
        }
        Ok(true)
    }
}

impl PartialEq for StateData {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for StateData {}

impl Hash for StateData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.state_hash());
    }
}
