//! Partial object bijection built while comparing two states.
//!
//! The matcher pairs objects tentatively, one traversal at a time. Every pair
//! added during a traversal is logged so a failed traversal can be undone
//! without touching pairs from earlier ones. Traversals nest: reverting pops
//! the most recent one, so an accepted traversal can still be undone later
//! when the search backtracks past it.

use std::collections::{HashMap, VecDeque};

use traitstate_foundation::ObjectId;

/// Bidirectional `lhs ↔ rhs` object mapping with a pending-pair queue.
#[derive(Clone, Debug, Default)]
pub struct ObjectCorrespondence {
    lhs_to_rhs: HashMap<ObjectId, ObjectId>,
    rhs_to_lhs: HashMap<ObjectId, ObjectId>,
    pending: VecDeque<(ObjectId, ObjectId)>,
    log: Vec<ObjectId>,
    marks: Vec<usize>,
    traversals: usize,
}

impl ObjectCorrespondence {
    /// Creates an empty correspondence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty correspondence sized for `objects` pairs.
    #[must_use]
    pub fn with_capacity(objects: usize) -> Self {
        Self {
            lhs_to_rhs: HashMap::with_capacity(objects),
            rhs_to_lhs: HashMap::with_capacity(objects),
            pending: VecDeque::with_capacity(objects),
            log: Vec::with_capacity(objects),
            marks: Vec::with_capacity(objects),
            traversals: 0,
        }
    }

    /// Clears every pair and the traversal count so the map can be reused.
    pub fn reset(&mut self) {
        self.lhs_to_rhs.clear();
        self.rhs_to_lhs.clear();
        self.pending.clear();
        self.log.clear();
        self.marks.clear();
        self.traversals = 0;
    }

    /// Starts a new traversal. Pairs added from here on can be reverted.
    pub fn begin_traversal(&mut self) {
        self.pending.clear();
        self.marks.push(self.log.len());
        self.traversals += 1;
    }

    /// Adds a pair and queues it for checking.
    ///
    /// Returns false, changing nothing, if either side is already paired.
    pub fn add(&mut self, lhs: ObjectId, rhs: ObjectId) -> bool {
        if self.lhs_to_rhs.contains_key(&lhs) || self.rhs_to_lhs.contains_key(&rhs) {
            return false;
        }
        self.lhs_to_rhs.insert(lhs, rhs);
        self.rhs_to_lhs.insert(rhs, lhs);
        self.log.push(lhs);
        self.pending.push_back((lhs, rhs));
        true
    }

    /// Pops the next pair waiting to be checked.
    pub fn pop_pending(&mut self) -> Option<(ObjectId, ObjectId)> {
        self.pending.pop_front()
    }

    /// Removes every pair added since the most recent open
    /// [`begin_traversal`](Self::begin_traversal) and closes it.
    pub fn revert_traversal(&mut self) {
        let mark = self.marks.pop().unwrap_or(0);
        for lhs in self.log.drain(mark..) {
            if let Some(rhs) = self.lhs_to_rhs.remove(&lhs) {
                self.rhs_to_lhs.remove(&rhs);
            }
        }
        self.pending.clear();
    }

    /// Returns the right-hand partner of a left-hand object.
    #[must_use]
    pub fn get(&self, lhs: ObjectId) -> Option<ObjectId> {
        self.lhs_to_rhs.get(&lhs).copied()
    }

    /// Returns the left-hand partner of a right-hand object.
    #[must_use]
    pub fn get_lhs(&self, rhs: ObjectId) -> Option<ObjectId> {
        self.rhs_to_lhs.get(&rhs).copied()
    }

    /// Returns true if the left-hand object is paired.
    #[must_use]
    pub fn contains_lhs(&self, lhs: ObjectId) -> bool {
        self.lhs_to_rhs.contains_key(&lhs)
    }

    /// Returns true if the right-hand object is paired.
    #[must_use]
    pub fn contains_rhs(&self, rhs: ObjectId) -> bool {
        self.rhs_to_lhs.contains_key(&rhs)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lhs_to_rhs.len()
    }

    /// Returns true if nothing is paired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lhs_to_rhs.is_empty()
    }

    /// Iterates `(lhs, rhs)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, ObjectId)> + '_ {
        self.lhs_to_rhs.iter().map(|(lhs, rhs)| (*lhs, *rhs))
    }

    /// Number of traversals begun since the last reset.
    ///
    /// Zero after a comparison means the population check rejected it.
    #[must_use]
    pub fn traversal_count(&self) -> usize {
        self.traversals
    }
}
