//! The state arena.
//!
//! `StateManager` owns every snapshot a planning run creates. Handles are
//! generational, readers take [`Arc`] leases, and destruction is deferred:
//! a destroyed state stops resolving immediately, but its storage is only
//! reclaimed by [`commit`](StateManager::commit) once no lease remains.

// Slot counts are bounded by u32 handles.
#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use tracing::{debug, instrument, trace};
use traitstate_foundation::{Error, ObjectIdAllocator, Result};
use traitstate_storage::{Schema, StateData, StateEdit, StoreConfig};

use crate::handle::{StateHandle, StateKey};

#[derive(Debug, Clone)]
struct Slot {
    /// Even generations are free or pending destruction, odd are live.
    generation: u32,
    state: Option<Arc<StateData>>,
}

/// Owns planning states and hands out generational handles to them.
#[derive(Debug)]
pub struct StateManager {
    schema: Arc<Schema>,
    ids: Arc<ObjectIdAllocator>,
    config: StoreConfig,
    slots: Vec<Slot>,
    /// Slots available for reuse.
    free_list: Vec<u32>,
    /// Destroyed slots still holding their state until the next commit.
    pending: Vec<u32>,
    live_count: usize,
}

impl StateManager {
    /// Creates a manager that allocates object ids from the process-wide
    /// allocator.
    #[must_use]
    pub fn new(schema: Arc<Schema>, config: StoreConfig) -> Self {
        Self::with_allocator(schema, ObjectIdAllocator::global(), config)
    }

    /// Creates a manager with an explicit id allocator.
    #[must_use]
    pub fn with_allocator(
        schema: Arc<Schema>,
        ids: Arc<ObjectIdAllocator>,
        config: StoreConfig,
    ) -> Self {
        Self {
            schema,
            ids,
            config,
            slots: Vec::new(),
            free_list: Vec::new(),
            pending: Vec::new(),
            live_count: 0,
        }
    }

    /// Returns the schema shared by every managed state.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Creates an empty state.
    #[instrument(skip(self))]
    pub fn create(&mut self) -> StateHandle {
        let state = StateData::with_parts(
            Arc::clone(&self.schema),
            Arc::clone(&self.ids),
            self.config.clone(),
        );
        self.allocate(state)
    }

    /// Takes ownership of a state built elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` if the state uses a different schema.
    #[instrument(skip(self, state), fields(objects = state.len()))]
    pub fn insert(&mut self, state: StateData) -> Result<StateHandle> {
        if !Arc::ptr_eq(state.schema(), &self.schema) && **state.schema() != *self.schema {
            return Err(Error::invalid_schema(
                "state was built against a different schema",
            ));
        }
        Ok(self.allocate(state))
    }

    /// Copies a state into a new, independent one.
    ///
    /// # Errors
    ///
    /// Returns `StaleHandle` if `handle` does not name a live state.
    #[instrument(skip(self))]
    pub fn copy(&mut self, handle: StateHandle) -> Result<StateHandle> {
        let copy = self.resolve(handle)?.copy();
        Ok(self.allocate(copy))
    }

    /// Destroys a state.
    ///
    /// The handle goes stale at once. The storage stays alive until a
    /// [`commit`](Self::commit) finds no outstanding lease on it.
    ///
    /// # Errors
    ///
    /// Returns `StaleHandle` if `handle` does not name a live state.
    #[instrument(skip(self))]
    pub fn destroy(&mut self, handle: StateHandle) -> Result<()> {
        self.validate(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        slot.generation += 1;
        self.pending.push(handle.index);
        self.live_count -= 1;
        debug!(pending = self.pending.len(), "queued for destruction");
        Ok(())
    }

    /// Reclaims destroyed states that no reader holds any more.
    ///
    /// Leased states stay pending until a later commit. Returns the number
    /// of slots reclaimed.
    #[instrument(skip(self))]
    pub fn commit(&mut self) -> usize {
        let mut reclaimed = 0;
        let slots = &mut self.slots;
        let free_list = &mut self.free_list;
        self.pending.retain(|&index| {
            let slot = &mut slots[index as usize];
            let leased = slot
                .state
                .as_ref()
                .is_some_and(|state| Arc::strong_count(state) > 1);
            if leased {
                trace!(index, "still leased");
                return true;
            }
            slot.state = None;
            free_list.push(index);
            reclaimed += 1;
            false
        });
        debug!(reclaimed, pending = self.pending.len(), "commit");
        reclaimed
    }

    /// Returns a state for reading.
    #[must_use]
    pub fn get(&self, handle: StateHandle) -> Option<&StateData> {
        self.resolve(handle).ok()
    }

    /// Returns a state for writing.
    ///
    /// # Errors
    ///
    /// Returns `StaleHandle` if `handle` does not name a live state, or
    /// `StateBusy` while a lease on it is outstanding.
    pub fn get_mut(&mut self, handle: StateHandle) -> Result<&mut StateData> {
        self.validate(handle)?;
        self.slots[handle.index as usize]
            .state
            .as_mut()
            .and_then(Arc::get_mut)
            .ok_or_else(|| Error::state_busy(handle.to_string()))
    }

    /// Takes a shared lease on a state for concurrent readers.
    ///
    /// A leased state cannot be mutated in place and is not reclaimed after
    /// destruction until every lease is dropped.
    #[must_use]
    pub fn lease(&self, handle: StateHandle) -> Option<Arc<StateData>> {
        self.validate(handle).ok()?;
        self.slots[handle.index as usize].state.clone()
    }

    /// Applies a batch of edits atomically.
    ///
    /// The edits run in order against a working copy, which is validated
    /// once after the last edit when the store checks invariants. If all of
    /// that succeeds the copy replaces the state; otherwise the state is left
    /// untouched.
    /// Existing leases keep seeing the snapshot they took.
    ///
    /// # Errors
    ///
    /// Returns `StaleHandle` if `handle` does not name a live state, the
    /// first error raised by an edit, or `InvariantViolation` if the edited
    /// state is inconsistent.
    #[instrument(skip(self, edits), fields(count = edits.len()))]
    pub fn apply_edits(&mut self, handle: StateHandle, edits: &[StateEdit]) -> Result<()> {
        let mut working = self.resolve(handle)?.copy();
        working.apply_batch(edits)?;
        self.slots[handle.index as usize].state = Some(Arc::new(working));
        Ok(())
    }

    /// Tests two states for structural equality.
    ///
    /// # Errors
    ///
    /// Returns `StaleHandle` for a dead handle, or `InvariantViolation` if
    /// either state is corrupt.
    pub fn equals(&self, a: StateHandle, b: StateHandle) -> Result<bool> {
        let lhs = self.resolve(a)?;
        let rhs = self.resolve(b)?;
        lhs.try_equals(rhs)
    }

    /// Returns the content hash of a state.
    #[must_use]
    pub fn hash(&self, handle: StateHandle) -> Option<u64> {
        self.get(handle).map(StateData::state_hash)
    }

    /// Returns a bucketing key for a state.
    #[must_use]
    pub fn key(&self, handle: StateHandle) -> Option<StateKey> {
        self.hash(handle).map(|content_hash| StateKey {
            handle,
            content_hash,
        })
    }

    /// Returns true if `handle` names a live state.
    #[must_use]
    pub fn exists(&self, handle: StateHandle) -> bool {
        self.validate(handle).is_ok()
    }

    /// Number of live states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns true if there are no live states.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Number of destroyed states awaiting reclamation.
    #[must_use]
    pub fn pending_destruction(&self) -> usize {
        self.pending.len()
    }

    /// Iterates handles of all live states.
    pub fn handles(&self) -> impl Iterator<Item = StateHandle> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.generation % 2 == 1)
            .map(|(index, slot)| StateHandle::new(index as u32, slot.generation))
    }

    fn allocate(&mut self, state: StateData) -> StateHandle {
        self.live_count += 1;
        let state = Some(Arc::new(state));

        let handle = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            // Even (free) becomes odd (live).
            slot.generation += 1;
            slot.state = state;
            StateHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                state,
            });
            StateHandle::new(index, 1)
        };
        trace!(%handle, "allocated");
        handle
    }

    fn validate(&self, handle: StateHandle) -> Result<()> {
        match self.slots.get(handle.index as usize) {
            Some(slot) if slot.generation == handle.generation && handle.is_live_generation() => {
                Ok(())
            }
            _ => Err(Error::stale_handle(handle.to_string())),
        }
    }

    fn resolve(&self, handle: StateHandle) -> Result<&StateData> {
        self.validate(handle)?;
        self.slots[handle.index as usize]
            .state
            .as_deref()
            .ok_or_else(|| Error::invariant(format!("live {handle} has no state")))
    }
}
