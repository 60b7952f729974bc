//! Handles naming managed states.

use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Generational reference to a state owned by a [`StateManager`](crate::StateManager).
///
/// Odd generations are live. Destroying a state bumps its slot to an even
/// generation, so every handle issued before that stops resolving at once.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateHandle {
    /// Slot in the manager's arena.
    pub index: u32,
    /// Generation of the slot when the handle was issued.
    pub generation: u32,
}

impl StateHandle {
    /// Creates a handle from its parts.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns true if the generation marks a live slot.
    #[must_use]
    pub const fn is_live_generation(self) -> bool {
        self.generation % 2 == 1
    }
}

impl fmt::Display for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}v{}", self.index, self.generation)
    }
}

/// A state handle paired with the state's content hash at key creation.
///
/// Keys compare and hash by handle only. The content hash is for callers
/// that bucket candidate-equal states before running an exact comparison.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateKey {
    /// The state this key names.
    pub handle: StateHandle,
    /// [`StateData::state_hash`](traitstate_storage::StateData::state_hash)
    /// when the key was made.
    pub content_hash: u64,
}

impl PartialEq for StateKey {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for StateKey {}

impl Hash for StateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#018x})", self.handle, self.content_hash)
    }
}
