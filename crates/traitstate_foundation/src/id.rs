//! Object identifiers and the id allocator.
//!
//! An [`ObjectId`] names one logical object for the whole planning session.
//! It is independent of where the object currently lives inside a state:
//! storage slots move on every swap-remove, ids never do.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque object identifier, unique within a planning session.
///
/// `ObjectId::NONE` (zero) is reserved and means "no relation".
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectId(u64);

impl ObjectId {
    /// Sentinel meaning "no object".
    pub const NONE: Self = Self(0);

    /// Wraps a raw id value.
    ///
    /// Intended for tests and tooling that need to build ids by hand;
    /// planning code should allocate through [`ObjectIdAllocator`].
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true if this is the `NONE` sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "ObjectId(none)")
        } else {
            write!(f, "ObjectId({})", self.0)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

static GLOBAL: LazyLock<Arc<ObjectIdAllocator>> =
    LazyLock::new(|| Arc::new(ObjectIdAllocator::new()));

/// Monotonic generator of [`ObjectId`]s.
///
/// Ids are never reused. The process-wide allocator is reachable through
/// [`ObjectIdAllocator::global`]; tests that need deterministic ids create
/// their own instance and hand it to the store explicitly.
#[derive(Debug)]
pub struct ObjectIdAllocator {
    next: AtomicU64,
}

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectIdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a handle to the process-wide allocator.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Allocates the next id.
    ///
    /// # Panics
    ///
    /// Panics if the 64-bit id space is exhausted. The counter stays
    /// saturated, so every later call panics too and `NONE` is never handed
    /// out.
    pub fn next_id(&self) -> ObjectId {
        let Ok(raw) = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| raw.checked_add(1))
        else {
            panic!("object id space exhausted");
        };
        ObjectId(raw)
    }

    /// Returns the id the next call to [`next_id`](Self::next_id) would produce.
    #[must_use]
    pub fn peek(&self) -> ObjectId {
        ObjectId(self.next.load(Ordering::Relaxed))
    }
}

/// An [`ObjectId`] paired with an optional debug label.
///
/// Equality and hashing use the id only; the label is for humans.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitBasedObjectId {
    /// The identity of the object.
    pub id: ObjectId,
    /// Optional human-readable label.
    pub label: Option<Arc<str>>,
}

impl TraitBasedObjectId {
    /// Creates an unlabeled object id.
    #[must_use]
    pub const fn new(id: ObjectId) -> Self {
        Self { id, label: None }
    }

    /// Creates a labeled object id.
    #[must_use]
    pub fn labeled(id: ObjectId, label: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            label: Some(label.into()),
        }
    }

    /// The `NONE` relation target.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(ObjectId::NONE)
    }

    /// Returns the label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl PartialEq for TraitBasedObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TraitBasedObjectId {}

impl Hash for TraitBasedObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl From<ObjectId> for TraitBasedObjectId {
    fn from(id: ObjectId) -> Self {
        Self::new(id)
    }
}

impl fmt::Debug for TraitBasedObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label}({:?})", self.id),
            None => write!(f, "{:?}", self.id),
        }
    }
}

impl fmt::Display for TraitBasedObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} ({})", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}
