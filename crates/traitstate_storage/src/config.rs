//! Store configuration.

/// Configuration shared by every state created from the same store.
///
/// Controls consistency checking, debug labels, and allocation hints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Run [`StateData::validate`](crate::StateData::validate) after every
    /// structural mutation and fail the mutation if it reports a problem.
    pub verify_invariants: bool,

    /// Keep debug labels on object ids. Labels never affect identity.
    pub keep_labels: bool,

    /// Capacity hint for the object sequence of new states.
    pub initial_object_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            verify_invariants: cfg!(debug_assertions),
            keep_labels: cfg!(debug_assertions),
            initial_object_capacity: 16,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for development: every check on, labels kept.
    #[must_use]
    pub fn development() -> Self {
        Self {
            verify_invariants: true,
            keep_labels: true,
            ..Self::default()
        }
    }

    /// Creates a configuration for search runs: no per-mutation checks, no labels.
    #[must_use]
    pub fn release() -> Self {
        Self {
            verify_invariants: false,
            keep_labels: false,
            ..Self::default()
        }
    }

    /// Builder method to enable/disable per-mutation validation.
    #[must_use]
    pub fn with_verify_invariants(mut self, verify: bool) -> Self {
        self.verify_invariants = verify;
        self
    }

    /// Builder method to keep or drop debug labels.
    #[must_use]
    pub fn with_keep_labels(mut self, keep: bool) -> Self {
        self.keep_labels = keep;
        self
    }

    /// Builder method to set the object capacity hint.
    #[must_use]
    pub fn with_initial_object_capacity(mut self, capacity: usize) -> Self {
        self.initial_object_capacity = capacity;
        self
    }
}
