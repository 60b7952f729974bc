//! Field type descriptors and trait type indices.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declared type of a trait field.
///
/// Used by schemas to validate values and to tell relation fields
/// (which reference other objects) apart from plain attributes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// Boolean.
    Bool,
    /// 64-bit signed integer. Enumerations are stored as integers.
    Int,
    /// 64-bit floating point.
    Float,
    /// Immutable string.
    String,
    /// Reference to another object in the same state (a relation field).
    Object,
}

impl Type {
    /// Returns true if fields of this type reference other objects.
    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(self, Self::Object)
    }

    /// Checks if a value type is accepted by this type.
    ///
    /// Types must match exactly; there is no numeric promotion because
    /// equality between states compares values bit for bit.
    #[must_use]
    pub fn accepts(self, value_type: Type) -> bool {
        self == value_type
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
            Self::Object => write!(f, "object"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index of a trait type within a schema.
///
/// Assigned by schema order; only meaningful together with the schema that
/// produced it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitType(u8);

impl TraitType {
    /// Creates a trait type from its schema position.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the schema position as a `usize` for indexing.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraitType({})", self.0)
    }
}

impl fmt::Display for TraitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trait#{}", self.0)
    }
}
