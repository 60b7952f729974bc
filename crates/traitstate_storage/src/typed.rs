//! Typed access to trait records.
//!
//! Planning code usually knows the traits it works with at compile time.
//! Implementing [`TraitData`] for a plain struct lets it register its schema
//! and move values in and out of a state without naming fields by string.

use traitstate_foundation::{Error, ObjectId, Result, Type, Value};

use crate::schema::TraitSchema;
use crate::table::TraitRecord;

/// A Rust type that mirrors one trait schema.
pub trait TraitData: Sized {
    /// Trait name, as registered in the schema.
    const NAME: &'static str;

    /// Field layout of this trait.
    fn schema() -> TraitSchema;

    /// Converts the value into a record in schema field order.
    fn to_record(&self) -> TraitRecord;

    /// Rebuilds the value from a record.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the record has the wrong shape.
    fn from_record(record: &TraitRecord) -> Result<Self>;
}

/// Reads a field from a record, checking its type.
///
/// Small helper for [`TraitData::from_record`] implementations.
///
/// # Errors
///
/// Returns `UnknownField` if the record is too short, or `TypeMismatch` if
/// the value has a different type.
pub fn field<T: FromValue>(record: &TraitRecord, trait_name: &str, index: usize) -> Result<T> {
    let value = record
        .get(index)
        .ok_or_else(|| Error::unknown_field(trait_name, format!("#{index}")))?;
    T::from_value(value).ok_or_else(|| Error::type_mismatch(T::TYPE, value.value_type()))
}

/// Rust types that can be read out of a [`Value`].
pub trait FromValue: Sized {
    /// Declared field type this Rust type corresponds to.
    const TYPE: Type;

    /// Extracts the value, or `None` on a type mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const TYPE: Type = Type::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const TYPE: Type = Type::Int;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for f64 {
    const TYPE: Type = Type::Float;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for String {
    const TYPE: Type = Type::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for ObjectId {
    const TYPE: Type = Type::Object;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object()
    }
}
