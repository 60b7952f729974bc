//! Schema definitions for trait types.
//!
//! A schema is the fixed list of trait types a store understands, each with
//! its field layout. It is validated once, up front; a malformed schema is a
//! configuration error, never something a running state discovers.

use std::collections::HashSet;
use std::sync::Arc;

use traitstate_foundation::{Error, ErrorKind, Result, TraitType, Type, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::table::TraitRecord;
use crate::typed::TraitData;

/// Upper bound on trait types per schema; the size of an object's slot array.
pub const MAX_TRAIT_TYPES: usize = 16;

/// Schema definition for one field of a trait.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSchema {
    /// Field name.
    pub name: Arc<str>,
    /// Field type. `Type::Object` marks a relation.
    pub ty: Type,
}

impl FieldSchema {
    /// Creates a field.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Creates a relation field.
    #[must_use]
    pub fn relation(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, Type::Object)
    }

    /// Returns true if this field references another object.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        self.ty.is_relation()
    }
}

/// Schema definition for a trait type.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraitSchema {
    /// Trait name (e.g. `Cell`, `Game`).
    pub name: Arc<str>,
    /// Field definitions in storage order.
    pub fields: Vec<FieldSchema>,
}

impl TraitSchema {
    /// Creates a trait schema with no fields (a tag trait).
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field to the schema.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<Arc<str>>, ty: Type) -> Self {
        self.fields.push(FieldSchema::new(name, ty));
        self
    }

    /// Adds a relation field to the schema.
    #[must_use]
    pub fn with_relation(mut self, name: impl Into<Arc<str>>) -> Self {
        self.fields.push(FieldSchema::relation(name));
        self
    }

    /// Returns the position of a field by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` if the trait has no such field.
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| &*f.name == name)
            .ok_or_else(|| Error::unknown_field(&*self.name, name))
    }

    /// Returns the field schema by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| &*f.name == name)
    }

    /// Iterates the positions of relation fields.
    pub fn relation_fields(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_relation())
            .map(|(i, _)| i)
    }

    /// Returns true if any field is a relation.
    #[must_use]
    pub fn has_relations(&self) -> bool {
        self.fields.iter().any(FieldSchema::is_relation)
    }

    /// Builds the default-initialised record for this trait.
    #[must_use]
    pub fn default_record(&self) -> TraitRecord {
        TraitRecord::new(self.fields.iter().map(|f| Value::default_for(f.ty)).collect())
    }

    /// Checks that a record has this trait's arity and field types.
    ///
    /// # Errors
    ///
    /// Returns `FieldCount` or `TypeMismatch` on the first disagreement.
    pub fn validate_record(&self, record: &TraitRecord) -> Result<()> {
        if record.len() != self.fields.len() {
            return Err(Error::new(ErrorKind::FieldCount {
                trait_name: self.name.to_string(),
                expected: self.fields.len(),
                actual: record.len(),
            }));
        }
        for (field, value) in self.fields.iter().zip(record.values()) {
            self.validate_value(field, value)?;
        }
        Ok(())
    }

    /// Checks a single value against a field's declared type.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the value has the wrong type.
    pub fn validate_value(&self, field: &FieldSchema, value: &Value) -> Result<()> {
        if field.ty.accepts(value.value_type()) {
            Ok(())
        } else {
            Err(Error::type_mismatch(field.ty, value.value_type())
                .with_context(format!("{}.{}", self.name, field.name)))
        }
    }

    fn check(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_schema("trait with empty name"));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "trait {} has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(&*field.name) {
                return Err(Error::invalid_schema(format!(
                    "trait {} declares field {} twice",
                    self.name, field.name
                )));
            }
        }
        Ok(())
    }
}

/// A validated, ordered set of trait schemas.
///
/// The position of each trait is its [`TraitType`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schema {
    traits: Vec<TraitSchema>,
}

impl Schema {
    /// Starts building a schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Number of trait types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    /// Returns true if the schema has no trait types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    /// Looks up a trait type by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTrait` if no trait has this name.
    pub fn trait_type(&self, name: &str) -> Result<TraitType> {
        self.traits
            .iter()
            .position(|t| &*t.name == name)
            .map(Self::to_trait_type)
            .ok_or_else(|| Error::unknown_trait(name))
    }

    /// Returns the schema for a trait type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the index is outside this schema.
    pub fn trait_schema(&self, trait_type: TraitType) -> Result<&TraitSchema> {
        self.traits
            .get(trait_type.index())
            .ok_or_else(|| Error::unknown_trait_type(trait_type))
    }

    /// Verifies a trait type belongs to this schema.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the index is outside this schema.
    pub fn check(&self, trait_type: TraitType) -> Result<()> {
        self.trait_schema(trait_type).map(|_| ())
    }

    /// Iterates trait types with their schemas, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (TraitType, &TraitSchema)> {
        self.traits
            .iter()
            .enumerate()
            .map(|(i, t)| (Self::to_trait_type(i), t))
    }

    /// Iterates all trait types in schema order.
    pub fn trait_types(&self) -> impl Iterator<Item = TraitType> {
        (0..self.traits.len()).map(Self::to_trait_type)
    }

    // Builder caps the length at MAX_TRAIT_TYPES, so the index always fits.
    #[allow(clippy::cast_possible_truncation)]
    fn to_trait_type(index: usize) -> TraitType {
        TraitType::new(index as u8)
    }
}

/// Builder for [`Schema`].
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    traits: Vec<TraitSchema>,
}

impl SchemaBuilder {
    /// Adds a trait schema.
    #[must_use]
    pub fn with_trait(mut self, schema: TraitSchema) -> Self {
        self.traits.push(schema);
        self
    }

    /// Adds the schema of a typed trait.
    #[must_use]
    pub fn with_typed<T: TraitData>(self) -> Self {
        self.with_trait(T::schema())
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for duplicate or empty names, duplicate
    /// fields, or more than [`MAX_TRAIT_TYPES`] traits.
    pub fn build(self) -> Result<Schema> {
        if self.traits.len() > MAX_TRAIT_TYPES {
            return Err(Error::invalid_schema(format!(
                "{} trait types declared, at most {MAX_TRAIT_TYPES} supported",
                self.traits.len()
            )));
        }
        let mut seen = HashSet::new();
        for schema in &self.traits {
            schema.check()?;
            if !seen.insert(&*schema.name) {
                return Err(Error::invalid_schema(format!(
                    "trait {} declared twice",
                    schema.name
                )));
            }
        }
        Ok(Schema {
            traits: self.traits,
        })
    }
}
