//! State snapshots.
//!
//! A [`StateData`] is one planning state: a sequence of object descriptors,
//! a parallel sequence of object ids, and one table per trait type. Slot
//! indices are storage positions and shift on removal; [`ObjectId`]s are the
//! stable identities that relation fields refer to.
//!
//! Structural equality and hashing live in [`crate::matching`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;
use traitstate_foundation::{
    Error, ErrorKind, ObjectId, ObjectIdAllocator, Result, TraitBasedObjectId, TraitType, Value,
};

use crate::config::StoreConfig;
use crate::edit::StateEdit;
use crate::object::{MAX_SLOTS, TraitBasedObject, TraitFilter};
use crate::schema::{Schema, TraitSchema};
use crate::table::{TraitRecord, TraitTable};
use crate::typed::TraitData;

/// One snapshot of the planner's world.
///
/// Cloning produces an independent snapshot with the same ids and values;
/// the schema and the id allocator are shared.
#[derive(Clone)]
pub struct StateData {
    pub(crate) schema: Arc<Schema>,
    ids: Arc<ObjectIdAllocator>,
    config: StoreConfig,
    pub(crate) objects: Vec<TraitBasedObject>,
    pub(crate) object_ids: Vec<TraitBasedObjectId>,
    index: HashMap<ObjectId, usize>,
    pub(crate) tables: Vec<TraitTable>,
}

impl StateData {
    /// Creates an empty state using the process-wide id allocator.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_parts(schema, ObjectIdAllocator::global(), StoreConfig::default())
    }

    /// Creates an empty state from explicit parts.
    #[must_use]
    pub fn with_parts(
        schema: Arc<Schema>,
        ids: Arc<ObjectIdAllocator>,
        config: StoreConfig,
    ) -> Self {
        let capacity = config.initial_object_capacity;
        let tables = (0..schema.len()).map(|_| TraitTable::new()).collect();
        Self {
            schema,
            ids,
            config,
            objects: Vec::with_capacity(capacity),
            object_ids: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            tables,
        }
    }

    /// Returns the schema this state is built against.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the id allocator used for new objects.
    #[must_use]
    pub fn allocator(&self) -> &Arc<ObjectIdAllocator> {
        &self.ids
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Produces an independent snapshot with identical logical content.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // --- Objects ---

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the state has no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Adds an object with default-initialised records for `traits`.
    ///
    /// A fresh id is allocated. Repeated trait types are attached once.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait type,
    /// `CapacityExceeded` if a trait table is full, or `DuplicateObject` if
    /// the allocator hands out an id that was inserted by hand.
    pub fn add_object(
        &mut self,
        traits: &[TraitType],
        label: Option<&str>,
    ) -> Result<(usize, TraitBasedObject, TraitBasedObjectId)> {
        self.check_traits(traits)?;
        let id = self.ids.next_id();
        if self.index.contains_key(&id) {
            return Err(Error::new(ErrorKind::DuplicateObject(id)));
        }
        let id = match label {
            Some(label) => TraitBasedObjectId::labeled(id, label),
            None => TraitBasedObjectId::new(id),
        };
        self.insert_object(traits, id)
    }

    /// Adds an object under a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns `NullObjectId` for `ObjectId::NONE`, `DuplicateObject` if the
    /// id is already present, or the errors of [`add_object`](Self::add_object).
    pub fn add_object_with_id(
        &mut self,
        traits: &[TraitType],
        id: TraitBasedObjectId,
    ) -> Result<(usize, TraitBasedObject, TraitBasedObjectId)> {
        if id.id.is_none() {
            return Err(Error::new(ErrorKind::NullObjectId));
        }
        if self.index.contains_key(&id.id) {
            return Err(Error::new(ErrorKind::DuplicateObject(id.id)));
        }
        self.check_traits(traits)?;
        self.insert_object(traits, id)
    }

    fn insert_object(
        &mut self,
        traits: &[TraitType],
        mut id: TraitBasedObjectId,
    ) -> Result<(usize, TraitBasedObject, TraitBasedObjectId)> {
        if !self.config.keep_labels {
            id.label = None;
        }
        let mut object = TraitBasedObject::new(self.schema.len());
        for &trait_type in traits {
            if object.has(trait_type) {
                continue;
            }
            let record = self.schema.trait_schema(trait_type)?.default_record();
            let slot = self.tables[trait_type.index()].push(record);
            object.set(trait_type, slot)?;
        }

        let index = self.objects.len();
        self.objects.push(object);
        self.object_ids.push(id.clone());
        self.index.insert(id.id, index);
        self.verify()?;
        Ok((index, object, id))
    }

    /// Removes the object at `index` together with all of its traits.
    ///
    /// The last object moves into the freed position. Relations pointing at
    /// the removed object are left as they are; clearing them is the
    /// caller's job. Returns false if `index` is out of range.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if the state is found to be corrupt.
    pub fn remove_object(&mut self, index: usize) -> Result<bool> {
        let Some(object) = self.objects.get(index).copied() else {
            return Ok(false);
        };
        for trait_type in object.trait_types() {
            if let Some(slot) = object.get(trait_type) {
                self.detach_record(trait_type, slot)?;
            }
        }

        self.objects.swap_remove(index);
        let removed = self.object_ids.swap_remove(index);
        self.index.remove(&removed.id);
        if let Some(moved) = self.object_ids.get(index) {
            trace!(id = %moved.id, from = self.objects.len(), to = index, "retargeted moved object");
            self.index.insert(moved.id, index);
        }
        self.verify()?;
        Ok(true)
    }

    /// Removes the object with this id. Returns false if absent.
    ///
    /// # Errors
    ///
    /// See [`remove_object`](Self::remove_object).
    pub fn remove_object_by_id(&mut self, id: ObjectId) -> Result<bool> {
        match self.lookup(id) {
            Some(index) => self.remove_object(index),
            None => Ok(false),
        }
    }

    /// Returns the slot index of an object id.
    #[must_use]
    pub fn lookup(&self, id: ObjectId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns the id of the object at `index`.
    #[must_use]
    pub fn object_id(&self, index: usize) -> Option<&TraitBasedObjectId> {
        self.object_ids.get(index)
    }

    /// Returns the descriptor of the object at `index`.
    #[must_use]
    pub fn object(&self, index: usize) -> Option<TraitBasedObject> {
        self.objects.get(index).copied()
    }

    /// Iterates object descriptors in slot order.
    pub fn objects(&self) -> impl Iterator<Item = &TraitBasedObject> {
        self.objects.iter()
    }

    /// Iterates object ids in slot order.
    pub fn object_ids(&self) -> impl Iterator<Item = &TraitBasedObjectId> {
        self.object_ids.iter()
    }

    /// Returns the slot indices of every object matching `filter`.
    ///
    /// The result is invalidated by any structural mutation.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the filter names a trait outside the
    /// schema.
    pub fn objects_matching(&self, filter: &TraitFilter) -> Result<Vec<usize>> {
        for (trait_type, _) in filter.iter() {
            self.schema.check(trait_type)?;
        }
        let mut matches = Vec::new();
        for (index, object) in self.objects.iter().enumerate() {
            if object.matches_filter(filter)? {
                matches.push(index);
            }
        }
        Ok(matches)
    }

    // --- Traits ---

    /// Returns true if the object at `index` has this trait.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait type, or
    /// `ObjectIndexOutOfRange`.
    pub fn has_trait(&self, index: usize, trait_type: TraitType) -> Result<bool> {
        self.schema.check(trait_type)?;
        Ok(self.object_at(index)?.has(trait_type))
    }

    /// Returns the object's record for a trait, or `None` if it lacks it.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait type, or
    /// `ObjectIndexOutOfRange`.
    pub fn get_trait(&self, index: usize, trait_type: TraitType) -> Result<Option<&TraitRecord>> {
        self.schema.check(trait_type)?;
        match self.object_at(index)?.get(trait_type) {
            Some(slot) => self.record(trait_type, slot).map(Some),
            None => Ok(None),
        }
    }

    // Returns the object's record mutably, attaching a default record first
    // if the object lacks the trait. Writes through it skip type checks, so
    // callers validate values before storing them.
    fn get_trait_mut(&mut self, index: usize, trait_type: TraitType) -> Result<&mut TraitRecord> {
        let trait_schema = self.schema.trait_schema(trait_type)?;
        let mut object = self.object_at(index)?;
        let slot = match object.get(trait_type) {
            Some(slot) => slot,
            None => {
                let record = trait_schema.default_record();
                let slot = self.attach_record(&mut object, trait_type, record)?;
                self.objects[index] = object;
                slot
            }
        };
        self.tables[trait_type.index()]
            .get_mut(slot)
            .ok_or_else(|| Error::invariant(format!("{trait_type:?} slot {slot} past table end")))
    }

    /// Sets a whole trait record, attaching the trait if the object lacks it.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the record does not fit the trait,
    /// `ObjectIndexOutOfRange`, or `CapacityExceeded`.
    pub fn set_trait(&mut self, index: usize, trait_type: TraitType, record: TraitRecord) -> Result<()> {
        self.schema.trait_schema(trait_type)?.validate_record(&record)?;
        let mut object = self.object_at(index)?;
        match object.get(trait_type) {
            Some(slot) => {
                let target = self.tables[trait_type.index()].get_mut(slot).ok_or_else(|| {
                    Error::invariant(format!("{trait_type:?} slot {slot} past table end"))
                })?;
                *target = record;
            }
            None => {
                self.attach_record(&mut object, trait_type, record)?;
                self.objects[index] = object;
            }
        }
        self.verify()
    }

    /// Detaches a trait from the object at `index`.
    ///
    /// The table's last record moves into the freed slot and the single
    /// object that referenced it is retargeted, found by a linear scan over
    /// all objects. Returns false if the object lacks the trait.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait type,
    /// `ObjectIndexOutOfRange`, or an invariant violation if no object owns
    /// the moved record.
    pub fn remove_trait(&mut self, index: usize, trait_type: TraitType) -> Result<bool> {
        self.schema.check(trait_type)?;
        let mut object = self.object_at(index)?;
        let Some(slot) = object.get(trait_type) else {
            return Ok(false);
        };
        self.detach_record(trait_type, slot)?;
        object.clear(trait_type)?;
        self.objects[index] = object;
        self.verify()?;
        Ok(true)
    }

    /// Returns the number of records in a trait's table.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the trait is outside the schema.
    pub fn table_len(&self, trait_type: TraitType) -> Result<usize> {
        self.trait_table(trait_type).map(TraitTable::len)
    }

    /// Returns a trait's table.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTraitType` if the trait is outside the schema.
    pub fn trait_table(&self, trait_type: TraitType) -> Result<&TraitTable> {
        self.schema.check(trait_type)?;
        self.tables
            .get(trait_type.index())
            .ok_or_else(|| Error::unknown_trait_type(trait_type))
    }

    // --- Fields ---

    /// Reads one field by name, or `None` if the object lacks the trait.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait or field, or
    /// `ObjectIndexOutOfRange`.
    pub fn get_field(&self, index: usize, trait_type: TraitType, field: &str) -> Result<Option<&Value>> {
        let position = self.schema.trait_schema(trait_type)?.field_index(field)?;
        Ok(self
            .get_trait(index, trait_type)?
            .and_then(|record| record.get(position)))
    }

    /// Writes one field by name, attaching the trait first if needed.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown trait or field or a value of
    /// the wrong type, `ObjectIndexOutOfRange`, or `CapacityExceeded`.
    pub fn set_field(
        &mut self,
        index: usize,
        trait_type: TraitType,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let value = value.into();
        let trait_schema = self.schema.trait_schema(trait_type)?;
        let position = trait_schema.field_index(field)?;
        trait_schema.validate_value(&trait_schema.fields[position], &value)?;
        self.get_trait_mut(index, trait_type)?.set(position, value)?;
        self.verify()
    }

    // --- Typed access ---

    /// Reads a typed trait, or `None` if the object lacks it.
    ///
    /// # Errors
    ///
    /// Returns a schema error if `T` is not registered or its record does
    /// not convert, or `ObjectIndexOutOfRange`.
    pub fn get_trait_as<T: TraitData>(&self, index: usize) -> Result<Option<T>> {
        let trait_type = self.schema.trait_type(T::NAME)?;
        self.get_trait(index, trait_type)?
            .map(T::from_record)
            .transpose()
    }

    /// Writes a typed trait, attaching it if needed.
    ///
    /// # Errors
    ///
    /// See [`set_trait`](Self::set_trait).
    pub fn set_trait_as<T: TraitData>(&mut self, index: usize, value: &T) -> Result<()> {
        let trait_type = self.schema.trait_type(T::NAME)?;
        self.set_trait(index, trait_type, value.to_record())
    }

    /// Returns true if the object has the typed trait.
    ///
    /// # Errors
    ///
    /// See [`has_trait`](Self::has_trait).
    pub fn has_trait_as<T: TraitData>(&self, index: usize) -> Result<bool> {
        let trait_type = self.schema.trait_type(T::NAME)?;
        self.has_trait(index, trait_type)
    }

    /// Detaches the typed trait.
    ///
    /// # Errors
    ///
    /// See [`remove_trait`](Self::remove_trait).
    pub fn remove_trait_as<T: TraitData>(&mut self, index: usize) -> Result<bool> {
        let trait_type = self.schema.trait_type(T::NAME)?;
        self.remove_trait(index, trait_type)
    }

    // --- Edits ---

    /// Applies one queued edit.
    ///
    /// # Errors
    ///
    /// Returns `UnknownObject` if a set edit targets a missing object, plus
    /// the errors of the underlying operation.
    pub fn apply(&mut self, edit: &StateEdit) -> Result<()> {
        match edit {
            StateEdit::AddObject { id, traits } => {
                if id.id.is_none() {
                    self.add_object(traits, id.label())?;
                } else {
                    self.add_object_with_id(traits, id.clone())?;
                }
            }
            StateEdit::RemoveObject { id } => {
                self.remove_object_by_id(*id)?;
            }
            StateEdit::SetTrait {
                id,
                trait_type,
                record,
            } => {
                let index = self.require(*id)?;
                self.set_trait(index, *trait_type, record.clone())?;
            }
            StateEdit::RemoveTrait { id, trait_type } => {
                self.schema.check(*trait_type)?;
                if let Some(index) = self.lookup(*id) {
                    self.remove_trait(index, *trait_type)?;
                }
            }
            StateEdit::SetField {
                id,
                trait_type,
                field,
                value,
            } => {
                let index = self.require(*id)?;
                self.set_field(index, *trait_type, field, value.clone())?;
            }
        }
        Ok(())
    }

    /// Applies a batch of edits in order, then checks the result once.
    ///
    /// Intermediate states inside the batch may break invariants (removing
    /// an object before clearing the relations to it); only the state after
    /// the last edit is validated, and only when `verify_invariants` is set.
    /// On error the state is left part-way through the batch, so apply to a
    /// copy when the batch must be all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns the first edit's error with context naming its position, or
    /// `InvariantViolation` if the finished state is inconsistent.
    pub fn apply_batch(&mut self, edits: &[StateEdit]) -> Result<()> {
        let verify = std::mem::replace(&mut self.config.verify_invariants, false);
        let applied = edits.iter().enumerate().try_for_each(|(position, edit)| {
            self.apply(edit)
                .map_err(|err| err.with_context(format!("edit {position}: {edit:?}")))
        });
        self.config.verify_invariants = verify;
        applied?;
        self.verify()
            .map_err(|err| err.with_context(format!("after {} edits", edits.len())))
    }

    // --- Consistency ---

    /// Checks every structural invariant of the state.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.objects.len() != self.object_ids.len() {
            return Err(Error::invariant(format!(
                "{} descriptors but {} ids",
                self.objects.len(),
                self.object_ids.len()
            )));
        }
        if self.tables.len() != self.schema.len() {
            return Err(Error::invariant(format!(
                "{} trait tables for {} trait types",
                self.tables.len(),
                self.schema.len()
            )));
        }
        if self.index.len() != self.object_ids.len() {
            return Err(Error::invariant("id index out of sync with object ids"));
        }
        for (index, id) in self.object_ids.iter().enumerate() {
            if id.id.is_none() {
                return Err(Error::invariant(format!("object {index} has the NONE id")));
            }
            if self.index.get(&id.id) != Some(&index) {
                return Err(Error::invariant(format!(
                    "id index does not map {} to slot {index}",
                    id.id
                )));
            }
        }

        let mut owners: Vec<Vec<bool>> = self.tables.iter().map(|t| vec![false; t.len()]).collect();
        for (index, object) in self.objects.iter().enumerate() {
            if object.len() != self.schema.len() {
                return Err(Error::invariant(format!(
                    "object {index} covers {} trait types, schema has {}",
                    object.len(),
                    self.schema.len()
                )));
            }
            for trait_type in object.trait_types() {
                let Some(slot) = object.get(trait_type) else {
                    continue;
                };
                let owned = owners[trait_type.index()].get_mut(slot).ok_or_else(|| {
                    Error::invariant(format!(
                        "object {index} points past the end of {trait_type:?} (slot {slot})"
                    ))
                })?;
                if *owned {
                    return Err(Error::invariant(format!(
                        "{trait_type:?} slot {slot} is referenced by more than one object"
                    )));
                }
                *owned = true;
            }
        }
        for (trait_type, slots) in self.schema.trait_types().zip(&owners) {
            if let Some(slot) = slots.iter().position(|owned| !owned) {
                return Err(Error::invariant(format!(
                    "{trait_type:?} slot {slot} is not referenced by any object"
                )));
            }
        }

        for (trait_type, trait_schema) in self.schema.iter() {
            for record in self.tables[trait_type.index()].iter() {
                for field in trait_schema.relation_fields() {
                    let target = relation(record, trait_schema, field)?;
                    if !target.is_none() && !self.index.contains_key(&target) {
                        return Err(Error::invariant(format!(
                            "{}.{} refers to missing object {target}",
                            trait_schema.name, trait_schema.fields[field].name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // --- Internals ---

    fn verify(&self) -> Result<()> {
        if self.config.verify_invariants {
            self.validate()
        } else {
            Ok(())
        }
    }

    fn check_traits(&self, traits: &[TraitType]) -> Result<()> {
        for &trait_type in traits {
            let trait_schema = self.schema.trait_schema(trait_type)?;
            self.check_capacity(trait_type, trait_schema)?;
        }
        Ok(())
    }

    fn check_capacity(&self, trait_type: TraitType, trait_schema: &TraitSchema) -> Result<()> {
        if self.tables[trait_type.index()].len() >= MAX_SLOTS {
            return Err(Error::new(ErrorKind::CapacityExceeded {
                trait_name: trait_schema.name.to_string(),
                limit: MAX_SLOTS,
            }));
        }
        Ok(())
    }

    fn require(&self, id: ObjectId) -> Result<usize> {
        self.lookup(id).ok_or_else(|| Error::unknown_object(id))
    }

    pub(crate) fn object_at(&self, index: usize) -> Result<TraitBasedObject> {
        self.objects
            .get(index)
            .copied()
            .ok_or_else(|| Error::index_out_of_range(index, self.objects.len()))
    }

    pub(crate) fn record(&self, trait_type: TraitType, slot: usize) -> Result<&TraitRecord> {
        self.tables
            .get(trait_type.index())
            .and_then(|table| table.get(slot))
            .ok_or_else(|| Error::invariant(format!("{trait_type:?} slot {slot} past table end")))
    }

    // Appends a record and points the caller's descriptor copy at it.
    fn attach_record(
        &mut self,
        object: &mut TraitBasedObject,
        trait_type: TraitType,
        record: TraitRecord,
    ) -> Result<usize> {
        self.check_capacity(trait_type, self.schema.trait_schema(trait_type)?)?;
        let slot = self.tables[trait_type.index()].push(record);
        object.set(trait_type, slot)?;
        Ok(slot)
    }

    // Swap-removes a record and retargets the one object that owned the
    // record moved into its place. The caller clears its own slot.
    fn detach_record(&mut self, trait_type: TraitType, slot: usize) -> Result<TraitRecord> {
        let removed = self.tables[trait_type.index()]
            .swap_remove(slot)
            .ok_or_else(|| Error::invariant(format!("{trait_type:?} slot {slot} past table end")))?;

        if let Some(moved_from) = removed.moved_from {
            let referrer = self
                .objects
                .iter()
                .position(|object| object.get(trait_type) == Some(moved_from))
                .ok_or_else(|| {
                    Error::invariant(format!(
                        "no object owns {trait_type:?} slot {moved_from}"
                    ))
                })?;
            let mut object = self.objects[referrer];
            object.set(trait_type, slot)?;
            self.objects[referrer] = object;
            trace!(?trait_type, from = moved_from, to = slot, object = referrer, "retargeted moved record");
        }
        Ok(removed.record)
    }
}

// Reads a relation field, failing loudly if the schema and record disagree.
pub(crate) fn relation(record: &TraitRecord, trait_schema: &TraitSchema, field: usize) -> Result<ObjectId> {
    record
        .get(field)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            Error::invariant(format!(
                "{} record has no relation at field {field}",
                trait_schema.name
            ))
        })
}

impl fmt::Debug for StateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateData")
            .field("objects", &self.objects)
            .field("object_ids", &self.object_ids)
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for StateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (object, id) in self.objects.iter().zip(&self.object_ids) {
            writeln!(f, "{id}")?;
            for trait_type in object.trait_types() {
                let (Ok(trait_schema), Some(slot)) =
                    (self.schema.trait_schema(trait_type), object.get(trait_type))
                else {
                    continue;
                };
                let Ok(record) = self.record(trait_type, slot) else {
                    writeln!(f, "  {} <missing record>", trait_schema.name)?;
                    continue;
                };
                write!(f, "  {}", trait_schema.name)?;
                if !record.is_empty() {
                    write!(f, " {{")?;
                    for (i, (field, value)) in trait_schema.fields.iter().zip(record.values()).enumerate() {
                        let sep = if i == 0 { " " } else { ", " };
                        write!(f, "{sep}{}: {value}", field.name)?;
                    }
                    write!(f, " }}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
