//! Scenario tests for structural equality

use std::sync::Arc;

use traitstate::foundation::{ObjectId, ObjectIdAllocator, TraitBasedObjectId, TraitType, Value};
use traitstate::storage::{Schema, StateData, StoreConfig, TraitSchema};

use crate::init_tracing;

const AGENT: TraitType = TraitType::new(0);
const CELL: TraitType = TraitType::new(1);

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .with_trait(TraitSchema::new("Agent"))
            .with_trait(
                TraitSchema::new("Cell")
                    .with_relation("Left")
                    .with_relation("Right"),
            )
            .build()
            .unwrap(),
    )
}

fn empty(schema: &Arc<Schema>) -> StateData {
    StateData::with_parts(
        Arc::clone(schema),
        Arc::new(ObjectIdAllocator::new()),
        StoreConfig::development(),
    )
}

fn oid(raw: u64) -> ObjectId {
    ObjectId::from_raw(raw)
}

fn add(state: &mut StateData, raw: u64, traits: &[TraitType]) -> usize {
    state
        .add_object_with_id(traits, TraitBasedObjectId::new(oid(raw)))
        .unwrap()
        .0
}

fn link(state: &mut StateData, raw: u64, field: &str, target: u64) {
    let index = state.lookup(oid(raw)).unwrap();
    state.set_field(index, CELL, field, oid(target)).unwrap();
}

/// Agent 1, then cells 2 and 3 linked 2 -> 3.
fn two_cells(schema: &Arc<Schema>) -> StateData {
    let mut state = empty(schema);
    add(&mut state, 1, &[AGENT]);
    add(&mut state, 2, &[CELL]);
    add(&mut state, 3, &[CELL]);
    link(&mut state, 2, "Right", 3);
    link(&mut state, 3, "Left", 2);
    state
}

#[test]
fn relabeled_and_reordered_states_are_equal() {
    init_tracing();
    let schema = schema();
    let s = two_cells(&schema);

    let mut relabeled = empty(&schema);
    add(&mut relabeled, 20, &[CELL]);
    add(&mut relabeled, 22, &[AGENT]);
    add(&mut relabeled, 21, &[CELL]);
    link(&mut relabeled, 20, "Right", 21);
    link(&mut relabeled, 21, "Left", 20);

    assert!(s.equals(&relabeled));
    assert!(relabeled.equals(&s));
    assert_eq!(s.state_hash(), relabeled.state_hash());

    let map = s.object_correspondence(&relabeled).unwrap().unwrap();
    assert_eq!(map.get(oid(1)), Some(oid(22)));
    assert_eq!(map.get(oid(2)), Some(oid(20)));
    assert_eq!(map.get(oid(3)), Some(oid(21)));
}

#[test]
fn reversed_relation_is_unequal() {
    init_tracing();
    let schema = schema();
    let s = two_cells(&schema);

    // Cell 3 points right at 2 instead of left.
    let mut reversed = empty(&schema);
    add(&mut reversed, 1, &[AGENT]);
    add(&mut reversed, 2, &[CELL]);
    add(&mut reversed, 3, &[CELL]);
    link(&mut reversed, 2, "Right", 3);
    link(&mut reversed, 3, "Right", 2);

    assert!(!s.equals(&reversed));
    assert!(!reversed.equals(&s));
}

#[test]
fn cycles_terminate() {
    init_tracing();
    let schema = schema();
    let mut a = empty(&schema);
    add(&mut a, 1, &[CELL]);
    add(&mut a, 2, &[CELL]);
    link(&mut a, 1, "Right", 2);
    link(&mut a, 2, "Left", 1);
    link(&mut a, 1, "Left", 2);
    link(&mut a, 2, "Right", 1);

    let mut b = empty(&schema);
    add(&mut b, 50, &[CELL]);
    add(&mut b, 40, &[CELL]);
    link(&mut b, 40, "Right", 50);
    link(&mut b, 50, "Left", 40);
    link(&mut b, 40, "Left", 50);
    link(&mut b, 50, "Right", 40);

    assert!(a.equals(&b));
    assert_eq!(a.state_hash(), b.state_hash());

    // A self loop is a different graph.
    let mut looped = empty(&schema);
    add(&mut looped, 1, &[CELL]);
    add(&mut looped, 2, &[CELL]);
    link(&mut looped, 1, "Right", 1);
    link(&mut looped, 1, "Left", 1);
    link(&mut looped, 2, "Right", 2);
    link(&mut looped, 2, "Left", 2);
    assert!(!a.equals(&looped));
}

#[test]
fn population_mismatch_skips_the_search() {
    init_tracing();
    let schema = schema();
    let s = two_cells(&schema);
    let mut bigger = s.copy();
    add(&mut bigger, 4, &[CELL]);

    let mut map = traitstate::storage::ObjectCorrespondence::new();
    assert!(!s.try_get_object_mapping(&bigger, &mut map).unwrap());
    assert_eq!(map.traversal_count(), 0);

    // Same object count, different trait populations.
    let mut swapped = s.copy();
    let agent = swapped.lookup(oid(1)).unwrap();
    swapped.remove_trait(agent, AGENT).unwrap();
    swapped
        .set_field(agent, CELL, "Left", ObjectId::NONE)
        .unwrap();
    assert!(!s.try_get_object_mapping(&swapped, &mut map).unwrap());
    assert_eq!(map.traversal_count(), 0);
}

#[test]
fn swap_remove_keeps_the_moved_record() {
    init_tracing();
    let schema = schema();
    let mut state = empty(&schema);
    for raw in 1..=3 {
        add(&mut state, raw, &[CELL]);
    }
    link(&mut state, 3, "Left", 2);

    let last = state.lookup(oid(3)).unwrap();
    assert_eq!(state.object(last).unwrap().get(CELL), Some(2));

    let first = state.lookup(oid(1)).unwrap();
    assert!(state.remove_trait(first, CELL).unwrap());

    let moved = state.object(last).unwrap();
    assert_eq!(moved.get(CELL), Some(0));
    assert_eq!(
        state.get_field(last, CELL, "Left").unwrap(),
        Some(&Value::Object(oid(2)))
    );
    assert_eq!(state.table_len(CELL).unwrap(), 2);
    state.validate().unwrap();
}

#[test]
fn add_then_remove_trait_restores_layout() {
    init_tracing();
    let schema = schema();
    let mut state = two_cells(&schema);
    let agent = state.lookup(oid(1)).unwrap();
    let before = state.object(agent).unwrap();
    let cells = state.table_len(CELL).unwrap();

    state.set_field(agent, CELL, "Right", oid(2)).unwrap();
    assert_eq!(state.table_len(CELL).unwrap(), cells + 1);
    assert!(state.remove_trait(agent, CELL).unwrap());

    assert_eq!(state.object(agent).unwrap(), before);
    assert_eq!(state.table_len(CELL).unwrap(), cells);
    assert!(state.equals(&two_cells(&schema)));
}

#[test]
fn copies_match_their_source() {
    init_tracing();
    let schema = schema();
    let s = two_cells(&schema);
    let copy = s.copy();
    assert!(s.equals(&copy));
    assert_eq!(s.state_hash(), copy.state_hash());
    assert_eq!(copy.to_string(), s.to_string());
}
