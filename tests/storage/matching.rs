//! Integration tests for structural equality and hashing

use std::collections::HashSet;
use std::sync::Arc;

use traitstate_foundation::{ObjectId, ObjectIdAllocator, TraitBasedObjectId, TraitType, Type};
use traitstate_storage::{ObjectCorrespondence, Schema, StateData, StoreConfig, TraitSchema};

const AGENT: TraitType = TraitType::new(0);
const CELL: TraitType = TraitType::new(1);
const BLOCKER: TraitType = TraitType::new(2);

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .with_trait(TraitSchema::new("Agent"))
            .with_trait(
                TraitSchema::new("Cell")
                    .with_field("Type", Type::Int)
                    .with_relation("Left")
                    .with_relation("Right"),
            )
            .with_trait(TraitSchema::new("Blocker").with_field("Life", Type::Int))
            .build()
            .unwrap(),
    )
}

fn oid(raw: u64) -> ObjectId {
    ObjectId::from_raw(raw)
}

/// Builds a row of cells linked left to right, inserted in the given order.
///
/// `ids[i]` is the id of the i-th cell from the left; `order` lists the
/// positions in insertion order.
fn row(schema: &Arc<Schema>, ids: &[u64], kinds: &[i64], order: &[usize]) -> StateData {
    let mut state = StateData::with_parts(
        Arc::clone(schema),
        Arc::new(ObjectIdAllocator::new()),
        StoreConfig::release(),
    );
    for &position in order {
        state
            .add_object_with_id(&[CELL], TraitBasedObjectId::new(oid(ids[position])))
            .unwrap();
    }
    for position in 0..ids.len() {
        let index = state.lookup(oid(ids[position])).unwrap();
        state
            .set_field(index, CELL, "Type", kinds[position])
            .unwrap();
        if position > 0 {
            state
                .set_field(index, CELL, "Left", oid(ids[position - 1]))
                .unwrap();
        }
        if position + 1 < ids.len() {
            state
                .set_field(index, CELL, "Right", oid(ids[position + 1]))
                .unwrap();
        }
    }
    state.validate().unwrap();
    state
}

#[test]
fn correspondence_pairs_matching_positions() {
    let schema = schema();
    let lhs = row(&schema, &[1, 2, 3, 4], &[0, 1, 2, 3], &[0, 1, 2, 3]);
    let rhs = row(&schema, &[40, 30, 20, 10], &[0, 1, 2, 3], &[3, 1, 0, 2]);

    let map = lhs.object_correspondence(&rhs).unwrap().unwrap();
    assert_eq!(map.len(), 4);
    assert_eq!(map.get(oid(1)), Some(oid(40)));
    assert_eq!(map.get(oid(2)), Some(oid(30)));
    assert_eq!(map.get(oid(3)), Some(oid(20)));
    assert_eq!(map.get(oid(4)), Some(oid(10)));
    assert_eq!(map.get_lhs(oid(10)), Some(oid(4)));
}

#[test]
fn equal_rows_hash_alike_and_dedupe() {
    let schema = schema();
    let a = row(&schema, &[1, 2, 3], &[5, 6, 7], &[0, 1, 2]);
    let b = row(&schema, &[9, 8, 7], &[5, 6, 7], &[2, 0, 1]);
    let c = row(&schema, &[1, 2, 3], &[5, 7, 6], &[0, 1, 2]);

    assert_eq!(a, b);
    assert_eq!(a.state_hash(), b.state_hash());
    assert_ne!(a, c);

    let seen: HashSet<StateData> = [a, b, c].into_iter().collect();
    assert_eq!(seen.len(), 2);
}

#[test]
fn mirrored_row_is_different() {
    // Same cell types read right to left: every Left/Right pair is swapped.
    let schema = schema();
    let forward = row(&schema, &[1, 2, 3], &[0, 1, 2], &[0, 1, 2]);
    let mirrored = row(&schema, &[1, 2, 3], &[2, 1, 0], &[0, 1, 2]);
    assert!(!forward.equals(&mirrored));
}

#[test]
fn trait_sets_must_match() {
    let schema = schema();
    let plain = row(&schema, &[1, 2], &[0, 0], &[0, 1]);
    let mut blocked = plain.copy();
    blocked.set_field(0, BLOCKER, "Life", 1_i64).unwrap();
    let mut agent = plain.copy();
    agent.add_object(&[AGENT], None).unwrap();

    assert!(!plain.equals(&blocked));
    assert!(!plain.equals(&agent));

    // Same populations, different owners.
    let mut other = plain.copy();
    other.set_field(1, BLOCKER, "Life", 1_i64).unwrap();
    assert_eq!(blocked.state_hash(), other.state_hash());
    assert!(!blocked.equals(&other));
}

#[test]
fn unset_and_set_relations_differ() {
    let schema = schema();
    let linked = row(&schema, &[1, 2], &[0, 0], &[0, 1]);
    let mut cut = linked.copy();
    cut.set_field(0, CELL, "Right", ObjectId::NONE).unwrap();

    assert!(!linked.equals(&cut));
    assert_ne!(linked.state_hash(), cut.state_hash());
}

#[test]
fn labels_do_not_affect_equality() {
    let schema = schema();
    let ids = Arc::new(ObjectIdAllocator::new());
    let mut labeled = StateData::with_parts(
        Arc::clone(&schema),
        Arc::clone(&ids),
        StoreConfig::development(),
    );
    labeled.add_object(&[AGENT], Some("agent")).unwrap();
    let mut bare = StateData::with_parts(schema, ids, StoreConfig::release());
    bare.add_object(&[AGENT], None).unwrap();

    assert!(labeled.equals(&bare));
    assert_eq!(labeled.state_hash(), bare.state_hash());
}

#[test]
fn correspondence_can_be_reused() {
    let schema = schema();
    let a = row(&schema, &[1, 2, 3], &[0, 1, 2], &[0, 1, 2]);
    let b = row(&schema, &[4, 5, 6], &[0, 1, 2], &[2, 1, 0]);
    let c = row(&schema, &[7, 8], &[0, 1], &[0, 1]);

    let mut map = ObjectCorrespondence::new();
    assert!(a.try_get_object_mapping(&b, &mut map).unwrap());
    assert_eq!(map.len(), 3);

    assert!(!a.try_get_object_mapping(&c, &mut map).unwrap());
    assert_eq!(map.traversal_count(), 0);
    assert!(map.is_empty());

    assert!(b.try_get_object_mapping(&a, &mut map).unwrap());
    assert_eq!(map.get(oid(4)), Some(oid(1)));
}
