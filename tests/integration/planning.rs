//! A small forward search driven through the state manager
//!
//! An agent walks a corridor of linked cells. Each expansion copies the
//! current state, moves the agent one cell, and keeps the result only if no
//! structurally equal state has been seen yet.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use traitstate::foundation::{ObjectId, ObjectIdAllocator, TraitBasedObjectId, TraitType, Type, Value};
use traitstate::manager::{StateHandle, StateManager};
use traitstate::storage::{Schema, StateData, StateEdit, StoreConfig, TraitSchema};

use crate::init_tracing;

const AGENT: TraitType = TraitType::new(0);
const CELL: TraitType = TraitType::new(1);

const AGENT_ID: ObjectId = ObjectId::from_raw(100);

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::builder()
            .with_trait(TraitSchema::new("Agent").with_relation("At"))
            .with_trait(
                TraitSchema::new("Cell")
                    .with_field("Dirty", Type::Bool)
                    .with_relation("Left")
                    .with_relation("Right"),
            )
            .build()
            .unwrap(),
    )
}

/// Corridor of `len` cells with the agent on the first one.
fn corridor(manager: &mut StateManager, len: u64) -> StateHandle {
    let mut edits = Vec::new();
    for raw in 1..=len {
        edits.push(StateEdit::add_object(
            TraitBasedObjectId::labeled(ObjectId::from_raw(raw), format!("cell{raw}")),
            &[CELL],
        ));
    }
    for raw in 1..=len {
        let id = ObjectId::from_raw(raw);
        if raw > 1 {
            edits.push(StateEdit::set_field(id, CELL, "Left", ObjectId::from_raw(raw - 1)));
        }
        if raw < len {
            edits.push(StateEdit::set_field(id, CELL, "Right", ObjectId::from_raw(raw + 1)));
        }
    }
    edits.push(StateEdit::add_object(
        TraitBasedObjectId::labeled(AGENT_ID, "agent"),
        &[AGENT],
    ));
    edits.push(StateEdit::set_field(AGENT_ID, AGENT, "At", ObjectId::from_raw(1)));

    let handle = manager.create();
    manager.apply_edits(handle, &edits).unwrap();
    handle
}

fn relation(state: &StateData, id: ObjectId, trait_type: TraitType, field: &str) -> ObjectId {
    let index = state.lookup(id).unwrap();
    match state.get_field(index, trait_type, field).unwrap() {
        Some(Value::Object(target)) => *target,
        other => panic!("{field} is not a relation: {other:?}"),
    }
}

/// Cells the agent can step to from where it stands.
fn moves(state: &StateData) -> Vec<ObjectId> {
    let at = relation(state, AGENT_ID, AGENT, "At");
    ["Left", "Right"]
        .into_iter()
        .map(|side| relation(state, at, CELL, side))
        .filter(|target| !target.is_none())
        .collect()
}

struct Search {
    manager: StateManager,
    buckets: HashMap<u64, Vec<StateHandle>>,
    duplicates: usize,
}

impl Search {
    fn new() -> Self {
        Self {
            manager: StateManager::with_allocator(
                schema(),
                Arc::new(ObjectIdAllocator::new()),
                StoreConfig::development(),
            ),
            buckets: HashMap::new(),
            duplicates: 0,
        }
    }

    /// Registers a state, or destroys it if an equal one is already known.
    fn admit(&mut self, handle: StateHandle) -> bool {
        let key = self.manager.key(handle).unwrap();
        let bucket = self.buckets.entry(key.content_hash).or_default();
        for &known in bucket.iter() {
            if self.manager.equals(known, handle).unwrap() {
                self.manager.destroy(handle).unwrap();
                self.duplicates += 1;
                return false;
            }
        }
        bucket.push(handle);
        true
    }

    fn run(&mut self, root: StateHandle) -> usize {
        let mut frontier = VecDeque::from([root]);
        assert!(self.admit(root));
        let mut expanded = 0;

        while let Some(handle) = frontier.pop_front() {
            expanded += 1;
            let targets = moves(self.manager.get(handle).unwrap());
            for target in targets {
                let child = self.manager.copy(handle).unwrap();
                self.manager
                    .apply_edits(child, &[StateEdit::set_field(AGENT_ID, AGENT, "At", target)])
                    .unwrap();
                if self.admit(child) {
                    frontier.push_back(child);
                }
            }
            self.manager.commit();
        }
        expanded
    }
}

#[test]
fn corridor_search_visits_each_position_once() {
    init_tracing();
    let mut search = Search::new();
    let root = corridor(&mut search.manager, 5);

    let expanded = search.run(root);

    assert_eq!(expanded, 5);
    assert_eq!(search.manager.len(), 5);
    // Every interior cell is reached again by stepping back.
    assert_eq!(search.duplicates, 4);
    assert_eq!(search.manager.pending_destruction(), 0);
}

#[test]
fn dirty_cells_split_otherwise_equal_positions() {
    init_tracing();
    let mut search = Search::new();
    let root = corridor(&mut search.manager, 3);

    let dirty = search.manager.copy(root).unwrap();
    search
        .manager
        .apply_edits(
            dirty,
            &[StateEdit::set_field(ObjectId::from_raw(2), CELL, "Dirty", true)],
        )
        .unwrap();

    assert!(!search.manager.equals(root, dirty).unwrap());
    assert!(search.admit(root));
    assert!(search.admit(dirty));

    let clean_again = search.manager.copy(dirty).unwrap();
    search
        .manager
        .apply_edits(
            clean_again,
            &[StateEdit::set_field(ObjectId::from_raw(2), CELL, "Dirty", false)],
        )
        .unwrap();
    assert!(!search.admit(clean_again));
    assert!(!search.manager.exists(clean_again));
}

#[test]
fn leased_snapshots_survive_destruction() {
    init_tracing();
    let mut search = Search::new();
    let root = corridor(&mut search.manager, 2);
    let snapshot = search.manager.lease(root).unwrap();

    search.manager.destroy(root).unwrap();
    assert_eq!(search.manager.commit(), 0);
    assert_eq!(moves(&snapshot), vec![ObjectId::from_raw(2)]);

    drop(snapshot);
    assert_eq!(search.manager.commit(), 1);
    assert!(search.manager.is_empty());
}
