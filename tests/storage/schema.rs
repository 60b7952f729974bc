//! Integration tests for schema construction and lookup

use traitstate_foundation::{ErrorKind, TraitType, Type};
use traitstate_storage::{MAX_TRAIT_TYPES, Schema, TraitSchema};

fn match3() -> Schema {
    Schema::builder()
        .with_trait(
            TraitSchema::new("Game")
                .with_field("MoveCount", Type::Int)
                .with_field("Score", Type::Int)
                .with_field("GoalType", Type::Int)
                .with_field("GoalCount", Type::Int),
        )
        .with_trait(
            TraitSchema::new("Cell")
                .with_field("Type", Type::Int)
                .with_relation("Left")
                .with_relation("Right")
                .with_relation("Top")
                .with_relation("Bottom"),
        )
        .with_trait(
            TraitSchema::new("Coordinate")
                .with_field("X", Type::Int)
                .with_field("Y", Type::Int),
        )
        .with_trait(TraitSchema::new("Blocker").with_field("Life", Type::Int))
        .with_trait(TraitSchema::new("PlanningAgent"))
        .build()
        .unwrap()
}

#[test]
fn trait_types_follow_declaration_order() {
    let schema = match3();
    assert_eq!(schema.len(), 5);
    assert_eq!(schema.trait_type("Game").unwrap(), TraitType::new(0));
    assert_eq!(schema.trait_type("PlanningAgent").unwrap(), TraitType::new(4));
}

#[test]
fn relation_fields_are_listed() {
    let schema = match3();
    let cell = schema
        .trait_schema(schema.trait_type("Cell").unwrap())
        .unwrap();
    assert_eq!(cell.relation_fields().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    let coordinate = schema
        .trait_schema(schema.trait_type("Coordinate").unwrap())
        .unwrap();
    assert!(!coordinate.has_relations());
}

#[test]
fn unknown_names_are_schema_errors() {
    let schema = match3();
    let err = schema.trait_type("Door").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownTrait(_)));

    let err = schema.trait_schema(TraitType::new(5)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownTraitType(_)));
}

#[test]
fn malformed_schemas_are_rejected() {
    let empty_name = Schema::builder().with_trait(TraitSchema::new("")).build();
    assert!(empty_name.is_err());

    let empty_field = Schema::builder()
        .with_trait(TraitSchema::new("Cell").with_field("", Type::Int))
        .build();
    assert!(empty_field.is_err());

    let mut builder = Schema::builder();
    for i in 0..MAX_TRAIT_TYPES {
        builder = builder.with_trait(TraitSchema::new(format!("T{i}")));
    }
    assert!(builder.clone().build().is_ok());
    let err = builder
        .with_trait(TraitSchema::new("Extra"))
        .build()
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidSchema(_)));
}
