//! Integration tests for field values and types

use traitstate_foundation::{ObjectId, Type, Value};

#[test]
fn defaults_per_type() {
    assert_eq!(Value::default_for(Type::Bool), Value::Bool(false));
    assert_eq!(Value::default_for(Type::Int), Value::Int(0));
    assert_eq!(Value::default_for(Type::Float), Value::Float(0.0));
    assert_eq!(Value::default_for(Type::String), Value::from(""));
    assert_eq!(
        Value::default_for(Type::Object),
        Value::Object(ObjectId::NONE)
    );
}

#[test]
fn relation_type() {
    assert!(Value::from(ObjectId::from_raw(1)).value_type().is_relation());
    assert!(!Value::Int(1).value_type().is_relation());
}

#[test]
fn float_equality_is_bitwise() {
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
}

#[test]
fn display() {
    assert_eq!(Value::from("red").to_string(), "red");
    assert_eq!(Value::Int(-4).to_string(), "-4");
    assert_eq!(Value::from(ObjectId::from_raw(2)).to_string(), "#2");
    assert_eq!(format!("{:?}", Value::from("red")), "\"red\"");
}
