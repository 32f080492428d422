use crate::{SyncMode, UdonType};

#[test]
fn assembler_type_names() {
    assert_eq!(UdonType::Int32.assembler_type(), "SystemInt32");
    assert_eq!(
        UdonType::array_of(UdonType::Single).assembler_type(),
        "SystemSingleArray"
    );
    assert_eq!(
        UdonType::Behaviour(Some("Door".into())).assembler_type(),
        "ScriptedBehaviour"
    );
    assert_eq!(
        UdonType::array_of(UdonType::Behaviour(None)).assembler_type(),
        "ScriptedBehaviourArray"
    );
}

#[test]
fn jagged_arrays_erase_to_object_array() {
    let jagged = UdonType::array_of(UdonType::array_of(UdonType::Int32));
    assert!(jagged.is_jagged());
    assert_eq!(jagged.assembler_type(), "SystemObjectArray");
    // never the element array's own array-of-array type
    assert_ne!(jagged.assembler_type(), "SystemInt32ArrayArray");
}

#[test]
fn plain_arrays_are_not_jagged() {
    assert!(!UdonType::array_of(UdonType::Int32).is_jagged());
    assert!(!UdonType::Int32.is_jagged());
}

#[test]
fn base_type_unwraps_nested_arrays() {
    let jagged = UdonType::array_of(UdonType::array_of(UdonType::String));
    assert_eq!(jagged.base_type(), &UdonType::String);
}

#[test]
fn reference_and_numeric_classification() {
    assert!(UdonType::String.is_reference());
    assert!(UdonType::Behaviour(None).is_reference());
    assert!(!UdonType::Int32.is_reference());
    assert!(UdonType::Double.is_numeric());
    assert!(!UdonType::Bool.is_numeric());
}

#[test]
fn sync_mode_parse_display_roundtrip() {
    for mode in [
        SyncMode::NotSynced,
        SyncMode::None,
        SyncMode::Linear,
        SyncMode::Smooth,
    ] {
        assert_eq!(SyncMode::parse(&mode.to_string()), Some(mode));
    }
    assert_eq!(SyncMode::parse("reliable"), None);
}
