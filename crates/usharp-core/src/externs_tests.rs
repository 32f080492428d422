use crate::externs::{make_signature, NULL_VM_TYPE};
use crate::{ExternError, ExternRegistry};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn binary_op_signature() {
    let reg = ExternRegistry::builtin();
    let def = reg
        .resolve("SystemInt32", "op_Addition", &args(&["SystemInt32", "SystemInt32"]))
        .unwrap();

    assert_eq!(
        def.signature,
        "SystemInt32.__op_Addition__SystemInt32_SystemInt32__SystemInt32"
    );
    assert_eq!(def.ret, "SystemInt32");
}

#[test]
fn to_string_has_no_parameter_section() {
    let reg = ExternRegistry::builtin();
    let sig = reg.signature("SystemInt32", "ToString", &[]).unwrap();
    assert_eq!(sig, "SystemInt32.__ToString__SystemString");
}

#[test]
fn comparison_returns_boolean() {
    let reg = ExternRegistry::builtin();
    let def = reg
        .resolve("SystemDouble", "op_LessThan", &args(&["SystemDouble", "SystemDouble"]))
        .unwrap();
    assert_eq!(def.ret, "SystemBoolean");
}

#[test]
fn unknown_type_is_reported() {
    let reg = ExternRegistry::builtin();
    let err = reg
        .resolve("SystemDecimal", "op_Addition", &args(&["SystemDecimal", "SystemDecimal"]))
        .unwrap_err();
    assert_eq!(err, ExternError::UnknownType("SystemDecimal".to_string()));
}

#[test]
fn unknown_method_is_reported() {
    let reg = ExternRegistry::builtin();
    let err = reg.resolve("SystemInt32", "Parse", &args(&["SystemString"])).unwrap_err();
    assert!(matches!(err, ExternError::UnknownMethod { .. }));
}

#[test]
fn exact_overload_beats_convertible() {
    let reg = ExternRegistry::builtin();
    // Debug.Log(string) has both an object and a string overload; the
    // string argument picks the exact one.
    let def = reg
        .resolve("UnityEngineDebug", "Log", &args(&["SystemString"]))
        .unwrap();
    assert_eq!(def.params, args(&["SystemString"]));
}

#[test]
fn widening_to_object_when_single_candidate() {
    let reg = ExternRegistry::builtin();
    let def = reg
        .resolve("UnityEngineDebug", "Log", &args(&["SystemInt32"]))
        .unwrap();
    assert_eq!(def.params, args(&["SystemObject"]));
}

#[test]
fn null_argument_to_multiple_reference_overloads_is_ambiguous() {
    let reg = ExternRegistry::builtin();
    let err = reg
        .resolve("UnityEngineDebug", "Log", &args(&[NULL_VM_TYPE]))
        .unwrap_err();
    assert!(matches!(err, ExternError::Ambiguous { candidates: 2, .. }));
}

#[test]
fn array_access_externs_exist_per_element_type() {
    let reg = ExternRegistry::builtin();
    let get = reg
        .signature("SystemInt32Array", "Get", &args(&["SystemInt32"]))
        .unwrap();
    assert_eq!(get, "SystemInt32Array.__Get__SystemInt32__SystemInt32");

    let set = reg
        .signature("ScriptedBehaviourArray", "Set", &args(&["SystemInt32", "ScriptedBehaviour"]))
        .unwrap();
    assert_eq!(
        set,
        "ScriptedBehaviourArray.__Set__SystemInt32_ScriptedBehaviour__SystemVoid"
    );
}

#[test]
fn send_custom_event_extern() {
    let reg = ExternRegistry::builtin();
    let sig = reg
        .signature("ScriptedBehaviour", "SendCustomEvent", &args(&["SystemString"]))
        .unwrap();
    assert_eq!(
        sig,
        "ScriptedBehaviour.__SendCustomEvent__SystemString__SystemVoid"
    );
}

#[test]
fn load_extensions_registers_methods_and_static_alias() {
    let mut reg = ExternRegistry::builtin();
    let added = reg
        .load_extensions(
            r#"[{"type": "UnityEngineTime", "method": "get_deltaTime",
                 "params": [], "ret": "SystemSingle", "static_as": "Time"}]"#,
        )
        .unwrap();

    assert_eq!(added, 1);
    assert!(reg.has_type("UnityEngineTime"));
    assert_eq!(reg.static_class("Time"), Some("UnityEngineTime"));
    assert_eq!(
        reg.signature("UnityEngineTime", "get_deltaTime", &[]).unwrap(),
        "UnityEngineTime.__get_deltaTime__SystemSingle"
    );
}

#[test]
fn load_extensions_rejects_malformed_json() {
    let mut reg = ExternRegistry::builtin();
    assert!(matches!(
        reg.load_extensions("{not json"),
        Err(ExternError::Extension(_))
    ));
}

#[test]
fn make_signature_formats() {
    assert_eq!(
        make_signature("SystemString", "Concat", &args(&["SystemString", "SystemString"]), "SystemString"),
        "SystemString.__Concat__SystemString_SystemString__SystemString"
    );
    assert_eq!(
        make_signature("SystemInt32", "ToString", &[], "SystemString"),
        "SystemInt32.__ToString__SystemString"
    );
}
