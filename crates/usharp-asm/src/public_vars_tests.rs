use indoc::indoc;

use usharp_core::UdonValue;

use crate::assembler::assemble;
use crate::program::Program;
use crate::public_vars::PublicVariableTable;

fn exported_program() -> Program {
    let text = indoc! {r#"
        .data_start
            .export counter
            counter: %SystemInt32, 10
            .export door
            door: %ScriptedBehaviour, null
            secret: %SystemInt32, 0
        .data_end
        .code_start
        .code_end
    "#};
    assemble(text, 3).unwrap()
}

#[test]
fn unknown_key_is_pruned_and_dirty_set() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    table.set("counter", "SystemInt32", UdonValue::Int32(3));
    table.set("removed_field", "SystemInt32", UdonValue::Int32(9));

    let dirty = table.refresh(&program);

    assert!(dirty);
    assert!(!table.contains("removed_field"));
    assert!(table.contains("counter"));
}

#[test]
fn non_exported_symbol_is_pruned() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    table.set("secret", "SystemInt32", UdonValue::Int32(1));

    assert!(table.refresh(&program));
    assert!(table.is_empty());
}

#[test]
fn type_mismatch_resets_to_compiled_default() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    // Recorded under a stale type: the field used to be a float
    table.set("counter", "SystemSingle", UdonValue::Single(1.5));

    let dirty = table.refresh(&program);

    assert!(dirty);
    let var = table.get("counter").unwrap();
    assert_eq!(var.vm_type, "SystemInt32");
    assert_eq!(var.value, UdonValue::Int32(10));
}

#[test]
fn null_behaviour_reference_is_pruned() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    table.set("door", "ScriptedBehaviour", UdonValue::Null);

    assert!(table.refresh(&program));
    assert!(!table.contains("door"));
}

#[test]
fn non_null_behaviour_reference_survives() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    table.set("door", "ScriptedBehaviour", UdonValue::BehaviourRef(12));

    assert!(!table.refresh(&program));
    assert_eq!(
        table.get("door").unwrap().value,
        UdonValue::BehaviourRef(12)
    );
}

#[test]
fn matching_entries_leave_table_clean() {
    let program = exported_program();
    let mut table = PublicVariableTable::new();
    table.set("counter", "SystemInt32", UdonValue::Int32(42));

    let dirty = table.refresh(&program);

    assert!(!dirty);
    assert_eq!(table.get("counter").unwrap().value, UdonValue::Int32(42));
}
