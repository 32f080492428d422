use usharp_core::{SyncMode, UdonType, UdonValue};

use crate::emit::layout::{HeapLayout, PlannedSymbol};
use crate::emit::EmitError;

fn planned(ty: UdonType) -> PlannedSymbol {
    PlannedSymbol {
        default: ty.default_value(),
        ty,
        exported: false,
        sync: SyncMode::NotSynced,
    }
}

#[test]
fn addresses_follow_insertion_order() {
    let mut layout = HeapLayout::new();
    assert_eq!(layout.add_symbol("a", planned(UdonType::Int32)).unwrap(), 0);
    assert_eq!(layout.add_symbol("b", planned(UdonType::Bool)).unwrap(), 1);
    assert_eq!(layout.address_of("a"), Some(0));
    assert_eq!(layout.address_of("b"), Some(1));
    assert_eq!(layout.address_of("c"), None);
}

#[test]
fn duplicate_symbol_is_an_error() {
    let mut layout = HeapLayout::new();
    layout.add_symbol("a", planned(UdonType::Int32)).unwrap();
    assert_eq!(
        layout.add_symbol("a", planned(UdonType::Int32)).unwrap_err(),
        EmitError::DuplicateSymbol("a".to_string())
    );
}

#[test]
fn heap_size_counts_symbols_plus_unique_literals() {
    let mut layout = HeapLayout::new();
    layout.add_symbol("a", planned(UdonType::Int32)).unwrap();
    layout.add_symbol("b", planned(UdonType::Int32)).unwrap();

    layout.intern_literal("SystemInt32.__op_Addition__SystemInt32_SystemInt32__SystemInt32");
    layout.intern_literal("SystemInt32.__op_Addition__SystemInt32_SystemInt32__SystemInt32");
    layout.intern_literal("SystemInt32.__ToString__SystemString");

    // Repeated literals share one slot
    assert_eq!(layout.literal_count(), 2);
    assert_eq!(layout.heap_size(), 4);
}

#[test]
fn set_default_patches_existing_symbols_only() {
    let mut layout = HeapLayout::new();
    layout.add_symbol("ret", planned(UdonType::UInt32)).unwrap();

    assert!(layout.set_default("ret", UdonValue::UInt32(0x20)));
    assert!(!layout.set_default("ghost", UdonValue::UInt32(0)));

    let (_, sym) = layout.symbols().next().unwrap();
    assert_eq!(sym.default, UdonValue::UInt32(0x20));
}

#[test]
fn two_layouts_are_independent() {
    // Contexts never share planner state; sizing is per compilation
    let mut a = HeapLayout::new();
    let mut b = HeapLayout::new();

    a.add_symbol("x", planned(UdonType::Int32)).unwrap();
    a.intern_literal("SystemInt32.__ToString__SystemString");
    b.add_symbol("y", planned(UdonType::Bool)).unwrap();

    assert_eq!(a.heap_size(), 2);
    assert_eq!(b.heap_size(), 1);
}
