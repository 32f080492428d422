use crate::{Interner, Symbol};

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();

    let a = interner.intern("SystemString.__Concat__SystemString_SystemString__SystemString");
    let b = interner.intern("SystemString.__Concat__SystemString_SystemString__SystemString");
    let c = interner.intern("SystemInt32.__ToString__SystemString");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn resolve_roundtrip() {
    let mut interner = Interner::new();

    let sym = interner.intern("counter");
    assert_eq!(interner.resolve(sym), "counter");
}

#[test]
fn intern_owned_avoids_duplicate_on_hit() {
    let mut interner = Interner::new();

    let a = interner.intern("sig");
    let b = interner.intern_owned("sig".to_string());

    assert_eq!(a, b);
    assert_eq!(interner.len(), 1);
}

#[test]
fn symbol_ordering_is_insertion_order() {
    let mut interner = Interner::new();

    let z = interner.intern("z");
    let a = interner.intern("a");

    // z was inserted first, so its heap address comes first
    assert!(z < a);
    assert_eq!(z.as_u32(), 0);
    assert_eq!(a.as_u32(), 1);
}

#[test]
fn try_resolve_rejects_unknown() {
    let interner = Interner::new();
    assert_eq!(interner.try_resolve(Symbol::from_raw(7)), None);
}

#[test]
fn iter_yields_insertion_order() {
    let mut interner = Interner::new();
    let a = interner.intern("alpha");
    let b = interner.intern("beta");

    let items: Vec<_> = interner.iter().collect();
    assert_eq!(items, vec![(a, "alpha"), (b, "beta")]);
}

#[test]
fn contains_tracks_interned_strings() {
    let mut interner = Interner::new();
    interner.intern("known");

    assert!(interner.contains("known"));
    assert!(!interner.contains("unknown"));
}
