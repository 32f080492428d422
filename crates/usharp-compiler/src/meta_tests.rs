use indoc::indoc;

use usharp_core::{SyncMode, UdonType};

use crate::meta::{extract, FieldAttribute};
use crate::test_utils::{expect_bound, expect_compiled};

#[test]
fn every_exported_symbol_has_exactly_one_definition() {
    let (_, asset) = expect_compiled(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int a;
            public float b;
            [HideInInspector]
            public string c;
            private int internal_counter;
        }
    "#});

    let program = asset.program().unwrap();
    let exported: Vec<&str> = program.symbols.exported_symbols().collect();

    // Round-trip: exported symbols and field definitions match one-to-one
    assert_eq!(exported.len(), asset.field_definitions.len());
    for symbol in &exported {
        assert!(asset.field_definitions.contains_key(*symbol));
    }

    // Hidden fields keep a definition but flag themselves
    let hidden: Vec<&str> = asset
        .field_definitions
        .values()
        .filter(|d| d.is_hidden())
        .map(|d| d.symbol.as_str())
        .collect();
    assert_eq!(hidden, vec!["c"]);

    // Private fields never appear
    assert!(!asset.field_definitions.contains_key("internal_counter"));
}

#[test]
fn attributes_carry_widget_constraints() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            [Header("Motion")]
            [Tooltip("Units per second")]
            [Range(0, 10)]
            public float speed;

            [Space(20)]
            [ColorUsage(true, true)]
            public Color tint;

            [GradientUsage(true)]
            [TextArea]
            public string notes;
        }
    "#});
    let defs = extract(&class);

    let speed = defs.get("speed").unwrap();
    assert_eq!(speed.tooltip(), Some("Units per second"));
    assert_eq!(speed.range(), Some((0.0, 10.0)));
    assert!(speed
        .attributes
        .iter()
        .any(|a| matches!(a, FieldAttribute::Header(h) if h == "Motion")));

    let tint = defs.get("tint").unwrap();
    assert!(tint
        .attributes
        .iter()
        .any(|a| matches!(a, FieldAttribute::ColorUsage { show_alpha: true, hdr: true })));
    assert!(tint
        .attributes
        .iter()
        .any(|a| matches!(a, FieldAttribute::Space(v) if *v == 20.0)));

    let notes = defs.get("notes").unwrap();
    assert!(notes
        .attributes
        .iter()
        .any(|a| matches!(a, FieldAttribute::GradientUsage { hdr: true })));
    assert!(notes
        .attributes
        .iter()
        .any(|a| matches!(a, FieldAttribute::TextArea)));
}

#[test]
fn behaviour_source_narrows_to_the_originating_class() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public ScriptedBehaviour any;
            public T specific;
            public T[] specificArray;
        }
    "#});
    let defs = extract(&class);

    // Base capability: no narrowing, validators accept any behaviour
    assert_eq!(defs.get("any").unwrap().behaviour_source, None);

    // Subtype: narrowed to the originating class
    assert_eq!(
        defs.get("specific").unwrap().behaviour_source.as_deref(),
        Some("T")
    );

    // Arrays narrow by element type
    let arr = defs.get("specificArray").unwrap();
    assert_eq!(arr.behaviour_source.as_deref(), Some("T"));
    assert_eq!(arr.ty, UdonType::array_of(UdonType::Behaviour(Some("T".to_string()))));
}

#[test]
fn sync_mode_is_recorded_not_altered() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            [Synced]
            public int plain;
            [Synced(linear)]
            public int smooth_counter;
            public int local_only;
        }
    "#});
    let defs = extract(&class);

    assert_eq!(defs.get("plain").unwrap().sync, SyncMode::None);
    assert_eq!(defs.get("smooth_counter").unwrap().sync, SyncMode::Linear);
    assert_eq!(defs.get("local_only").unwrap().sync, SyncMode::NotSynced);
}

#[test]
fn definitions_rebuild_wholesale_on_recompile() {
    let (mut ctx, mut asset) = expect_compiled(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int alpha;
            public int beta;
        }
    "#});
    assert_eq!(asset.field_definitions.len(), 2);

    asset.source = indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int beta;
        }
    "#}
    .to_string();
    crate::asset::compile(&mut ctx, &mut asset).unwrap();

    assert_eq!(asset.field_definitions.len(), 1);
    assert!(asset.field_definitions.contains_key("beta"));
    assert!(!asset.field_definitions.contains_key("alpha"));
}
