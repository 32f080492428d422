use indoc::indoc;

use usharp_core::UdonValue;

use crate::asset::{compile, compile_all, AssetState, CompileFailure, CompilerContext, HostStatus, ProgramAsset};

const GOOD_SOURCE: &str = indoc! {r#"
    public class Good : ScriptedBehaviour
    {
        public int counter = 3;

        void Interact()
        {
            counter += 1;
        }
    }
"#};

const BAD_SOURCE: &str = indoc! {r#"
    public class Bad : ScriptedBehaviour
    {
        public Rigidbody body;
    }
"#};

#[test]
fn successful_compile_reaches_compiled_state() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    assert_eq!(asset.state(), AssetState::Uncompiled);

    compile(&mut ctx, &mut asset).unwrap();

    assert_eq!(asset.state(), AssetState::Compiled);
    assert!(asset.program().is_some());
    assert!(asset.compile_errors.is_empty());
    assert!(asset.assembly_error().is_none());
    assert_eq!(asset.class_name.as_deref(), Some("Good"));
    assert!(asset.export_assembly().is_some());
}

#[test]
fn interact_entry_point_is_detected() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();
    assert!(asset.has_interact_event());

    let mut plain = ProgramAsset::new(indoc! {r#"
        public class Plain : ScriptedBehaviour
        {
            void Start() { }
        }
    "#});
    compile(&mut ctx, &mut plain).unwrap();
    assert!(!plain.has_interact_event());
}

#[test]
fn bind_failure_keeps_previous_program() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();
    let previous = asset.program().unwrap().clone();

    asset.source = BAD_SOURCE.to_string();
    let err = compile(&mut ctx, &mut asset).unwrap_err();

    assert!(matches!(err, CompileFailure::Bind(_)));
    assert_eq!(asset.state(), AssetState::Errored);
    assert!(!asset.compile_errors.is_empty());
    // Previous program stays until a successful recompile replaces it
    assert_eq!(asset.program(), Some(&previous));
}

#[test]
fn errors_clear_on_successful_recompile() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(BAD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap_err();
    assert!(!asset.compile_errors.is_empty());

    asset.source = GOOD_SOURCE.to_string();
    compile(&mut ctx, &mut asset).unwrap();

    assert!(asset.compile_errors.is_empty());
    assert_eq!(asset.state(), AssetState::Compiled);
}

#[test]
fn auto_compile_suppression() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();

    let idle = HostStatus::default();
    assert!(asset.should_auto_compile(&idle));

    let building = HostStatus {
        is_building: true,
        ..Default::default()
    };
    assert!(!asset.should_auto_compile(&building));

    let refreshing = HostStatus {
        is_refreshing: true,
        ..Default::default()
    };
    assert!(!asset.should_auto_compile(&refreshing));

    // Outstanding errors block automatic recompilation until cleared
    asset.source = BAD_SOURCE.to_string();
    compile(&mut ctx, &mut asset).unwrap_err();
    assert!(!asset.should_auto_compile(&idle));
}

#[test]
fn public_variable_default_reads_the_heap_template() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();

    assert_eq!(
        asset.public_variable_default("counter"),
        Some(&UdonValue::Int32(3))
    );
    assert_eq!(asset.public_variable_default("missing"), None);
}

#[test]
fn behaviour_id_symbol_is_recorded() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();

    let name = asset.behaviour_id_symbol();
    assert!(asset.program().unwrap().symbols.get(name).is_some());
}

#[test]
fn compile_all_fails_units_independently() {
    let mut ctx = CompilerContext::new();
    let mut assets = vec![
        ProgramAsset::new(GOOD_SOURCE),
        ProgramAsset::new(BAD_SOURCE),
        ProgramAsset::new(indoc! {r#"
            public class Other : ScriptedBehaviour
            {
                public int value = 9;
            }
        "#}),
    ];

    let failures = compile_all(&mut ctx, &mut assets);

    assert_eq!(failures, 1);
    assert_eq!(assets[0].state(), AssetState::Compiled);
    assert_eq!(assets[1].state(), AssetState::Errored);
    assert_eq!(assets[2].state(), AssetState::Compiled);
}

#[test]
fn compile_all_resolves_cross_asset_behaviour_types() {
    let mut ctx = CompilerContext::new();
    let mut assets = vec![
        ProgramAsset::new(indoc! {r#"
            public class Door : ScriptedBehaviour
            {
                public Button opener;
            }
        "#}),
        ProgramAsset::new(indoc! {r#"
            public class Button : ScriptedBehaviour
            {
                public int presses;
            }
        "#}),
    ];

    // Door references Button before Button compiles; the name pre-pass
    // makes the order irrelevant.
    let failures = compile_all(&mut ctx, &mut assets);
    assert_eq!(failures, 0);

    let door = &assets[0];
    let def = door.field_definitions.get("opener").unwrap();
    assert_eq!(def.behaviour_source.as_deref(), Some("Button"));
}

#[test]
fn parse_failure_is_reported_with_messages() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new("public class { }");
    let err = compile(&mut ctx, &mut asset).unwrap_err();

    assert!(matches!(err, CompileFailure::Parse(_)));
    assert!(!asset.compile_errors.is_empty());
    assert_eq!(asset.state(), AssetState::Errored);
}

#[test]
fn program_blob_roundtrips_through_storage() {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(GOOD_SOURCE);
    compile(&mut ctx, &mut asset).unwrap();

    let program = asset.program().unwrap();
    let blob = program.store().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Good.uspa");
    std::fs::write(&path, &blob).unwrap();

    let reloaded = usharp_asm::Program::load(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(&reloaded, program);
}
