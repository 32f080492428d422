use indoc::indoc;

use usharp_core::{SyncMode, UdonType, UdonValue};

use crate::test_utils::{expect_bind_errors, expect_bound};

#[test]
fn binds_fields_with_defaults_and_sync() {
    let class = expect_bound(indoc! {r#"
        public class Door : ScriptedBehaviour
        {
            public int health = 100;
            [Synced]
            public float speed = 1.5f;
            [Synced(smooth)]
            public double angle;
            private string label = "door";
            [SerializeField]
            private bool locked;
        }
    "#});

    let health = &class.fields[0];
    assert_eq!(health.ty, UdonType::Int32);
    assert_eq!(health.default, UdonValue::Int32(100));
    assert!(health.exported);
    assert_eq!(health.sync, SyncMode::NotSynced);

    assert_eq!(class.fields[1].sync, SyncMode::None);
    assert_eq!(class.fields[2].sync, SyncMode::Smooth);

    let label = &class.fields[3];
    assert!(!label.exported);
    assert_eq!(label.default, UdonValue::String("door".to_string()));

    // SerializeField exports a private field
    assert!(class.fields[4].exported);
}

#[test]
fn literal_widening_in_field_initializers() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public long big = 5;
            public double ratio = -2;
            public float f = 3f;
        }
    "#});

    assert_eq!(class.fields[0].default, UdonValue::Int64(5));
    assert_eq!(class.fields[1].default, UdonValue::Double(-2.0));
    assert_eq!(class.fields[2].default, UdonValue::Single(3.0));
}

#[test]
fn missing_base_is_illegal_inheritance() {
    let diags = expect_bind_errors("public class T { }");
    assert!(diags.messages()[0].contains("must derive from ScriptedBehaviour"));
}

#[test]
fn wrong_base_is_illegal_inheritance() {
    let diags = expect_bind_errors("public class T : MonoBehaviour { }");
    assert!(diags.messages()[0].contains("must derive from ScriptedBehaviour"));
}

#[test]
fn unresolved_type_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public Quaternion rotation;
        }
    "#});
    assert!(diags.messages()[0].contains("'Quaternion' is not resolvable"));
}

#[test]
fn behaviour_field_types_resolve_to_known_classes() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public ScriptedBehaviour any;
            public T self;
        }
    "#});

    assert_eq!(class.fields[0].ty, UdonType::Behaviour(None));
    assert_eq!(
        class.fields[1].ty,
        UdonType::Behaviour(Some("T".to_string()))
    );
}

#[test]
fn entry_points_for_events_and_public_methods() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Start() { }
            void Interact() { }
            public void Ping() { }
            void Helper() { }
        }
    "#});

    assert_eq!(class.methods[0].entry_point.as_deref(), Some("_start"));
    assert_eq!(class.methods[1].entry_point.as_deref(), Some("_interact"));
    assert_eq!(class.methods[2].entry_point.as_deref(), Some("Ping"));
    assert_eq!(class.methods[3].entry_point, None);
}

#[test]
fn event_handler_with_parameters_is_rejected() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Start(int x) { }
        }
    "#});
    assert!(diags.messages()[0].contains("'Start' must return void"));
}

#[test]
fn local_functions_are_hoisted_and_private() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public void Run()
            {
                int x = Helper(4);
                int Helper(int v) { return v + 1; }
            }
        }
    "#});

    assert_eq!(class.methods.len(), 2);
    let helper = class.method("Run__Helper").expect("hoisted local function");
    assert_eq!(helper.entry_point, None);
    assert_eq!(helper.param_count, 1);
}

#[test]
fn local_function_capture_is_rejected() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run()
            {
                int outside = 3;
                int Helper() { return outside; }
            }
        }
    "#});
    assert!(
        diags.messages()[0].contains("captures enclosing local 'outside'"),
        "got: {:?}",
        diags.messages()
    );
}

#[test]
fn local_functions_may_use_fields() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            int total;
            void Run()
            {
                int Helper() { return total; }
            }
        }
    "#});
    assert!(class.method("Run__Helper").is_some());
}

#[test]
fn ambiguous_overload_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { Debug.Log(null); }
        }
    "#});
    assert!(diags.messages()[0].contains("ambiguous"));
}

#[test]
fn unknown_identifier_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { x = 1; }
        }
    "#});
    assert!(diags.messages()[0].contains("unknown identifier 'x'"));
}

#[test]
fn condition_must_be_bool() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { if (1) { } }
        }
    "#});
    assert!(diags.messages()[0].contains("expected bool"));
}

#[test]
fn self_send_custom_event_resolves_at_compile_time() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public void Bump() { }
            void Run() { SendCustomEvent("Bump"); }
        }
    "#});

    let run = class.method("Run").unwrap();
    assert!(matches!(
        &run.body[0],
        crate::bind::BoundStmt::Expr(crate::bind::BoundExpr::CallMethod { method, .. })
            if method == "Bump"
    ));
}

#[test]
fn unknown_custom_event_name_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { SendCustomEvent("Missing"); }
        }
    "#});
    assert!(diags.messages()[0].contains("unknown method 'Missing'"));
}

#[test]
fn dynamic_event_name_dispatches_at_runtime() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public string eventName;
            void Run() { SendCustomEvent(eventName); }
        }
    "#});

    let run = class.method("Run").unwrap();
    assert!(matches!(
        &run.body[0],
        crate::bind::BoundStmt::Expr(crate::bind::BoundExpr::CallExtern { signature, .. })
            if signature.contains("SendCustomEvent")
    ));
}

#[test]
fn behaviour_receiver_dispatches_through_extern() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public ScriptedBehaviour other;
            void Run() { other.SendCustomEvent("Ping"); }
        }
    "#});

    let run = class.method("Run").unwrap();
    assert!(matches!(
        &run.body[0],
        crate::bind::BoundStmt::Expr(crate::bind::BoundExpr::CallExtern { .. })
    ));
}

#[test]
fn other_behaviour_methods_are_unsupported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public ScriptedBehaviour other;
            void Run() { other.Reset(); }
        }
    "#});
    assert!(diags.messages()[0].contains("unsupported"));
}

#[test]
fn jagged_array_binds_distinctly() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int[][] cells;
        }
    "#});

    let ty = &class.fields[0].ty;
    assert!(ty.is_jagged());
    assert_eq!(ty.assembler_type(), "SystemObjectArray");
}

#[test]
fn object_array_widens_heterogeneous_items() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public object[] work;
            void Run() { work = new object[] { null, this, 5 }; }
        }
    "#});

    let run = class.method("Run").unwrap();
    let crate::bind::BoundStmt::Assign { value, .. } = &run.body[0] else {
        panic!("expected assignment");
    };
    let crate::bind::BoundExpr::NewArray { items, ty, .. } = value else {
        panic!("expected array creation");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(*ty, UdonType::array_of(UdonType::Object));
}

#[test]
fn string_interpolation_lowers_to_concat_and_tostring() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public string s;
            public int x;
            void Run() { s = $"value {x}"; }
        }
    "#});

    let run = class.method("Run").unwrap();
    let crate::bind::BoundStmt::Assign { value, .. } = &run.body[0] else {
        panic!("expected assignment");
    };
    let crate::bind::BoundExpr::Binary { signature, rhs, .. } = value else {
        panic!("expected concat, got {value:?}");
    };
    assert!(signature.contains("Concat"));
    assert!(matches!(
        &**rhs,
        crate::bind::BoundExpr::CallExtern { signature, .. } if signature.contains("ToString")
    ));
}

#[test]
fn interpolation_without_holes_is_a_plain_literal() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public string s;
            void Run() { s = $"no interpolation here"; }
        }
    "#});

    let run = class.method("Run").unwrap();
    assert!(matches!(
        &run.body[0],
        crate::bind::BoundStmt::Assign {
            value: crate::bind::BoundExpr::Literal { value: UdonValue::String(s), .. },
            ..
        } if s == "no interpolation here"
    ));
}

#[test]
fn type_mismatch_in_assignment_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int x;
            void Run() { x = "five"; }
        }
    "#});
    assert!(diags.messages()[0].contains("type mismatch"));
}

#[test]
fn arity_mismatch_is_reported() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            int Add(int a, int b) { return a + b; }
            void Run() { x = Add(1); }
            public int x;
        }
    "#});
    assert!(diags.messages()[0].contains("expects 2 arguments, found 1"));
}

#[test]
fn non_constant_field_initializer_is_rejected() {
    let diags = expect_bind_errors(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int x = 1 + 2;
        }
    "#});
    assert!(diags.messages()[0].contains("constant expression"));
}

#[test]
fn comparing_behaviour_against_object_binds_as_reference_equality() {
    let class = expect_bound(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public object[] work;
            public bool same;
            void Run() { same = work[0] == this; }
        }
    "#});

    let run = class.method("Run").unwrap();
    let crate::bind::BoundStmt::Assign { value, .. } = &run.body[0] else {
        panic!("expected assignment");
    };
    let crate::bind::BoundExpr::Binary { signature, .. } = value else {
        panic!("expected comparison");
    };
    assert!(signature.starts_with("SystemObject.__op_Equality"));
}
