use indoc::indoc;

use crate::parser::ast::{BinaryOp, Expr, InterpPart, Stmt, Visibility};
use crate::parser::parse;

#[test]
fn parses_class_with_base() {
    let class = parse("public class Counter : ScriptedBehaviour { }").unwrap();
    assert_eq!(class.name, "Counter");
    assert_eq!(class.base.as_deref(), Some("ScriptedBehaviour"));
    assert!(class.fields.is_empty());
    assert!(class.methods.is_empty());
}

#[test]
fn parses_fields_with_attributes() {
    let class = parse(indoc! {r#"
        public class Door : ScriptedBehaviour
        {
            [Tooltip("Seconds until the door closes")]
            [Range(0, 30)]
            public float closeDelay = 2.5f;

            [SerializeField]
            [HideInInspector]
            private int uses;

            [Synced(linear)]
            public int health = 100;
        }
    "#})
    .unwrap();

    assert_eq!(class.fields.len(), 3);
    let delay = &class.fields[0];
    assert_eq!(delay.name, "closeDelay");
    assert_eq!(delay.visibility, Visibility::Public);
    assert_eq!(delay.attrs.len(), 2);
    assert_eq!(delay.attrs[0].name, "Tooltip");
    assert!(delay.init.is_some());

    let uses = &class.fields[1];
    assert_eq!(uses.visibility, Visibility::Private);
    assert_eq!(uses.attrs[0].name, "SerializeField");
}

#[test]
fn parses_array_and_jagged_types() {
    let class = parse(indoc! {r#"
        public class Grid : ScriptedBehaviour
        {
            public int[] row;
            public int[][] cells;
        }
    "#})
    .unwrap();

    assert_eq!(class.fields[0].ty.rank, 1);
    assert_eq!(class.fields[1].ty.rank, 2);
}

#[test]
fn parses_methods_and_params() {
    let class = parse(indoc! {r#"
        public class Math : ScriptedBehaviour
        {
            int AddIntegers(int a, int b)
            {
                return a + b;
            }
        }
    "#})
    .unwrap();

    let method = &class.methods[0];
    assert_eq!(method.name, "AddIntegers");
    assert_eq!(method.params.len(), 2);
    assert_eq!(method.ret.name, "int");
    assert!(matches!(method.body.stmts[0], Stmt::Return { .. }));
}

#[test]
fn distinguishes_locals_from_local_functions() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run()
            {
                int x = 1;
                int Helper(int v) { return v; }
                x = Helper(x);
            }
        }
    "#})
    .unwrap();

    let body = &class.methods[0].body.stmts;
    assert!(matches!(body[0], Stmt::Local { .. }));
    assert!(matches!(body[1], Stmt::LocalFunc(_)));
    assert!(matches!(body[2], Stmt::Assign { .. }));
}

#[test]
fn parses_control_flow() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run()
            {
                for (int i = 0; i < 10; ++i)
                {
                    if (i % 2 == 0) { counter += i; }
                    else { counter -= 1; }
                }
                while (counter > 0) { counter--; }
            }
            public int counter;
        }
    "#})
    .unwrap();

    let body = &class.methods[0].body.stmts;
    assert!(matches!(body[0], Stmt::For { .. }));
    assert!(matches!(body[1], Stmt::While { .. }));
}

#[test]
fn binary_precedence() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { x = 1 + 2 * 3; }
            public int x;
        }
    "#})
    .unwrap();

    let Stmt::Assign { value, .. } = &class.methods[0].body.stmts[0] else {
        panic!("expected assignment");
    };
    let Expr::Binary { op, rhs, .. } = value else {
        panic!("expected binary expression");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(**rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn parses_calls_members_and_indexing() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run()
            {
                SendCustomEvent("Foo");
                other.SendCustomEvent("Bar");
                x = values[2];
                n = values.Length;
            }
            public ScriptedBehaviour other;
            public int[] values;
            public int x;
            public int n;
        }
    "#})
    .unwrap();

    let body = &class.methods[0].body.stmts;
    assert!(matches!(
        &body[0],
        Stmt::Expr(Expr::Call { recv: None, name, .. }) if name == "SendCustomEvent"
    ));
    assert!(matches!(
        &body[1],
        Stmt::Expr(Expr::Call { recv: Some(_), .. })
    ));
    assert!(matches!(
        &body[2],
        Stmt::Assign { value: Expr::Index { .. }, .. }
    ));
    assert!(matches!(
        &body[3],
        Stmt::Assign { value: Expr::Member { .. }, .. }
    ));
}

#[test]
fn parses_new_array_forms() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run()
            {
                a = new int[4];
                b = new object[] { null, this };
                c = new int[2][];
            }
            public int[] a;
            public object[] b;
            public int[][] c;
        }
    "#})
    .unwrap();

    let body = &class.methods[0].body.stmts;
    let Stmt::Assign { value: Expr::NewArray { len, items, .. }, .. } = &body[0] else {
        panic!("expected new array");
    };
    assert!(len.is_some() && items.is_none());

    let Stmt::Assign { value: Expr::NewArray { len, items, elem, .. }, .. } = &body[1] else {
        panic!("expected initialized array");
    };
    assert!(len.is_none());
    assert_eq!(items.as_ref().unwrap().len(), 2);
    assert_eq!(elem.name, "object");

    let Stmt::Assign { value: Expr::NewArray { elem, .. }, .. } = &body[2] else {
        panic!("expected jagged array");
    };
    assert_eq!(elem.rank, 1);
}

#[test]
fn splits_string_interpolation() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { s = $"count is {x + 1}!"; }
            public string s;
            public int x;
        }
    "#})
    .unwrap();

    let Stmt::Assign { value: Expr::InterpString { parts, .. }, .. } =
        &class.methods[0].body.stmts[0]
    else {
        panic!("expected interpolated string");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], InterpPart::Text(t) if t == "count is "));
    assert!(matches!(&parts[1], InterpPart::Expr(Expr::Binary { .. })));
    assert!(matches!(&parts[2], InterpPart::Text(t) if t == "!"));
}

#[test]
fn empty_interpolation_has_no_parts() {
    let class = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { s = $""; }
            public string s;
        }
    "#})
    .unwrap();

    let Stmt::Assign { value: Expr::InterpString { parts, .. }, .. } =
        &class.methods[0].body.stmts[0]
    else {
        panic!("expected interpolated string");
    };
    assert!(parts.is_empty());
}

#[test]
fn reports_missing_semicolon() {
    let err = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            void Run() { x = 1 }
            public int x;
        }
    "#})
    .unwrap_err();
    assert!(err.has_errors());
}

#[test]
fn reports_unexpected_character() {
    let err = parse("public class T : ScriptedBehaviour { int § = 0; }").unwrap_err();
    assert!(err.has_errors());
}

#[test]
fn recovers_to_parse_later_members() {
    // The bad field produces a diagnostic; parsing still sees Run()
    let err = parse(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            int bad = ;
            void Run() { }
        }
    "#})
    .unwrap_err();
    assert_eq!(err.error_count(), 1);
}
