//! End-to-end behaviour checks: compile through the full pipeline and run
//! the program on the reference interpreter.

use indoc::indoc;

use usharp_asm::Interpreter;
use usharp_core::{UdonArray, UdonType, UdonValue};

use crate::test_utils::expect_program;

#[test]
fn self_dispatched_event_accumulates_field_value() {
    let program = expect_program(indoc! {r#"
        public class Counter : ScriptedBehaviour
        {
            public int counter = 0;

            public void Foo()
            {
                counter += 5;
            }

            public void Run()
            {
                SendCustomEvent("Foo");
                SendCustomEvent("Foo");
                SendCustomEvent("Foo");
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("counter"), Some(&UdonValue::Int32(15)));
}

#[test]
fn external_dispatch_reaches_the_same_entry() {
    let program = expect_program(indoc! {r#"
        public class Counter : ScriptedBehaviour
        {
            public int counter = 0;
            public void Foo() { counter += 5; }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    for _ in 0..3 {
        interp.run_event("Foo").unwrap();
    }
    assert_eq!(interp.symbol_value("counter"), Some(&UdonValue::Int32(15)));
}

#[test]
fn parameters_pass_by_value() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int addResult;
            public int original;

            int AddIntegers(int a, int b)
            {
                ++a;
                return a + b;
            }

            public void Run()
            {
                int a = 4;
                addResult = AddIntegers(a, 6);
                original = a;
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("addResult"), Some(&UdonValue::Int32(11)));
    assert_eq!(interp.symbol_value("original"), Some(&UdonValue::Int32(4)));
}

#[test]
fn intermediate_return_values_do_not_clobber() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int result;

            int Add(int a, int b)
            {
                return a + b;
            }

            public void Run()
            {
                result = Add(2, 4) + Add(6, 9);
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("result"), Some(&UdonValue::Int32(21)));
}

#[test]
fn custom_events_through_self_reference_field() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int eventCounter;
            T selfReference;

            int GetCountAmount()
            {
                return 4;
            }

            public void IncrementCounter()
            {
                eventCounter += GetCountAmount();
            }

            public void Run()
            {
                selfReference = this;
                eventCounter = 0;
                SendCustomEvent("IncrementCounter");
                SendCustomEvent("IncrementCounter");
                SendCustomEvent("IncrementCounter");
                selfReference.SendCustomEvent("IncrementCounter");
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(
        interp.symbol_value("eventCounter"),
        Some(&UdonValue::Int32(16))
    );
}

#[test]
fn local_functions_use_private_slots() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int result;

            public void Run()
            {
                int Twice(int v)
                {
                    return v + v;
                }
                result = Twice(3) + Twice(4);
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("result"), Some(&UdonValue::Int32(14)));
}

#[test]
fn string_interpolation_set_and_clear() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public string testStr;
            public string targetVal;

            void SetStr(string val)
            {
                targetVal = val;
            }

            public void Run()
            {
                testStr = $"test {1}";
                testStr = $"";
                SetStr($"{20}");
                targetVal = targetVal + "!";
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(
        interp.symbol_value("testStr"),
        Some(&UdonValue::String(String::new()))
    );
    assert_eq!(
        interp.symbol_value("targetVal"),
        Some(&UdonValue::String("20!".to_string()))
    );
}

#[test]
fn control_flow_loops_and_short_circuits() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int sum;
            public bool inRange;
            public bool orTaken;

            public void Run()
            {
                sum = 0;
                for (int i = 0; i < 5; ++i)
                {
                    sum += i;
                }

                while (sum > 8)
                {
                    sum -= 1;
                }

                inRange = sum > 0 && sum < 10;
                orTaken = sum == 8 || sum == 99;
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("sum"), Some(&UdonValue::Int32(8)));
    assert_eq!(interp.symbol_value("inRange"), Some(&UdonValue::Bool(true)));
    assert_eq!(interp.symbol_value("orTaken"), Some(&UdonValue::Bool(true)));
}

#[test]
fn jagged_arrays_nest_without_flattening() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int picked;

            public void Run()
            {
                int[][] cells = new int[2][];
                cells[0] = new int[] { 1, 2, 3 };
                picked = cells[0][1];
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("picked"), Some(&UdonValue::Int32(2)));
}

#[test]
fn object_array_widening_holds_mixed_values() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public bool matched;

            public void Run()
            {
                object[] work = new object[] { null, this };
                matched = work[1] == this;
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("matched"), Some(&UdonValue::Bool(true)));
}

#[test]
fn public_variable_overrides_feed_the_run() {
    let program = expect_program(indoc! {r#"
        public class T : ScriptedBehaviour
        {
            public int seed = 1;
            public int result;

            public void Run()
            {
                result = seed * 10;
            }
        }
    "#});

    let mut interp = Interpreter::new(&program);
    interp.set_symbol("seed", UdonValue::Int32(7));
    interp.run_event("Run").unwrap();
    assert_eq!(interp.symbol_value("result"), Some(&UdonValue::Int32(70)));
}

#[test]
fn behaviour_array_resize_copies_references() {
    // The compiler owns the value semantics the host relies on when an
    // instance resizes a behaviour-reference array in its override table.
    let mut arr = UdonArray::from_items(
        UdonType::Behaviour(Some("T".to_string())),
        vec![UdonValue::Null, UdonValue::BehaviourRef(8)],
    );

    arr.resize(4);
    assert_eq!(arr.items[2], UdonValue::BehaviourRef(8));
    assert_eq!(arr.items[3], UdonValue::BehaviourRef(8));

    arr.resize(2);
    assert_eq!(arr.len(), 2);
}
