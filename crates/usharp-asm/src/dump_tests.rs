use indoc::indoc;

use crate::assembler::assemble;
use crate::dump::dump;

#[test]
fn dump_renders_heap_entries_and_code() {
    let text = indoc! {r#"
        .data_start
            .export counter
            counter: %SystemInt32, 3
        .data_end
        .code_start
            .export _interact
            _interact:
                PUSH, counter
                EXTERN, "SystemInt32.__ToString__SystemString"
                JUMP, 0xFFFFFFFC
        .code_end
    "#};
    let program = assemble(text, 2).unwrap();

    let rendered = dump(&program);
    assert!(rendered.contains("counter: %SystemInt32 = 3 export"));
    assert!(rendered.contains("_interact -> 0x00000000"));
    assert!(rendered.contains("PUSH, counter"));
    assert!(rendered.contains("EXTERN, \"SystemInt32.__ToString__SystemString\""));
    assert!(rendered.contains("JUMP, 0xfffffffc"));
}

#[test]
fn dump_is_stable() {
    let text = indoc! {r#"
        .data_start
            x: %SystemInt32, 1
        .data_end
        .code_start
            PUSH, x
        .code_end
    "#};
    let program = assemble(text, 1).unwrap();
    assert_eq!(dump(&program), dump(&program));
}
