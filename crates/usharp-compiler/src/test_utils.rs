//! Shared helpers for the compiler test suite.

use usharp_asm::Program;

use crate::asset::{compile, CompilerContext, ProgramAsset};
use crate::bind::{bind, BindEnv, BoundClass};
use crate::diagnostics::Diagnostics;
use crate::parser;

/// Compile source through the full pipeline, panicking on any failure.
pub fn expect_program(source: &str) -> Program {
    let (_, asset) = expect_compiled(source);
    asset.program().expect("program present").clone()
}

/// Compile source, returning the context and asset for further assertions.
pub fn expect_compiled(source: &str) -> (CompilerContext, ProgramAsset) {
    let mut ctx = CompilerContext::new();
    let mut asset = ProgramAsset::new(source);
    if let Err(err) = compile(&mut ctx, &mut asset) {
        panic!(
            "compile failed: {err}\nerrors: {:#?}",
            asset.compile_errors
        );
    }
    (ctx, asset)
}

/// Bind source without emitting, panicking on failure.
pub fn expect_bound(source: &str) -> BoundClass {
    let class = parser::parse(source).expect("parse succeeds");
    let ctx = CompilerContext::new();
    let env = BindEnv {
        externs: ctx.externs(),
        behaviour_classes: ctx.behaviour_classes(),
    };
    bind(&class, &env).expect("bind succeeds")
}

/// Bind source and return the diagnostics it fails with.
pub fn expect_bind_errors(source: &str) -> Diagnostics {
    let class = parser::parse(source).expect("parse succeeds");
    let mut ctx = CompilerContext::new();
    ctx.register_behaviour_class(class.name.clone());
    let env = BindEnv {
        externs: ctx.externs(),
        behaviour_classes: ctx.behaviour_classes(),
    };
    match bind(&class, &env) {
        Ok(_) => panic!("expected binding to fail"),
        Err(diags) => diags,
    }
}
