#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! usharp compiler: parser, binder and assembly emitter for the
//! behaviour-class dialect targeting the Udon heap VM.
//!
//! Pipeline: source class → `parser` (AST) → `bind` (typed bound form,
//! externs resolved) → `emit` (heap layout + two-pass instruction emission
//! → assembly text) → `usharp_asm::assemble` (finalized program). The
//! `asset` module owns the program-asset state machine and the compiler
//! context shared across a batch; `meta` extracts per-field metadata for
//! external inspection tooling.

pub mod asset;
pub mod bind;
pub mod diagnostics;
pub mod emit;
pub mod meta;
pub mod parser;

#[cfg(test)]
mod asset_tests;
#[cfg(test)]
mod meta_tests;
#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
pub mod test_utils;

pub use asset::{
    compile, compile_all, AssetState, CompileFailure, CompilerContext, HostStatus, ProgramAsset,
    ProgramContainer,
};
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity, Span};
pub use meta::{FieldDefinition, FieldAttribute};
