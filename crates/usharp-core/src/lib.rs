#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by the usharp compiler and assembler.
//!
//! Three layers:
//! - **Type/value model**: `UdonType`, `UdonValue`, `SyncMode` — the target
//!   VM's view of data, including the assembler-level type names used in
//!   the data section of emitted programs.
//! - **Interner**: cheap `Symbol` handles for deduplicated strings (extern
//!   signature literals share heap slots by value).
//! - **Extern registry**: the host VM's binding surface — operator, method
//!   and conversion extern signatures the compiler resolves against.

mod interner;
pub mod externs;
pub mod types;
pub mod value;

#[cfg(test)]
mod externs_tests;
#[cfg(test)]
mod interner_tests;
#[cfg(test)]
mod types_tests;

pub use externs::{ExternDef, ExternError, ExternRegistry};
pub use interner::{Interner, Symbol};
pub use types::{SyncMode, UdonType};
pub use value::{UdonArray, UdonValue};
