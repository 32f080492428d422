#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Assembly format and finalized program types for the target VM.
//!
//! This crate contains:
//! - The instruction set (`Opcode`, `Instruction`) and its 8-byte step encoding
//! - The text assembler: newline-delimited assembly + heap size → `Program`
//! - The finalized `Program`: instruction stream, heap template, symbol
//!   table and entry-point table, plus opaque blob persistence
//! - The per-instance `PublicVariableTable` and its mandatory refresh pass
//! - A disassembly dump and a reference interpreter used to validate
//!   compiled programs in tests

pub mod assembler;
pub mod dump;
pub mod interp;
pub mod opcode;
pub mod program;
pub mod public_vars;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod opcode_tests;
#[cfg(test)]
mod public_vars_tests;

pub use assembler::{assemble, AssemblyError, HeapFactory};
pub use dump::dump;
pub use interp::{InterpError, Interpreter};
pub use opcode::{Instruction, Opcode, HALT_ADDRESS, STEP_SIZE};
pub use program::{
    BlobError, EntryPoints, Heap, HeapSymbol, Program, SymbolTable, BLOB_MAGIC, BLOB_VERSION,
};
pub use public_vars::{PublicVariable, PublicVariableTable};
