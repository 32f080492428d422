//! Binder/lowering pass.
//!
//! Walks a parsed class and produces a typed bound form ready for
//! emission: fields with constant defaults, methods with flat local slots,
//! statements lowered to assignment/branch/loop/return, and every
//! operator, conversion and host call resolved to an extern signature
//! against the registry. The emitter never consults the registry.
//!
//! # Module Organization
//!
//! - `ir`: bound tree types
//! - `types`: source type resolution and assembler-level erasure
//! - `binder`: the pass itself (fields, methods, statements, expressions)
//! - `error`: binding failure taxonomy

mod binder;
mod error;
mod ir;
mod types;

#[cfg(test)]
mod bind_tests;

pub use binder::{bind, BindEnv};
pub use error::{BindError, BindErrorKind};
pub use ir::{
    BoundClass, BoundExpr, BoundField, BoundMethod, BoundStmt, BoundTarget, LocalId, LocalSlot,
};
pub use types::{resolve_type, udon_type_from_vm};
