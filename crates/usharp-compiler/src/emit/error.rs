//! Emission failures.
//!
//! These indicate a broken internal invariant, not bad user source: the
//! binder has already validated everything the user can get wrong. An
//! emission error is fatal for the unit and leaves its previous program
//! untouched.

/// Internal invariant violation during emission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("internal: unresolved jump target (label {0})")]
    UnresolvedLabel(u32),

    #[error("internal: duplicate heap symbol '{0}'")]
    DuplicateSymbol(String),

    #[error("internal: call to unknown method '{0}'")]
    UnknownMethod(String),

    #[error("internal: unknown local slot {0}")]
    UnknownLocal(u32),

    #[error("internal: void expression in value position")]
    VoidInValue,
}
