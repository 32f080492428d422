//! Binding failure taxonomy.

use usharp_core::ExternError;

use crate::diagnostics::Diagnostic;
use crate::Span;

/// A binding failure: the source does not lower. Carries the offending
/// span and the reason; the compile for this unit aborts, previous
/// programs stay untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BindError {
    pub span: Span,
    pub kind: BindErrorKind,
}

impl BindError {
    pub fn new(span: Span, kind: BindErrorKind) -> Self {
        Self { span, kind }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.span, self.kind.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindErrorKind {
    #[error("unsupported language feature: {0}")]
    Unsupported(String),

    #[error("type '{0}' is not resolvable against the target VM")]
    UnresolvedType(String),

    #[error("class '{0}' must derive from ScriptedBehaviour")]
    IllegalInheritance(String),

    #[error(transparent)]
    Extern(#[from] ExternError),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("'{name}' expects {expected} arguments, found {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("local function '{function}' captures enclosing local '{local}'; pass it as an argument instead")]
    Capture { function: String, local: String },

    #[error("duplicate definition of '{0}'")]
    Duplicate(String),

    #[error("event handler '{0}' must return void and take no parameters")]
    BadEventSignature(String),

    #[error("invalid attribute: {0}")]
    BadAttribute(String),

    #[error("this expression cannot be assigned to")]
    InvalidAssignTarget,

    #[error("field initializer must be a constant expression")]
    NonConstInitializer,

    #[error("expression of type void cannot be used as a value")]
    VoidValue,
}
