//! Bound tree: the target-agnostic lowered form handed to the emitter.
//!
//! All names are resolved, all types checked, and every operator or host
//! call carries its extern signature. Local slots are flat per method;
//! `LocalId` indexes into `BoundMethod::locals`.

use usharp_core::{SyncMode, UdonType, UdonValue};

use crate::meta::FieldAttribute;
use crate::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct BoundClass {
    pub name: String,
    pub fields: Vec<BoundField>,
    /// Methods in declaration order; hoisted local functions follow their
    /// owner.
    pub methods: Vec<BoundMethod>,
}

impl BoundClass {
    pub fn method(&self, name: &str) -> Option<&BoundMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundField {
    pub name: String,
    pub ty: UdonType,
    /// Constant default baked into the heap template.
    pub default: UdonValue,
    pub exported: bool,
    pub sync: SyncMode,
    pub attributes: Vec<FieldAttribute>,
    pub span: Span,
}

/// Index into a method's local slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct LocalSlot {
    pub name: String,
    pub ty: UdonType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundMethod {
    /// Internal name; local functions are mangled `Owner__Name`.
    pub name: String,
    /// Exported entry-point name, when externally dispatchable.
    pub entry_point: Option<String>,
    pub ret: UdonType,
    /// The first `param_count` locals are the parameters.
    pub param_count: usize,
    pub locals: Vec<LocalSlot>,
    pub body: Vec<BoundStmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundTarget {
    Local(LocalId),
    Field(String),
    Index {
        arr: BoundExpr,
        index: BoundExpr,
        set_signature: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundStmt {
    Assign {
        target: BoundTarget,
        value: BoundExpr,
    },
    If {
        cond: BoundExpr,
        then: Vec<BoundStmt>,
        els: Vec<BoundStmt>,
    },
    While {
        cond: BoundExpr,
        body: Vec<BoundStmt>,
    },
    Return {
        value: Option<BoundExpr>,
    },
    Expr(BoundExpr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundExpr {
    Literal {
        value: UdonValue,
        ty: UdonType,
    },
    Local {
        id: LocalId,
        ty: UdonType,
    },
    Field {
        name: String,
        ty: UdonType,
    },
    This {
        ty: UdonType,
    },
    /// Extern-resolved binary operator.
    Binary {
        signature: String,
        lhs: Box<BoundExpr>,
        rhs: Box<BoundExpr>,
        ty: UdonType,
    },
    /// Short-circuit `&&` / `||`; not an extern.
    Logical {
        and: bool,
        lhs: Box<BoundExpr>,
        rhs: Box<BoundExpr>,
    },
    Unary {
        signature: String,
        expr: Box<BoundExpr>,
        ty: UdonType,
    },
    /// Direct call to another method of this class (includes compile-time
    /// resolved self custom events).
    CallMethod {
        method: String,
        args: Vec<BoundExpr>,
        ty: UdonType,
    },
    /// Extern invocation: host calls, array access, conversions, runtime
    /// custom-event dispatch.
    CallExtern {
        signature: String,
        args: Vec<BoundExpr>,
        ty: UdonType,
    },
    NewArray {
        ctor_signature: String,
        /// Present when the array is built from an item list.
        set_signature: Option<String>,
        len: Option<Box<BoundExpr>>,
        items: Vec<BoundExpr>,
        ty: UdonType,
    },
}

impl BoundExpr {
    pub fn ty(&self) -> UdonType {
        match self {
            BoundExpr::Literal { ty, .. }
            | BoundExpr::Local { ty, .. }
            | BoundExpr::Field { ty, .. }
            | BoundExpr::This { ty }
            | BoundExpr::Binary { ty, .. }
            | BoundExpr::Unary { ty, .. }
            | BoundExpr::CallMethod { ty, .. }
            | BoundExpr::CallExtern { ty, .. }
            | BoundExpr::NewArray { ty, .. } => ty.clone(),
            BoundExpr::Logical { .. } => UdonType::Bool,
        }
    }

    /// An untyped `null` literal (no coercion target seen yet).
    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            BoundExpr::Literal {
                value: UdonValue::Null,
                ty: UdonType::Object
            }
        )
    }
}
