//! Abstract syntax tree for one source class.
//!
//! Nodes keep byte spans for diagnostics; the binder is responsible for
//! all name and type resolution.

use crate::Span;

/// One parsed compilation unit: a single behaviour class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub name_span: Span,
    /// Base type name after `:`, if any.
    pub base: Option<String>,
    pub base_span: Span,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttributeUse {
    pub name: String,
    pub args: Vec<AttrArg>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AttrArg {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Ident(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// Type as written: a name plus array rank (`int[][]` has rank 2).
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub rank: u8,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub attrs: Vec<AttributeUse>,
    pub visibility: Visibility,
    pub ty: TypeRef,
    pub name: String,
    pub name_span: Span,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub visibility: Visibility,
    pub ret: TypeRef,
    pub name: String,
    pub name_span: Span,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Local {
        ty: TypeRef,
        name: String,
        name_span: Span,
        init: Option<Expr>,
        span: Span,
    },
    /// Local function declaration, hoisted by the binder.
    LocalFunc(MethodDecl),
    Assign {
        target: Expr,
        /// Compound-assignment operator (`+=` carries `Add`), plain `=` is None.
        op: Option<BinaryOp>,
        value: Expr,
        span: Span,
    },
    /// `++x;` / `x--;` statement forms.
    IncDec {
        target: Expr,
        decrement: bool,
        span: Span,
    },
    If {
        cond: Expr,
        then: Block,
        els: Option<Block>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Block,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Block,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Local { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::IncDec { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Return { span, .. } => *span,
            Stmt::LocalFunc(decl) => decl.span,
            Stmt::Expr(expr) => expr.span(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterpPart {
    Text(String),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    IntLit {
        value: i64,
        long: bool,
        span: Span,
    },
    FloatLit {
        value: f64,
        single: bool,
        span: Span,
    },
    BoolLit {
        value: bool,
        span: Span,
    },
    StringLit {
        value: String,
        span: Span,
    },
    InterpString {
        parts: Vec<InterpPart>,
        span: Span,
    },
    NullLit {
        span: Span,
    },
    This {
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    /// `recv.name` without a call.
    Member {
        recv: Box<Expr>,
        name: String,
        span: Span,
    },
    /// `name(args)` or `recv.name(args)`.
    Call {
        recv: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    Index {
        arr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    /// `new T[len]` or `new T[] { items }`; rank > 1 declares a jagged array.
    NewArray {
        elem: TypeRef,
        len: Option<Box<Expr>>,
        items: Option<Vec<Expr>>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::InterpString { span, .. }
            | Expr::NullLit { span }
            | Expr::This { span }
            | Expr::Ident { span, .. }
            | Expr::Member { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::NewArray { span, .. } => *span,
        }
    }
}
