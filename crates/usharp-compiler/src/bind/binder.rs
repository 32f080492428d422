//! The binding pass: fields, methods, statements, expressions.

use indexmap::{IndexMap, IndexSet};

use usharp_core::externs::NULL_VM_TYPE;
use usharp_core::{ExternRegistry, SyncMode, UdonType, UdonValue};

use crate::diagnostics::Diagnostics;
use crate::meta::FieldAttribute;
use crate::parser::ast::{
    AttrArg, AttributeUse, BinaryOp, Block, ClassDecl, Expr, FieldDecl, InterpPart, MethodDecl,
    Stmt, UnaryOp, Visibility,
};
use crate::Span;

use super::error::{BindError, BindErrorKind};
use super::ir::{
    BoundClass, BoundExpr, BoundField, BoundMethod, BoundStmt, BoundTarget, LocalId, LocalSlot,
};
use super::types::{resolve_type, udon_type_from_vm};

/// Built-in events recognized by method name, with their reserved
/// entry-point identifiers.
const BUILTIN_EVENTS: &[(&str, &str)] = &[
    ("Start", "_start"),
    ("Update", "_update"),
    ("LateUpdate", "_lateUpdate"),
    ("FixedUpdate", "_fixedUpdate"),
    ("Interact", "_interact"),
    ("OnEnable", "_onEnable"),
    ("OnDisable", "_onDisable"),
];

/// Everything the binder resolves against: the VM's extern surface and the
/// behaviour classes known to the current compile batch.
pub struct BindEnv<'a> {
    pub externs: &'a ExternRegistry,
    pub behaviour_classes: &'a IndexSet<String>,
}

/// Bind one parsed class, collecting all diagnostics.
pub fn bind(class: &ClassDecl, env: &BindEnv<'_>) -> Result<BoundClass, Diagnostics> {
    let mut binder = Binder {
        env,
        class_name: class.name.clone(),
        field_types: IndexMap::new(),
        sigs: IndexMap::new(),
        entries: IndexMap::new(),
        diags: Diagnostics::new(),
    };

    match &class.base {
        Some(base) if base == "ScriptedBehaviour" => {}
        _ => {
            let span = if class.base.is_some() {
                class.base_span
            } else {
                class.name_span
            };
            binder.diags.push(
                BindError::new(span, BindErrorKind::IllegalInheritance(class.name.clone()))
                    .diagnostic(),
            );
        }
    }

    let mut fields = Vec::new();
    for field in &class.fields {
        if binder.field_types.contains_key(&field.name) {
            binder.report(BindError::new(
                field.name_span,
                BindErrorKind::Duplicate(field.name.clone()),
            ));
            continue;
        }
        match binder.bind_field(field) {
            Ok(bound) => {
                binder
                    .field_types
                    .insert(bound.name.clone(), bound.ty.clone());
                fields.push(bound);
            }
            Err(err) => binder.report(err),
        }
    }

    binder.collect_signatures(class);

    let mut methods = Vec::new();
    for decl in &class.methods {
        let outer_locals = IndexSet::new();
        if let Some(bound) = binder.bind_method(decl, decl.name.clone(), None, outer_locals) {
            methods.push(bound);
        }

        let outer_names = collect_local_names(decl);
        for stmt in &decl.body.stmts {
            if let Stmt::LocalFunc(lf) = stmt {
                let internal = format!("{}__{}", decl.name, lf.name);
                if let Some(bound) =
                    binder.bind_method(lf, internal, Some(decl.name.clone()), outer_names.clone())
                {
                    methods.push(bound);
                }
            }
        }
    }

    if binder.diags.has_errors() {
        Err(binder.diags)
    } else {
        Ok(BoundClass {
            name: class.name.clone(),
            fields,
            methods,
        })
    }
}

struct MethodSig {
    params: Vec<UdonType>,
    ret: UdonType,
    /// Some(owner) for local functions, callable only within the owner.
    owner: Option<String>,
    entry_point: Option<String>,
}

struct Binder<'a> {
    env: &'a BindEnv<'a>,
    class_name: String,
    field_types: IndexMap<String, UdonType>,
    /// Method signatures by internal name (local functions mangled).
    sigs: IndexMap<String, MethodSig>,
    /// Entry-point name → internal method name.
    entries: IndexMap<String, String>,
    diags: Diagnostics,
}

/// Per-function binding state.
struct FnCtx {
    /// Internal name of the function being bound.
    name: String,
    /// Display name for diagnostics (unmangled).
    display_name: String,
    /// Owner method when this is a local function.
    owner: Option<String>,
    ret: UdonType,
    locals: Vec<LocalSlot>,
    scopes: Vec<IndexMap<String, LocalId>>,
    /// Locals of the enclosing method; referencing one from a local
    /// function is a capture error.
    outer_locals: IndexSet<String>,
}

impl FnCtx {
    fn lookup(&self, name: &str) -> Option<(LocalId, UdonType)> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.get(name) {
                return Some((id, self.locals[id.0 as usize].ty.clone()));
            }
        }
        None
    }

    fn declare(&mut self, name: &str, ty: UdonType) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalSlot {
            name: name.to_string(),
            ty,
        });
        self.scopes
            .last_mut()
            .expect("scope stack never empty")
            .insert(name.to_string(), id);
        id
    }
}

impl<'a> Binder<'a> {
    fn report(&mut self, err: BindError) {
        self.diags.push(err.diagnostic());
    }

    // === Fields ===

    fn bind_field(&mut self, field: &FieldDecl) -> Result<BoundField, BindError> {
        let ty = resolve_type(&field.ty, self.env, &self.class_name)?;
        if ty == UdonType::Void {
            return Err(BindError::new(
                field.ty.span,
                BindErrorKind::Unsupported("fields of type void".to_string()),
            ));
        }

        let mut exported = field.visibility == Visibility::Public;
        let mut sync = SyncMode::NotSynced;
        let mut attributes = Vec::new();

        for attr in &field.attrs {
            self.bind_attribute(attr, &mut exported, &mut sync, &mut attributes)?;
        }

        let default = match &field.init {
            Some(init) => const_eval(init, &ty)?,
            None => ty.default_value(),
        };

        Ok(BoundField {
            name: field.name.clone(),
            ty,
            default,
            exported,
            sync,
            attributes,
            span: field.span,
        })
    }

    fn bind_attribute(
        &mut self,
        attr: &AttributeUse,
        exported: &mut bool,
        sync: &mut SyncMode,
        out: &mut Vec<FieldAttribute>,
    ) -> Result<(), BindError> {
        let bad = |msg: String| BindError::new(attr.span, BindErrorKind::BadAttribute(msg));

        match attr.name.as_str() {
            "SerializeField" => {
                *exported = true;
                Ok(())
            }
            "HideInInspector" => {
                out.push(FieldAttribute::HideInInspector);
                Ok(())
            }
            "Synced" => {
                *sync = match attr.args.as_slice() {
                    [] => SyncMode::None,
                    [AttrArg::Ident(mode)] => SyncMode::parse(&mode.to_lowercase())
                        .ok_or_else(|| bad(format!("unknown sync mode '{mode}'")))?,
                    _ => return Err(bad("Synced takes an optional mode".to_string())),
                };
                Ok(())
            }
            "Tooltip" => match attr.args.as_slice() {
                [AttrArg::Str(text)] => {
                    out.push(FieldAttribute::Tooltip(text.clone()));
                    Ok(())
                }
                _ => Err(bad("Tooltip takes one string".to_string())),
            },
            "Header" => match attr.args.as_slice() {
                [AttrArg::Str(text)] => {
                    out.push(FieldAttribute::Header(text.clone()));
                    Ok(())
                }
                _ => Err(bad("Header takes one string".to_string())),
            },
            "Space" => {
                let height = match attr.args.as_slice() {
                    [] => 8.0,
                    [AttrArg::Int(v)] => *v as f32,
                    [AttrArg::Float(v)] => *v as f32,
                    _ => return Err(bad("Space takes an optional height".to_string())),
                };
                out.push(FieldAttribute::Space(height));
                Ok(())
            }
            "Range" => {
                let (min, max) = match attr.args.as_slice() {
                    [a, b] => (attr_number(a), attr_number(b)),
                    _ => return Err(bad("Range takes two numbers".to_string())),
                };
                match (min, max) {
                    (Some(min), Some(max)) => {
                        out.push(FieldAttribute::Range { min, max });
                        Ok(())
                    }
                    _ => Err(bad("Range takes two numbers".to_string())),
                }
            }
            "ColorUsage" => {
                let (show_alpha, hdr) = match attr.args.as_slice() {
                    [AttrArg::Bool(a)] => (*a, false),
                    [AttrArg::Bool(a), AttrArg::Bool(h)] => (*a, *h),
                    _ => return Err(bad("ColorUsage takes one or two booleans".to_string())),
                };
                out.push(FieldAttribute::ColorUsage { show_alpha, hdr });
                Ok(())
            }
            "GradientUsage" => match attr.args.as_slice() {
                [AttrArg::Bool(hdr)] => {
                    out.push(FieldAttribute::GradientUsage { hdr: *hdr });
                    Ok(())
                }
                _ => Err(bad("GradientUsage takes one boolean".to_string())),
            },
            "TextArea" => {
                out.push(FieldAttribute::TextArea);
                Ok(())
            }
            other => Err(bad(format!("unknown attribute '{other}'"))),
        }
    }

    // === Method signatures ===

    fn collect_signatures(&mut self, class: &ClassDecl) {
        for decl in &class.methods {
            if self.sigs.contains_key(&decl.name) {
                self.report(BindError::new(
                    decl.name_span,
                    BindErrorKind::Duplicate(decl.name.clone()),
                ));
                continue;
            }
            if let Some(sig) = self.signature_of(decl, None) {
                if let Some(entry) = &sig.entry_point {
                    self.entries.insert(entry.clone(), decl.name.clone());
                }
                self.sigs.insert(decl.name.clone(), sig);
            }

            for stmt in &decl.body.stmts {
                let Stmt::LocalFunc(lf) = stmt else { continue };
                let internal = format!("{}__{}", decl.name, lf.name);
                if self.sigs.contains_key(&internal) {
                    self.report(BindError::new(
                        lf.name_span,
                        BindErrorKind::Duplicate(lf.name.clone()),
                    ));
                    continue;
                }
                if let Some(sig) = self.signature_of(lf, Some(decl.name.clone())) {
                    self.sigs.insert(internal, sig);
                }
            }
        }
    }

    /// Resolve a method's signature; local functions never export.
    fn signature_of(&mut self, decl: &MethodDecl, owner: Option<String>) -> Option<MethodSig> {
        let ret = match resolve_type(&decl.ret, self.env, &self.class_name) {
            Ok(ty) => ty,
            Err(err) => {
                self.report(err);
                return None;
            }
        };

        let mut params = Vec::new();
        for param in &decl.params {
            match resolve_type(&param.ty, self.env, &self.class_name) {
                Ok(UdonType::Void) => {
                    self.report(BindError::new(
                        param.span,
                        BindErrorKind::Unsupported("parameters of type void".to_string()),
                    ));
                    return None;
                }
                Ok(ty) => params.push(ty),
                Err(err) => {
                    self.report(err);
                    return None;
                }
            }
        }

        let entry_point = if owner.is_some() {
            None
        } else {
            self.entry_point_for(decl)?
        };

        Some(MethodSig {
            params,
            ret,
            owner,
            entry_point,
        })
    }

    /// Entry-point name for a top-level method. Built-in events get their
    /// reserved identifier; public methods export under their own name.
    ///
    /// Returns None (after reporting) only for malformed event handlers.
    fn entry_point_for(&mut self, decl: &MethodDecl) -> Option<Option<String>> {
        if let Some((_, reserved)) = BUILTIN_EVENTS.iter().find(|(name, _)| *name == decl.name) {
            let well_formed = decl.params.is_empty() && decl.ret.name == "void";
            if !well_formed {
                self.report(BindError::new(
                    decl.name_span,
                    BindErrorKind::BadEventSignature(decl.name.clone()),
                ));
                return None;
            }
            return Some(Some(reserved.to_string()));
        }

        if decl.visibility == Visibility::Public {
            Some(Some(decl.name.clone()))
        } else {
            Some(None)
        }
    }

    // === Method bodies ===

    fn bind_method(
        &mut self,
        decl: &MethodDecl,
        internal: String,
        owner: Option<String>,
        outer_locals: IndexSet<String>,
    ) -> Option<BoundMethod> {
        let sig = self.sigs.get(&internal)?;
        let ret = sig.ret.clone();
        let params = sig.params.clone();
        let entry_point = sig.entry_point.clone();

        let mut ctx = FnCtx {
            name: internal.clone(),
            display_name: decl.name.clone(),
            owner,
            ret: ret.clone(),
            locals: Vec::new(),
            scopes: vec![IndexMap::new()],
            outer_locals,
        };

        for (param, ty) in decl.params.iter().zip(params.iter()) {
            if ctx.lookup(&param.name).is_some() {
                self.report(BindError::new(
                    param.span,
                    BindErrorKind::Duplicate(param.name.clone()),
                ));
                return None;
            }
            ctx.declare(&param.name, ty.clone());
        }
        let param_count = decl.params.len();

        let mut body = Vec::new();
        if let Err(err) = self.bind_block(&decl.body, &mut ctx, &mut body) {
            self.report(err);
            return None;
        }

        Some(BoundMethod {
            name: internal,
            entry_point,
            ret,
            param_count,
            locals: ctx.locals,
            body,
            span: decl.span,
        })
    }

    fn bind_block(
        &mut self,
        block: &Block,
        ctx: &mut FnCtx,
        out: &mut Vec<BoundStmt>,
    ) -> Result<(), BindError> {
        ctx.scopes.push(IndexMap::new());
        let mut result: Result<(), BindError> = Ok(());
        for stmt in &block.stmts {
            if let Err(err) = self.bind_stmt(stmt, ctx, out) {
                result = Err(err);
                break;
            }
        }
        ctx.scopes.pop();
        result
    }

    fn bind_stmt(
        &mut self,
        stmt: &Stmt,
        ctx: &mut FnCtx,
        out: &mut Vec<BoundStmt>,
    ) -> Result<(), BindError> {
        match stmt {
            Stmt::Local {
                ty,
                name,
                name_span,
                init,
                span: _,
            } => {
                let ty = resolve_type(ty, self.env, &self.class_name)?;
                if ty == UdonType::Void {
                    return Err(BindError::new(
                        *name_span,
                        BindErrorKind::Unsupported("locals of type void".to_string()),
                    ));
                }
                if ctx.lookup(name).is_some() {
                    return Err(BindError::new(
                        *name_span,
                        BindErrorKind::Duplicate(name.clone()),
                    ));
                }

                let value = match init {
                    Some(expr) => {
                        let bound = self.bind_expr(expr, ctx)?;
                        self.coerce(bound, &ty, expr.span())?
                    }
                    // Locals re-initialize on every execution of the
                    // declaration; slots are static storage.
                    None => BoundExpr::Literal {
                        value: ty.default_value(),
                        ty: ty.clone(),
                    },
                };

                let id = ctx.declare(name, ty);
                out.push(BoundStmt::Assign {
                    target: BoundTarget::Local(id),
                    value,
                });
                Ok(())
            }

            Stmt::LocalFunc(lf) => {
                if ctx.owner.is_some() {
                    return Err(BindError::new(
                        lf.name_span,
                        BindErrorKind::Unsupported("nested local functions".to_string()),
                    ));
                }
                // Hoisted and bound by the caller.
                Ok(())
            }

            Stmt::Assign {
                target,
                op,
                value,
                span,
            } => {
                let (bound_target, target_ty, load) = self.bind_target(target, ctx)?;
                let bound_value = self.bind_expr(value, ctx)?;

                let value = match op {
                    Some(op) => self.bind_binary_bound(*op, load, bound_value, *span)?,
                    None => bound_value,
                };
                let value = self.coerce(value, &target_ty, *span)?;

                out.push(BoundStmt::Assign {
                    target: bound_target,
                    value,
                });
                Ok(())
            }

            Stmt::IncDec {
                target,
                decrement,
                span,
            } => {
                let (bound_target, target_ty, load) = self.bind_target(target, ctx)?;
                if !target_ty.is_numeric() {
                    return Err(BindError::new(
                        *span,
                        BindErrorKind::TypeMismatch {
                            expected: "a numeric type".to_string(),
                            found: target_ty.to_string(),
                        },
                    ));
                }

                let one = self.coerce(
                    BoundExpr::Literal {
                        value: UdonValue::Int32(1),
                        ty: UdonType::Int32,
                    },
                    &target_ty,
                    *span,
                )?;
                let op = if *decrement {
                    BinaryOp::Sub
                } else {
                    BinaryOp::Add
                };
                let value = self.bind_binary_bound(op, load, one, *span)?;

                out.push(BoundStmt::Assign {
                    target: bound_target,
                    value,
                });
                Ok(())
            }

            Stmt::If {
                cond, then, els, ..
            } => {
                let cond = self.bind_condition(cond, ctx)?;
                let mut then_body = Vec::new();
                self.bind_block(then, ctx, &mut then_body)?;
                let mut else_body = Vec::new();
                if let Some(els) = els {
                    self.bind_block(els, ctx, &mut else_body)?;
                }
                out.push(BoundStmt::If {
                    cond,
                    then: then_body,
                    els: else_body,
                });
                Ok(())
            }

            Stmt::While { cond, body, .. } => {
                let cond = self.bind_condition(cond, ctx)?;
                let mut bound_body = Vec::new();
                self.bind_block(body, ctx, &mut bound_body)?;
                out.push(BoundStmt::While {
                    cond,
                    body: bound_body,
                });
                Ok(())
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                // for (init; cond; step) body → init; while cond { body; step }
                ctx.scopes.push(IndexMap::new());
                let result = self.bind_for(init.as_deref(), cond.as_ref(), step.as_deref(), body, ctx, out);
                ctx.scopes.pop();
                result
            }

            Stmt::Return { value, span } => {
                let value = match (value, ctx.ret.clone()) {
                    (None, UdonType::Void) => None,
                    (Some(_), UdonType::Void) => {
                        return Err(BindError::new(
                            *span,
                            BindErrorKind::TypeMismatch {
                                expected: "void".to_string(),
                                found: "a return value".to_string(),
                            },
                        ));
                    }
                    (None, ret) => {
                        return Err(BindError::new(
                            *span,
                            BindErrorKind::TypeMismatch {
                                expected: ret.to_string(),
                                found: "void".to_string(),
                            },
                        ));
                    }
                    (Some(expr), ret) => {
                        let bound = self.bind_expr(expr, ctx)?;
                        Some(self.coerce(bound, &ret, expr.span())?)
                    }
                };
                out.push(BoundStmt::Return { value });
                Ok(())
            }

            Stmt::Expr(expr) => {
                let bound = self.bind_expr(expr, ctx)?;
                out.push(BoundStmt::Expr(bound));
                Ok(())
            }
        }
    }

    fn bind_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Stmt>,
        body: &Block,
        ctx: &mut FnCtx,
        out: &mut Vec<BoundStmt>,
    ) -> Result<(), BindError> {
        if let Some(init) = init {
            self.bind_stmt(init, ctx, out)?;
        }
        let cond = match cond {
            Some(cond) => self.bind_condition(cond, ctx)?,
            None => BoundExpr::Literal {
                value: UdonValue::Bool(true),
                ty: UdonType::Bool,
            },
        };
        let mut loop_body = Vec::new();
        self.bind_block(body, ctx, &mut loop_body)?;
        if let Some(step) = step {
            self.bind_stmt(step, ctx, &mut loop_body)?;
        }
        out.push(BoundStmt::While {
            cond,
            body: loop_body,
        });
        Ok(())
    }

    fn bind_condition(&mut self, expr: &Expr, ctx: &mut FnCtx) -> Result<BoundExpr, BindError> {
        let bound = self.bind_expr(expr, ctx)?;
        let ty = bound.ty();
        if ty != UdonType::Bool {
            return Err(BindError::new(
                expr.span(),
                BindErrorKind::TypeMismatch {
                    expected: "bool".to_string(),
                    found: ty.to_string(),
                },
            ));
        }
        Ok(bound)
    }

    /// Bind an assignment target. Returns the target, its type and a load
    /// expression for compound assignments.
    fn bind_target(
        &mut self,
        expr: &Expr,
        ctx: &mut FnCtx,
    ) -> Result<(BoundTarget, UdonType, BoundExpr), BindError> {
        match expr {
            Expr::Ident { name, span } => self.bind_named_target(name, *span, ctx),
            Expr::Member { recv, name, span } if matches!(**recv, Expr::This { .. }) => {
                self.bind_named_target(name, *span, ctx)
            }
            Expr::Index {
                arr, index, span, ..
            } => {
                let arr = self.bind_expr(arr, ctx)?;
                let arr_ty = arr.ty();
                let Some(elem_ty) = arr_ty.element_type().cloned() else {
                    return Err(BindError::new(
                        *span,
                        BindErrorKind::TypeMismatch {
                            expected: "an array".to_string(),
                            found: arr_ty.to_string(),
                        },
                    ));
                };

                let index = self.bind_expr(index, ctx)?;
                let index = self.coerce(index, &UdonType::Int32, *span)?;

                let array_vm = arr_ty.assembler_type();
                let elem_vm = elem_ty.assembler_type();
                let set_signature = self
                    .env
                    .externs
                    .signature(&array_vm, "Set", &["SystemInt32".to_string(), elem_vm])
                    .map_err(|e| BindError::new(*span, e.into()))?;
                let get_signature = self
                    .env
                    .externs
                    .signature(&array_vm, "Get", &["SystemInt32".to_string()])
                    .map_err(|e| BindError::new(*span, e.into()))?;

                let load = BoundExpr::CallExtern {
                    signature: get_signature,
                    args: vec![arr.clone(), index.clone()],
                    ty: elem_ty.clone(),
                };
                Ok((
                    BoundTarget::Index {
                        arr,
                        index,
                        set_signature,
                    },
                    elem_ty,
                    load,
                ))
            }
            _ => Err(BindError::new(
                expr.span(),
                BindErrorKind::InvalidAssignTarget,
            )),
        }
    }

    fn bind_named_target(
        &mut self,
        name: &str,
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<(BoundTarget, UdonType, BoundExpr), BindError> {
        if let Some((id, ty)) = ctx.lookup(name) {
            let load = BoundExpr::Local {
                id,
                ty: ty.clone(),
            };
            return Ok((BoundTarget::Local(id), ty, load));
        }
        if let Some(ty) = self.field_types.get(name).cloned() {
            let load = BoundExpr::Field {
                name: name.to_string(),
                ty: ty.clone(),
            };
            return Ok((BoundTarget::Field(name.to_string()), ty, load));
        }
        Err(self.unknown_identifier(name, span, ctx))
    }

    fn unknown_identifier(&self, name: &str, span: Span, ctx: &FnCtx) -> BindError {
        if ctx.outer_locals.contains(name) {
            BindError::new(
                span,
                BindErrorKind::Capture {
                    function: ctx.display_name.clone(),
                    local: name.to_string(),
                },
            )
        } else {
            BindError::new(span, BindErrorKind::UnknownIdentifier(name.to_string()))
        }
    }

    // === Expressions ===

    fn bind_expr(&mut self, expr: &Expr, ctx: &mut FnCtx) -> Result<BoundExpr, BindError> {
        match expr {
            Expr::IntLit { value, long, .. } => Ok(if *long {
                BoundExpr::Literal {
                    value: UdonValue::Int64(*value),
                    ty: UdonType::Int64,
                }
            } else {
                BoundExpr::Literal {
                    value: UdonValue::Int32(*value as i32),
                    ty: UdonType::Int32,
                }
            }),
            Expr::FloatLit { value, single, .. } => Ok(if *single {
                BoundExpr::Literal {
                    value: UdonValue::Single(*value as f32),
                    ty: UdonType::Single,
                }
            } else {
                BoundExpr::Literal {
                    value: UdonValue::Double(*value),
                    ty: UdonType::Double,
                }
            }),
            Expr::BoolLit { value, .. } => Ok(BoundExpr::Literal {
                value: UdonValue::Bool(*value),
                ty: UdonType::Bool,
            }),
            Expr::StringLit { value, .. } => Ok(BoundExpr::Literal {
                value: UdonValue::String(value.clone()),
                ty: UdonType::String,
            }),
            // Untyped null: `ty` Object plus a null value marks it for
            // coercion and overload resolution.
            Expr::NullLit { .. } => Ok(BoundExpr::Literal {
                value: UdonValue::Null,
                ty: UdonType::Object,
            }),
            Expr::This { .. } => Ok(BoundExpr::This {
                ty: UdonType::Behaviour(Some(self.class_name.clone())),
            }),

            Expr::InterpString { parts, span } => self.bind_interpolation(parts, *span, ctx),

            Expr::Ident { name, span } => {
                if let Some((id, ty)) = ctx.lookup(name) {
                    return Ok(BoundExpr::Local { id, ty });
                }
                if let Some(ty) = self.field_types.get(name).cloned() {
                    return Ok(BoundExpr::Field {
                        name: name.clone(),
                        ty,
                    });
                }
                Err(self.unknown_identifier(name, *span, ctx))
            }

            Expr::Member { recv, name, span } => self.bind_member(recv, name, *span, ctx),

            Expr::Call {
                recv,
                name,
                args,
                span,
            } => self.bind_call(recv.as_deref(), name, args, *span, ctx),

            Expr::Index {
                arr, index, span, ..
            } => {
                let arr = self.bind_expr(arr, ctx)?;
                let arr_ty = arr.ty();
                let Some(elem_ty) = arr_ty.element_type().cloned() else {
                    return Err(BindError::new(
                        *span,
                        BindErrorKind::TypeMismatch {
                            expected: "an array".to_string(),
                            found: arr_ty.to_string(),
                        },
                    ));
                };
                let index = self.bind_expr(index, ctx)?;
                let index = self.coerce(index, &UdonType::Int32, *span)?;

                let signature = self
                    .env
                    .externs
                    .signature(
                        &arr_ty.assembler_type(),
                        "Get",
                        &["SystemInt32".to_string()],
                    )
                    .map_err(|e| BindError::new(*span, e.into()))?;
                Ok(BoundExpr::CallExtern {
                    signature,
                    args: vec![arr, index],
                    ty: elem_ty,
                })
            }

            Expr::Binary { op, lhs, rhs, span } => {
                let lhs = self.bind_expr(lhs, ctx)?;
                let rhs = self.bind_expr(rhs, ctx)?;
                self.bind_binary_bound(*op, lhs, rhs, *span)
            }

            Expr::Unary { op, expr, span } => self.bind_unary(*op, expr, *span, ctx),

            Expr::NewArray {
                elem,
                len,
                items,
                span,
            } => self.bind_new_array(elem, len.as_deref(), items.as_deref(), *span, ctx),
        }
    }

    fn bind_interpolation(
        &mut self,
        parts: &[InterpPart],
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        let mut acc: Option<BoundExpr> = None;

        for part in parts {
            let piece = match part {
                InterpPart::Text(text) => BoundExpr::Literal {
                    value: UdonValue::String(text.clone()),
                    ty: UdonType::String,
                },
                InterpPart::Expr(expr) => {
                    let bound = self.bind_expr(expr, ctx)?;
                    self.to_string_expr(bound, expr.span())?
                }
            };

            acc = Some(match acc {
                None => piece,
                Some(prev) => self.concat_expr(prev, piece, span)?,
            });
        }

        Ok(acc.unwrap_or(BoundExpr::Literal {
            value: UdonValue::String(String::new()),
            ty: UdonType::String,
        }))
    }

    /// Lower a value to its string form through the ToString externs.
    fn to_string_expr(&mut self, expr: BoundExpr, span: Span) -> Result<BoundExpr, BindError> {
        let ty = expr.ty();
        if ty == UdonType::String {
            return Ok(expr);
        }
        if ty == UdonType::Void {
            return Err(BindError::new(span, BindErrorKind::VoidValue));
        }

        let vm = ty.assembler_type();
        let signature = match self.env.externs.signature(&vm, "ToString", &[]) {
            Ok(sig) => sig,
            // Reference types fall back to the object ToString
            Err(_) if ty.is_reference() => self
                .env
                .externs
                .signature("SystemObject", "ToString", &[])
                .map_err(|e| BindError::new(span, e.into()))?,
            Err(e) => return Err(BindError::new(span, e.into())),
        };

        Ok(BoundExpr::CallExtern {
            signature,
            args: vec![expr],
            ty: UdonType::String,
        })
    }

    fn concat_expr(
        &mut self,
        lhs: BoundExpr,
        rhs: BoundExpr,
        span: Span,
    ) -> Result<BoundExpr, BindError> {
        let signature = self
            .env
            .externs
            .signature(
                "SystemString",
                "Concat",
                &["SystemString".to_string(), "SystemString".to_string()],
            )
            .map_err(|e| BindError::new(span, e.into()))?;
        Ok(BoundExpr::Binary {
            signature,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: UdonType::String,
        })
    }

    fn bind_member(
        &mut self,
        recv: &Expr,
        name: &str,
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        // this.field
        if matches!(recv, Expr::This { .. }) {
            if let Some(ty) = self.field_types.get(name).cloned() {
                return Ok(BoundExpr::Field {
                    name: name.to_string(),
                    ty,
                });
            }
            return Err(BindError::new(
                span,
                BindErrorKind::UnknownIdentifier(name.to_string()),
            ));
        }

        // Static host properties: Time.deltaTime → get_deltaTime
        if let Expr::Ident { name: recv_name, .. } = recv {
            let shadowed =
                ctx.lookup(recv_name).is_some() || self.field_types.contains_key(recv_name);
            if !shadowed {
                if let Some(vm) = self.env.externs.static_class(recv_name) {
                    let vm = vm.to_string();
                    let def = self
                        .env
                        .externs
                        .resolve(&vm, &format!("get_{name}"), &[])
                        .map_err(|e| BindError::new(span, e.into()))?;
                    let ty = udon_type_from_vm(&def.ret);
                    return Ok(BoundExpr::CallExtern {
                        signature: def.signature.clone(),
                        args: Vec::new(),
                        ty,
                    });
                }
            }
        }

        let bound = self.bind_expr(recv, ctx)?;
        let ty = bound.ty();

        if name == "Length" && (ty.is_array() || ty == UdonType::String) {
            let signature = self
                .env
                .externs
                .signature(&ty.assembler_type(), "get_Length", &[])
                .map_err(|e| BindError::new(span, e.into()))?;
            return Ok(BoundExpr::CallExtern {
                signature,
                args: vec![bound],
                ty: UdonType::Int32,
            });
        }

        Err(BindError::new(
            span,
            BindErrorKind::Unsupported(format!("member access '.{name}'")),
        ))
    }

    fn bind_call(
        &mut self,
        recv: Option<&Expr>,
        name: &str,
        args: &[Expr],
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        match recv {
            None => self.bind_self_call(name, args, span, ctx),
            Some(Expr::This { .. }) => self.bind_self_call(name, args, span, ctx),
            Some(Expr::Ident { name: recv_name, .. })
                if ctx.lookup(recv_name).is_none()
                    && !self.field_types.contains_key(recv_name)
                    && self.env.externs.static_class(recv_name).is_some() =>
            {
                let vm = self
                    .env
                    .externs
                    .static_class(recv_name)
                    .expect("checked above")
                    .to_string();
                self.bind_extern_call(&vm, name, args, span, ctx)
            }
            Some(recv) => {
                let bound = self.bind_expr(recv, ctx)?;
                let ty = bound.ty();
                if !ty.is_behaviour() {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::UnknownMethod(name.to_string()),
                    ));
                }

                // Behaviour references only support runtime custom-event
                // dispatch; everything else needs the scene, which the
                // compiler never sees.
                if name != "SendCustomEvent" {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::Unsupported(format!(
                            "calling '{name}' on a behaviour reference"
                        )),
                    ));
                }
                let [event] = args else {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::Arity {
                            name: name.to_string(),
                            expected: 1,
                            found: args.len(),
                        },
                    ));
                };
                let event = self.bind_expr(event, ctx)?;
                let event = self.coerce(event, &UdonType::String, span)?;
                self.send_custom_event(bound, event, span)
            }
        }
    }

    fn send_custom_event(
        &mut self,
        receiver: BoundExpr,
        event: BoundExpr,
        span: Span,
    ) -> Result<BoundExpr, BindError> {
        let signature = self
            .env
            .externs
            .signature(
                "ScriptedBehaviour",
                "SendCustomEvent",
                &["SystemString".to_string()],
            )
            .map_err(|e| BindError::new(span, e.into()))?;
        Ok(BoundExpr::CallExtern {
            signature,
            args: vec![receiver, event],
            ty: UdonType::Void,
        })
    }

    /// Calls with no receiver (or `this.`): internal methods, local
    /// functions and self custom events.
    fn bind_self_call(
        &mut self,
        name: &str,
        args: &[Expr],
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        if name == "SendCustomEvent" {
            let [event] = args else {
                return Err(BindError::new(
                    span,
                    BindErrorKind::Arity {
                        name: name.to_string(),
                        expected: 1,
                        found: args.len(),
                    },
                ));
            };

            // A literal event name resolves to a direct call at compile
            // time; anything else dispatches at runtime through the VM.
            if let Expr::StringLit { value, .. } = event {
                let Some(internal) = self.entries.get(value).cloned() else {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::UnknownMethod(value.clone()),
                    ));
                };
                let sig = &self.sigs[&internal];
                if !sig.params.is_empty() {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::BadEventSignature(value.clone()),
                    ));
                }
                return Ok(BoundExpr::CallMethod {
                    method: internal,
                    args: Vec::new(),
                    ty: UdonType::Void,
                });
            }

            let receiver = BoundExpr::This {
                ty: UdonType::Behaviour(Some(self.class_name.clone())),
            };
            let event = self.bind_expr(event, ctx)?;
            let event = self.coerce(event, &UdonType::String, span)?;
            return self.send_custom_event(receiver, event, span);
        }

        // Local functions of the enclosing method shadow class methods.
        let scope_owner = ctx.owner.clone().unwrap_or_else(|| ctx.name.clone());
        let mangled = format!("{scope_owner}__{name}");
        let internal = if self
            .sigs
            .get(&mangled)
            .is_some_and(|sig| sig.owner.as_deref() == Some(scope_owner.as_str()))
        {
            mangled
        } else if self
            .sigs
            .get(name)
            .is_some_and(|sig| sig.owner.is_none())
        {
            name.to_string()
        } else {
            return Err(BindError::new(
                span,
                BindErrorKind::UnknownMethod(name.to_string()),
            ));
        };

        let sig = &self.sigs[&internal];
        if sig.params.len() != args.len() {
            return Err(BindError::new(
                span,
                BindErrorKind::Arity {
                    name: name.to_string(),
                    expected: sig.params.len(),
                    found: args.len(),
                },
            ));
        }
        let params = sig.params.clone();
        let ret = sig.ret.clone();

        let mut bound_args = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter().zip(params.iter()) {
            let bound = self.bind_expr(arg, ctx)?;
            bound_args.push(self.coerce(bound, param_ty, arg.span())?);
        }

        Ok(BoundExpr::CallMethod {
            method: internal,
            args: bound_args,
            ty: ret,
        })
    }

    /// Static host call resolved against the registry.
    fn bind_extern_call(
        &mut self,
        vm: &str,
        name: &str,
        args: &[Expr],
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        let mut bound_args = Vec::with_capacity(args.len());
        for arg in args {
            bound_args.push(self.bind_expr(arg, ctx)?);
        }

        let vm_types = vm_arg_types(&bound_args);
        let def = self
            .env
            .externs
            .resolve(vm, name, &vm_types)
            .map_err(|e| BindError::new(span, e.into()))?;
        let signature = def.signature.clone();
        let params = def.params.clone();
        let ty = udon_type_from_vm(&def.ret);

        // Give null arguments the parameter's concrete type.
        for (arg, param) in bound_args.iter_mut().zip(params.iter()) {
            if arg.is_null_literal() {
                *arg = BoundExpr::Literal {
                    value: UdonValue::Null,
                    ty: udon_type_from_vm(param),
                };
            }
        }

        Ok(BoundExpr::CallExtern {
            signature,
            args: bound_args,
            ty,
        })
    }

    fn bind_unary(
        &mut self,
        op: UnaryOp,
        expr: &Expr,
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        let bound = self.bind_expr(expr, ctx)?;
        let ty = bound.ty();

        match op {
            UnaryOp::Neg => {
                // Fold negation of literals so `-5` stays a constant
                if let BoundExpr::Literal { value, ty } = &bound {
                    if let Some(folded) = negate_literal(value) {
                        return Ok(BoundExpr::Literal {
                            value: folded,
                            ty: ty.clone(),
                        });
                    }
                }
                if !ty.is_numeric() {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::TypeMismatch {
                            expected: "a numeric type".to_string(),
                            found: ty.to_string(),
                        },
                    ));
                }
                let signature = self
                    .env
                    .externs
                    .signature(
                        &ty.assembler_type(),
                        "op_UnaryMinus",
                        &[ty.assembler_type()],
                    )
                    .map_err(|e| BindError::new(span, e.into()))?;
                Ok(BoundExpr::Unary {
                    signature,
                    expr: Box::new(bound),
                    ty,
                })
            }
            UnaryOp::Not => {
                if ty != UdonType::Bool {
                    return Err(BindError::new(
                        span,
                        BindErrorKind::TypeMismatch {
                            expected: "bool".to_string(),
                            found: ty.to_string(),
                        },
                    ));
                }
                let signature = self
                    .env
                    .externs
                    .signature(
                        "SystemBoolean",
                        "op_UnaryNegation",
                        &["SystemBoolean".to_string()],
                    )
                    .map_err(|e| BindError::new(span, e.into()))?;
                Ok(BoundExpr::Unary {
                    signature,
                    expr: Box::new(bound),
                    ty: UdonType::Bool,
                })
            }
        }
    }

    fn bind_new_array(
        &mut self,
        elem: &crate::parser::ast::TypeRef,
        len: Option<&Expr>,
        items: Option<&[Expr]>,
        span: Span,
        ctx: &mut FnCtx,
    ) -> Result<BoundExpr, BindError> {
        let elem_ty = resolve_type(elem, self.env, &self.class_name)?;
        if elem_ty == UdonType::Void {
            return Err(BindError::new(
                elem.span,
                BindErrorKind::UnresolvedType("void".to_string()),
            ));
        }
        let array_ty = UdonType::array_of(elem_ty.clone());
        let array_vm = array_ty.assembler_type();

        let ctor_signature = self
            .env
            .externs
            .signature(&array_vm, "ctor", &["SystemInt32".to_string()])
            .map_err(|e| BindError::new(span, e.into()))?;

        match (len, items) {
            (Some(len), None) => {
                let len = self.bind_expr(len, ctx)?;
                let len = self.coerce(len, &UdonType::Int32, span)?;
                Ok(BoundExpr::NewArray {
                    ctor_signature,
                    set_signature: None,
                    len: Some(Box::new(len)),
                    items: Vec::new(),
                    ty: array_ty,
                })
            }
            (None, Some(items)) => {
                let set_signature = self
                    .env
                    .externs
                    .signature(
                        &array_vm,
                        "Set",
                        &["SystemInt32".to_string(), elem_ty.assembler_type()],
                    )
                    .map_err(|e| BindError::new(span, e.into()))?;

                let mut bound_items = Vec::with_capacity(items.len());
                for item in items {
                    let bound = self.bind_expr(item, ctx)?;
                    // Object element arrays widen: any value is accepted
                    let bound = if elem_ty == UdonType::Object {
                        if bound.ty() == UdonType::Void {
                            return Err(BindError::new(item.span(), BindErrorKind::VoidValue));
                        }
                        bound
                    } else {
                        self.coerce(bound, &elem_ty, item.span())?
                    };
                    bound_items.push(bound);
                }

                Ok(BoundExpr::NewArray {
                    ctor_signature,
                    set_signature: Some(set_signature),
                    len: None,
                    items: bound_items,
                    ty: array_ty,
                })
            }
            _ => Err(BindError::new(
                span,
                BindErrorKind::Unsupported("array creation form".to_string()),
            )),
        }
    }

    fn bind_binary_bound(
        &mut self,
        op: BinaryOp,
        lhs: BoundExpr,
        rhs: BoundExpr,
        span: Span,
    ) -> Result<BoundExpr, BindError> {
        use BinaryOp::*;

        if matches!(op, And | Or) {
            let lhs = self.coerce(lhs, &UdonType::Bool, span)?;
            let rhs = self.coerce(rhs, &UdonType::Bool, span)?;
            return Ok(BoundExpr::Logical {
                and: op == And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }

        // String + anything concatenates
        if op == Add && (lhs.ty() == UdonType::String || rhs.ty() == UdonType::String) {
            let lhs = self.to_string_expr(lhs, span)?;
            let rhs = self.to_string_expr(rhs, span)?;
            return self.concat_expr(lhs, rhs, span);
        }

        if matches!(op, Eq | Ne) {
            return self.bind_equality(op, lhs, rhs, span);
        }

        // Arithmetic and relational operators want matching operand
        // types; literals coerce toward the other side.
        let (lhs, rhs) = self.unify_numeric(lhs, rhs, span)?;
        let ty = lhs.ty();
        if !ty.is_numeric() {
            return Err(BindError::new(
                span,
                BindErrorKind::TypeMismatch {
                    expected: "a numeric type".to_string(),
                    found: ty.to_string(),
                },
            ));
        }

        let vm = ty.assembler_type();
        let def = self
            .env
            .externs
            .resolve(&vm, op_extern_name(op), &[vm.clone(), vm.clone()])
            .map_err(|e| BindError::new(span, e.into()))?;

        Ok(BoundExpr::Binary {
            signature: def.signature.clone(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: udon_type_from_vm(&def.ret),
        })
    }

    fn bind_equality(
        &mut self,
        op: BinaryOp,
        lhs: BoundExpr,
        rhs: BoundExpr,
        span: Span,
    ) -> Result<BoundExpr, BindError> {
        let name = op_extern_name(op);
        let (lt, rt) = (lhs.ty(), rhs.ty());

        // Mixed reference types (behaviour vs object element, either side
        // null) compare as objects; value types want matching operands.
        let (lhs, rhs, vm) = if lt == rt
            && (lt.is_numeric() || lt == UdonType::Bool || lt == UdonType::String)
        {
            let vm = lt.assembler_type();
            (lhs, rhs, vm)
        } else if (lt.is_reference() || lhs.is_null_literal())
            && (rt.is_reference() || rhs.is_null_literal())
        {
            (lhs, rhs, "SystemObject".to_string())
        } else {
            let (lhs, rhs) = self.unify_numeric(lhs, rhs, span)?;
            let ty = lhs.ty();
            if !(ty.is_numeric() || ty == UdonType::Bool || ty == UdonType::String) {
                return Err(BindError::new(
                    span,
                    BindErrorKind::TypeMismatch {
                        expected: lt.to_string(),
                        found: rt.to_string(),
                    },
                ));
            }
            let vm = ty.assembler_type();
            (lhs, rhs, vm)
        };

        let arg = if vm == "SystemObject" {
            "SystemObject".to_string()
        } else {
            vm.clone()
        };
        let def = self
            .env
            .externs
            .resolve(&vm, name, &[arg.clone(), arg])
            .map_err(|e| BindError::new(span, e.into()))?;

        Ok(BoundExpr::Binary {
            signature: def.signature.clone(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty: UdonType::Bool,
        })
    }

    /// Make both operands the same type, coercing literal sides.
    fn unify_numeric(
        &mut self,
        lhs: BoundExpr,
        rhs: BoundExpr,
        span: Span,
    ) -> Result<(BoundExpr, BoundExpr), BindError> {
        let (lt, rt) = (lhs.ty(), rhs.ty());
        if lt == rt {
            return Ok((lhs, rhs));
        }
        if matches!(rhs, BoundExpr::Literal { .. }) {
            if let Ok(rhs) = self.coerce(rhs.clone(), &lt, span) {
                return Ok((lhs, rhs));
            }
        }
        if matches!(lhs, BoundExpr::Literal { .. }) {
            if let Ok(lhs) = self.coerce(lhs.clone(), &rt, span) {
                return Ok((lhs, rhs));
            }
        }
        Err(BindError::new(
            span,
            BindErrorKind::TypeMismatch {
                expected: lt.to_string(),
                found: rt.to_string(),
            },
        ))
    }

    /// Coerce an expression to a target type. Identity, literal numeric
    /// widening and null-to-reference are the only conversions.
    fn coerce(
        &mut self,
        expr: BoundExpr,
        target: &UdonType,
        span: Span,
    ) -> Result<BoundExpr, BindError> {
        let ty = expr.ty();
        if ty == *target {
            return Ok(expr);
        }

        if let BoundExpr::Literal { value, .. } = &expr {
            if let Some(widened) = widen_literal(value, target) {
                return Ok(BoundExpr::Literal {
                    value: widened,
                    ty: target.clone(),
                });
            }
            if value.is_null() && ty == UdonType::Object && target.is_reference() {
                return Ok(BoundExpr::Literal {
                    value: UdonValue::Null,
                    ty: target.clone(),
                });
            }
        }

        Err(BindError::new(
            span,
            BindErrorKind::TypeMismatch {
                expected: target.to_string(),
                found: ty.to_string(),
            },
        ))
    }
}

fn op_extern_name(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "op_Addition",
        Sub => "op_Subtraction",
        Mul => "op_Multiplication",
        Div => "op_Division",
        Rem => "op_Remainder",
        Lt => "op_LessThan",
        Le => "op_LessThanOrEqual",
        Gt => "op_GreaterThan",
        Ge => "op_GreaterThanOrEqual",
        Eq => "op_Equality",
        Ne => "op_Inequality",
        And | Or => unreachable!("logical operators lower to branches"),
    }
}

/// Assembler-level argument types for overload resolution; untyped nulls
/// use the null sentinel.
fn vm_arg_types(args: &[BoundExpr]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            if arg.is_null_literal() {
                NULL_VM_TYPE.to_string()
            } else {
                arg.ty().assembler_type()
            }
        })
        .collect()
}

fn attr_number(arg: &AttrArg) -> Option<f64> {
    match arg {
        AttrArg::Int(v) => Some(*v as f64),
        AttrArg::Float(v) => Some(*v),
        _ => None,
    }
}

fn negate_literal(value: &UdonValue) -> Option<UdonValue> {
    Some(match value {
        UdonValue::Int32(v) => UdonValue::Int32(-v),
        UdonValue::Int64(v) => UdonValue::Int64(-v),
        UdonValue::Single(v) => UdonValue::Single(-v),
        UdonValue::Double(v) => UdonValue::Double(-v),
        _ => return None,
    })
}

/// Literal numeric widening: int literals adapt to the wider target, and
/// float literals widen to double.
fn widen_literal(value: &UdonValue, target: &UdonType) -> Option<UdonValue> {
    Some(match (value, target) {
        (UdonValue::Int32(v), UdonType::Int64) => UdonValue::Int64(*v as i64),
        (UdonValue::Int32(v), UdonType::Single) => UdonValue::Single(*v as f32),
        (UdonValue::Int32(v), UdonType::Double) => UdonValue::Double(*v as f64),
        (UdonValue::Single(v), UdonType::Double) => UdonValue::Double(*v as f64),
        _ => return None,
    })
}

/// Constant evaluation for field initializers.
fn const_eval(expr: &Expr, target: &UdonType) -> Result<UdonValue, BindError> {
    let mismatch = |span: Span, found: &str| {
        BindError::new(
            span,
            BindErrorKind::TypeMismatch {
                expected: target.to_string(),
                found: found.to_string(),
            },
        )
    };

    match expr {
        Expr::IntLit { value, long, span } => match (target, long) {
            (UdonType::Int32, false) => i32::try_from(*value)
                .map(UdonValue::Int32)
                .map_err(|_| mismatch(*span, "an out-of-range int")),
            (UdonType::Int64, _) => Ok(UdonValue::Int64(*value)),
            (UdonType::Single, false) => Ok(UdonValue::Single(*value as f32)),
            (UdonType::Double, false) => Ok(UdonValue::Double(*value as f64)),
            _ => Err(mismatch(*span, if *long { "long" } else { "int" })),
        },
        Expr::FloatLit {
            value,
            single,
            span,
        } => match (target, single) {
            (UdonType::Single, true) => Ok(UdonValue::Single(*value as f32)),
            (UdonType::Double, _) => Ok(UdonValue::Double(*value)),
            _ => Err(mismatch(*span, if *single { "float" } else { "double" })),
        },
        Expr::BoolLit { value, span } => match target {
            UdonType::Bool => Ok(UdonValue::Bool(*value)),
            _ => Err(mismatch(*span, "bool")),
        },
        Expr::StringLit { value, span } => match target {
            UdonType::String => Ok(UdonValue::String(value.clone())),
            _ => Err(mismatch(*span, "string")),
        },
        Expr::NullLit { span } => {
            if target.is_reference() {
                Ok(UdonValue::Null)
            } else {
                Err(mismatch(*span, "null"))
            }
        }
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
            span,
        } => {
            let inner = const_eval(expr, target)?;
            negate_literal(&inner).ok_or_else(|| mismatch(*span, "a non-numeric value"))
        }
        _ => Err(BindError::new(
            expr.span(),
            BindErrorKind::NonConstInitializer,
        )),
    }
}

/// Names of all locals and parameters declared anywhere in a method, used
/// to diagnose captures inside its local functions.
fn collect_local_names(decl: &MethodDecl) -> IndexSet<String> {
    fn walk_stmt(stmt: &Stmt, out: &mut IndexSet<String>) {
        match stmt {
            Stmt::Local { name, .. } => {
                out.insert(name.clone());
            }
            Stmt::If { then, els, .. } => {
                walk(&then.stmts, out);
                if let Some(els) = els {
                    walk(&els.stmts, out);
                }
            }
            Stmt::While { body, .. } => walk(&body.stmts, out),
            Stmt::For {
                init, step, body, ..
            } => {
                if let Some(init) = init {
                    walk_stmt(init, out);
                }
                if let Some(step) = step {
                    walk_stmt(step, out);
                }
                walk(&body.stmts, out);
            }
            _ => {}
        }
    }

    fn walk(stmts: &[Stmt], out: &mut IndexSet<String>) {
        for stmt in stmts {
            walk_stmt(stmt, out);
        }
    }

    let mut names = IndexSet::new();
    for param in &decl.params {
        names.insert(param.name.clone());
    }
    walk(&decl.body.stmts, &mut names);
    names
}
