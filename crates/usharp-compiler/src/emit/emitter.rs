//! Instruction emission and assembly-text rendering.
//!
//! Calling convention: arguments are pushed left to right, destination
//! slot last, then `EXTERN`. Internal calls copy arguments into the
//! callee's parameter slots, seed its return slot with a return-address
//! constant and jump to the body; the callee ends with `JUMP_INDIRECT` on
//! that slot. Exported entry points run a wrapper that seeds the return
//! slot with the halt address first, so an external dispatch halts where
//! an internal call returns.

use indexmap::IndexMap;

use usharp_asm::{Opcode, HALT_ADDRESS, STEP_SIZE};
use usharp_core::{SyncMode, UdonType, UdonValue};

use crate::bind::{BoundClass, BoundExpr, BoundMethod, BoundStmt, BoundTarget};

use super::error::EmitError;
use super::layout::{HeapLayout, PlannedSymbol};

/// Finished emission: assembly text plus the planned heap size.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitOutput {
    pub assembly: String,
    pub heap_size: u32,
}

/// Emit assembly for a bound class.
pub fn emit(class: &BoundClass) -> Result<EmitOutput, EmitError> {
    let mut emitter = Emitter::new(class);
    emitter.plan_heap()?;
    for method in &class.methods {
        emitter.emit_method(method)?;
    }
    emitter.resolve()?;
    let assembly = emitter.render();
    Ok(EmitOutput {
        assembly,
        heap_size: emitter.layout.heap_size(),
    })
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Label(u32);

#[derive(Clone, Debug)]
enum Operand {
    None,
    Sym(String),
    Lit(String),
    Label(Label),
    Addr(u32),
}

#[derive(Clone, Debug)]
struct AsmInstr {
    opcode: Opcode,
    operand: Operand,
}

struct MethodSlots {
    body_entry: Label,
    ret_slot: String,
    retval_slot: Option<String>,
}

struct Emitter<'a> {
    class: &'a BoundClass,
    layout: HeapLayout,
    instrs: Vec<AsmInstr>,
    /// Label id → instruction index, filled when the label is bound.
    labels: Vec<Option<usize>>,
    /// Instruction index → exported entry-point names (text pass).
    export_marks: Vec<(usize, String)>,
    /// (assembler type, rendered value) → constant slot name.
    consts: IndexMap<(String, String), String>,
    next_temp: u32,
    next_retaddr: u32,
    /// Return-address constants patched once addresses are known.
    retaddr_fixups: Vec<(String, Label)>,
    methods: IndexMap<String, MethodSlots>,
    /// Method name → local slot symbol per LocalId.
    local_slots: IndexMap<String, Vec<String>>,
}

impl<'a> Emitter<'a> {
    fn new(class: &'a BoundClass) -> Self {
        Self {
            class,
            layout: HeapLayout::new(),
            instrs: Vec::new(),
            labels: Vec::new(),
            export_marks: Vec::new(),
            consts: IndexMap::new(),
            next_temp: 0,
            next_retaddr: 0,
            retaddr_fixups: Vec::new(),
            methods: IndexMap::new(),
            local_slots: IndexMap::new(),
        }
    }

    /// Plan fields, compiler-internal symbols and per-method slots.
    fn plan_heap(&mut self) -> Result<(), EmitError> {
        for field in &self.class.fields {
            self.layout.add_symbol(
                field.name.clone(),
                PlannedSymbol {
                    ty: field.ty.clone(),
                    default: field.default.clone(),
                    exported: field.exported,
                    sync: field.sync,
                },
            )?;
        }

        // Host probes this slot to tell an initialized heap apart.
        self.layout.add_symbol(
            "__behaviour_id",
            PlannedSymbol {
                ty: UdonType::Int64,
                default: UdonValue::Int64(0),
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;
        self.layout.add_symbol(
            "__this",
            PlannedSymbol {
                ty: UdonType::Behaviour(Some(self.class.name.clone())),
                default: UdonValue::Null,
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;
        self.layout.add_symbol(
            "__const_end",
            PlannedSymbol {
                ty: UdonType::UInt32,
                default: UdonValue::UInt32(HALT_ADDRESS),
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;

        for method in &self.class.methods {
            let body_entry = self.fresh_label();

            let ret_slot = format!("__ret_{}", method.name);
            self.layout.add_symbol(
                ret_slot.clone(),
                PlannedSymbol {
                    ty: UdonType::UInt32,
                    default: UdonValue::UInt32(0),
                    exported: false,
                    sync: SyncMode::NotSynced,
                },
            )?;

            let retval_slot = if method.ret == UdonType::Void {
                None
            } else {
                let name = format!("__retval_{}", method.name);
                self.layout.add_symbol(
                    name.clone(),
                    PlannedSymbol {
                        ty: method.ret.clone(),
                        default: method.ret.default_value(),
                        exported: false,
                        sync: SyncMode::NotSynced,
                    },
                )?;
                Some(name)
            };

            let mut slots = Vec::with_capacity(method.locals.len());
            for (index, local) in method.locals.iter().enumerate() {
                let name = format!("__{}_{}_{}", method.name, local.name, index);
                self.layout.add_symbol(
                    name.clone(),
                    PlannedSymbol {
                        ty: local.ty.clone(),
                        default: local.ty.default_value(),
                        exported: false,
                        sync: SyncMode::NotSynced,
                    },
                )?;
                slots.push(name);
            }
            self.local_slots.insert(method.name.clone(), slots);

            self.methods.insert(
                method.name.clone(),
                MethodSlots {
                    body_entry,
                    ret_slot,
                    retval_slot,
                },
            );
        }

        Ok(())
    }

    // === Instruction helpers ===

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    fn bind_label(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.instrs.len());
    }

    fn push_instr(&mut self, opcode: Opcode, operand: Operand) {
        if let Operand::Lit(signature) = &operand {
            self.layout.intern_literal(signature);
        }
        self.instrs.push(AsmInstr { opcode, operand });
    }

    fn push_sym(&mut self, name: &str) {
        self.push_instr(Opcode::Push, Operand::Sym(name.to_string()));
    }

    fn copy(&mut self, src: &str, dst: &str) {
        if src == dst {
            return;
        }
        self.push_sym(src);
        self.push_sym(dst);
        self.push_instr(Opcode::Copy, Operand::None);
    }

    fn temp(&mut self, ty: &UdonType) -> Result<String, EmitError> {
        let name = format!("__t{}", self.next_temp);
        self.next_temp += 1;
        self.layout.add_symbol(
            name.clone(),
            PlannedSymbol {
                ty: ty.clone(),
                default: ty.default_value(),
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;
        Ok(name)
    }

    /// Constant slot for a literal, deduplicated by type and value.
    fn const_slot(&mut self, value: &UdonValue, ty: &UdonType) -> Result<String, EmitError> {
        let key = (ty.assembler_type(), render_default(value));
        if let Some(name) = self.consts.get(&key) {
            return Ok(name.clone());
        }
        let name = format!("__const_{}", self.consts.len());
        self.layout.add_symbol(
            name.clone(),
            PlannedSymbol {
                ty: ty.clone(),
                default: value.clone(),
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;
        self.consts.insert(key, name.clone());
        Ok(name)
    }

    // === Methods ===

    fn emit_method(&mut self, method: &BoundMethod) -> Result<(), EmitError> {
        let slots = self
            .methods
            .get(&method.name)
            .ok_or_else(|| EmitError::UnknownMethod(method.name.clone()))?;
        let body_entry = slots.body_entry;
        let ret_slot = slots.ret_slot.clone();

        if let Some(export) = &method.entry_point {
            // External dispatch seeds the return slot with the halt
            // address, so the body's return becomes an explicit halt.
            self.export_marks.push((self.instrs.len(), export.clone()));
            self.copy("__const_end", &ret_slot);
        }

        self.bind_label(body_entry);
        for stmt in &method.body {
            self.emit_stmt(stmt, method)?;
        }

        // Implicit return at the end of every body.
        self.push_instr(Opcode::JumpIndirect, Operand::Sym(ret_slot));
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &BoundStmt, method: &BoundMethod) -> Result<(), EmitError> {
        match stmt {
            BoundStmt::Assign { target, value } => match target {
                BoundTarget::Local(id) => {
                    let value = self.emit_value(value, method)?;
                    let dst = self.local_slot(method, id.0)?;
                    self.copy(&value, &dst);
                    Ok(())
                }
                BoundTarget::Field(name) => {
                    let value = self.emit_value(value, method)?;
                    let dst = name.clone();
                    self.copy(&value, &dst);
                    Ok(())
                }
                BoundTarget::Index {
                    arr,
                    index,
                    set_signature,
                } => {
                    let arr = self.emit_value(arr, method)?;
                    let index = self.emit_value(index, method)?;
                    let value = self.emit_value(value, method)?;
                    self.push_sym(&arr);
                    self.push_sym(&index);
                    self.push_sym(&value);
                    self.push_instr(Opcode::Extern, Operand::Lit(set_signature.clone()));
                    Ok(())
                }
            },

            BoundStmt::If { cond, then, els } => {
                let cond = self.emit_value(cond, method)?;
                let else_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.push_sym(&cond);
                self.push_instr(Opcode::JumpIfFalse, Operand::Label(else_label));
                for stmt in then {
                    self.emit_stmt(stmt, method)?;
                }
                self.push_instr(Opcode::Jump, Operand::Label(end_label));
                self.bind_label(else_label);
                for stmt in els {
                    self.emit_stmt(stmt, method)?;
                }
                self.bind_label(end_label);
                Ok(())
            }

            BoundStmt::While { cond, body } => {
                let start_label = self.fresh_label();
                let end_label = self.fresh_label();

                self.bind_label(start_label);
                let cond = self.emit_value(cond, method)?;
                self.push_sym(&cond);
                self.push_instr(Opcode::JumpIfFalse, Operand::Label(end_label));
                for stmt in body {
                    self.emit_stmt(stmt, method)?;
                }
                self.push_instr(Opcode::Jump, Operand::Label(start_label));
                self.bind_label(end_label);
                Ok(())
            }

            BoundStmt::Return { value } => {
                if let Some(value) = value {
                    let value = self.emit_value(value, method)?;
                    let retval = self
                        .methods
                        .get(&method.name)
                        .and_then(|s| s.retval_slot.clone())
                        .ok_or_else(|| EmitError::UnknownMethod(method.name.clone()))?;
                    self.copy(&value, &retval);
                }
                let ret_slot = self.methods[&method.name].ret_slot.clone();
                self.push_instr(Opcode::JumpIndirect, Operand::Sym(ret_slot));
                Ok(())
            }

            BoundStmt::Expr(expr) => {
                self.emit_expr(expr, method)?;
                Ok(())
            }
        }
    }

    fn local_slot(&self, method: &BoundMethod, id: u32) -> Result<String, EmitError> {
        self.local_slots
            .get(&method.name)
            .and_then(|slots| slots.get(id as usize))
            .cloned()
            .ok_or(EmitError::UnknownLocal(id))
    }

    /// Emit an expression that must produce a value.
    fn emit_value(&mut self, expr: &BoundExpr, method: &BoundMethod) -> Result<String, EmitError> {
        self.emit_expr(expr, method)?.ok_or(EmitError::VoidInValue)
    }

    /// Emit an expression; void expressions yield no slot.
    fn emit_expr(
        &mut self,
        expr: &BoundExpr,
        method: &BoundMethod,
    ) -> Result<Option<String>, EmitError> {
        match expr {
            BoundExpr::Literal { value, ty } => Ok(Some(self.const_slot(value, ty)?)),
            BoundExpr::Local { id, .. } => Ok(Some(self.local_slot(method, id.0)?)),
            BoundExpr::Field { name, .. } => Ok(Some(name.clone())),
            BoundExpr::This { .. } => Ok(Some("__this".to_string())),

            BoundExpr::Binary {
                signature,
                lhs,
                rhs,
                ty,
            } => {
                let lhs = self.emit_value(lhs, method)?;
                let rhs = self.emit_value(rhs, method)?;
                let dst = self.temp(ty)?;
                self.push_sym(&lhs);
                self.push_sym(&rhs);
                self.push_sym(&dst);
                self.push_instr(Opcode::Extern, Operand::Lit(signature.clone()));
                Ok(Some(dst))
            }

            BoundExpr::Logical { and, lhs, rhs } => {
                let dst = self.temp(&UdonType::Bool)?;
                let lhs = self.emit_value(lhs, method)?;
                self.copy(&lhs, &dst);

                if *and {
                    // false short-circuits
                    let end_label = self.fresh_label();
                    self.push_sym(&dst);
                    self.push_instr(Opcode::JumpIfFalse, Operand::Label(end_label));
                    let rhs = self.emit_value(rhs, method)?;
                    self.copy(&rhs, &dst);
                    self.bind_label(end_label);
                } else {
                    // true short-circuits
                    let rhs_label = self.fresh_label();
                    let end_label = self.fresh_label();
                    self.push_sym(&dst);
                    self.push_instr(Opcode::JumpIfFalse, Operand::Label(rhs_label));
                    self.push_instr(Opcode::Jump, Operand::Label(end_label));
                    self.bind_label(rhs_label);
                    let rhs = self.emit_value(rhs, method)?;
                    self.copy(&rhs, &dst);
                    self.bind_label(end_label);
                }
                Ok(Some(dst))
            }

            BoundExpr::Unary {
                signature,
                expr,
                ty,
            } => {
                let value = self.emit_value(expr, method)?;
                let dst = self.temp(ty)?;
                self.push_sym(&value);
                self.push_sym(&dst);
                self.push_instr(Opcode::Extern, Operand::Lit(signature.clone()));
                Ok(Some(dst))
            }

            BoundExpr::CallMethod {
                method: callee,
                args,
                ty,
            } => self.emit_call(callee, args, ty, method),

            BoundExpr::CallExtern {
                signature,
                args,
                ty,
            } => {
                let mut arg_syms = Vec::with_capacity(args.len());
                for arg in args {
                    arg_syms.push(self.emit_value(arg, method)?);
                }
                for sym in &arg_syms {
                    self.push_sym(sym);
                }
                if *ty == UdonType::Void {
                    self.push_instr(Opcode::Extern, Operand::Lit(signature.clone()));
                    Ok(None)
                } else {
                    let dst = self.temp(ty)?;
                    self.push_sym(&dst);
                    self.push_instr(Opcode::Extern, Operand::Lit(signature.clone()));
                    Ok(Some(dst))
                }
            }

            BoundExpr::NewArray {
                ctor_signature,
                set_signature,
                len,
                items,
                ty,
            } => {
                let len_sym = match len {
                    Some(len) => self.emit_value(len, method)?,
                    None => {
                        self.const_slot(&UdonValue::Int32(items.len() as i32), &UdonType::Int32)?
                    }
                };
                let dst = self.temp(ty)?;
                self.push_sym(&len_sym);
                self.push_sym(&dst);
                self.push_instr(Opcode::Extern, Operand::Lit(ctor_signature.clone()));

                for (index, item) in items.iter().enumerate() {
                    let set = set_signature
                        .clone()
                        .ok_or(EmitError::VoidInValue)?;
                    let item = self.emit_value(item, method)?;
                    let index =
                        self.const_slot(&UdonValue::Int32(index as i32), &UdonType::Int32)?;
                    self.push_sym(&dst);
                    self.push_sym(&index);
                    self.push_sym(&item);
                    self.push_instr(Opcode::Extern, Operand::Lit(set));
                }
                Ok(Some(dst))
            }
        }
    }

    /// Internal call: copy arguments, seed the return slot, jump to the
    /// callee body, then read the result out of its return-value slot.
    fn emit_call(
        &mut self,
        callee: &str,
        args: &[BoundExpr],
        ty: &UdonType,
        method: &BoundMethod,
    ) -> Result<Option<String>, EmitError> {
        let mut arg_syms = Vec::with_capacity(args.len());
        for arg in args {
            arg_syms.push(self.emit_value(arg, method)?);
        }

        let callee_slots = self
            .methods
            .get(callee)
            .ok_or_else(|| EmitError::UnknownMethod(callee.to_string()))?;
        let body_entry = callee_slots.body_entry;
        let ret_slot = callee_slots.ret_slot.clone();
        let retval_slot = callee_slots.retval_slot.clone();

        let param_slots: Vec<String> = self
            .local_slots
            .get(callee)
            .ok_or_else(|| EmitError::UnknownMethod(callee.to_string()))?
            .iter()
            .take(args.len())
            .cloned()
            .collect();

        for (sym, param) in arg_syms.iter().zip(param_slots.iter()) {
            self.copy(sym, param);
        }

        let retaddr = format!("__retaddr_{}", self.next_retaddr);
        self.next_retaddr += 1;
        self.layout.add_symbol(
            retaddr.clone(),
            PlannedSymbol {
                ty: UdonType::UInt32,
                default: UdonValue::UInt32(0),
                exported: false,
                sync: SyncMode::NotSynced,
            },
        )?;
        let after_label = self.fresh_label();
        self.retaddr_fixups.push((retaddr.clone(), after_label));

        self.copy(&retaddr, &ret_slot);
        self.push_instr(Opcode::Jump, Operand::Label(body_entry));
        self.bind_label(after_label);

        // Copy the result out immediately so a second call cannot clobber
        // this one's intermediate value.
        match (ty, retval_slot) {
            (UdonType::Void, _) | (_, None) => Ok(None),
            (ty, Some(retval)) => {
                let dst = self.temp(ty)?;
                self.copy(&retval, &dst);
                Ok(Some(dst))
            }
        }
    }

    // === Resolution and rendering ===

    /// Second pass: replace labels with code addresses and patch
    /// return-address constants.
    fn resolve(&mut self) -> Result<(), EmitError> {
        let addresses: Vec<Option<u32>> = self
            .labels
            .iter()
            .map(|slot| slot.map(|idx| idx as u32 * STEP_SIZE))
            .collect();

        for instr in &mut self.instrs {
            if let Operand::Label(label) = &instr.operand {
                let label = *label;
                let address = addresses
                    .get(label.0 as usize)
                    .copied()
                    .flatten()
                    .ok_or(EmitError::UnresolvedLabel(label.0))?;
                instr.operand = Operand::Addr(address);
            }
        }

        let fixups = std::mem::take(&mut self.retaddr_fixups);
        for (symbol, label) in fixups {
            let address = addresses
                .get(label.0 as usize)
                .copied()
                .flatten()
                .ok_or(EmitError::UnresolvedLabel(label.0))?;
            self.layout.set_default(&symbol, UdonValue::UInt32(address));
        }

        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(".data_start\n");
        for (name, sym) in self.layout.symbols() {
            if sym.exported {
                out.push_str(&format!("    .export {name}\n"));
            }
            if sym.sync != SyncMode::NotSynced {
                out.push_str(&format!("    .sync {name}, {}\n", sym.sync));
            }
            out.push_str(&format!(
                "    {name}: %{}, {}\n",
                sym.ty.assembler_type(),
                render_default(&sym.default)
            ));
        }
        out.push_str(".data_end\n");

        out.push_str(".code_start\n");
        for (idx, instr) in self.instrs.iter().enumerate() {
            for (mark_idx, name) in &self.export_marks {
                if *mark_idx == idx {
                    out.push_str(&format!("    .export {name}\n"));
                    out.push_str(&format!("    {name}:\n"));
                }
            }
            match &instr.operand {
                Operand::None => {
                    out.push_str(&format!("        {}\n", instr.opcode.mnemonic()));
                }
                Operand::Sym(name) => {
                    out.push_str(&format!("        {}, {name}\n", instr.opcode.mnemonic()));
                }
                Operand::Lit(signature) => {
                    out.push_str(&format!(
                        "        {}, {}\n",
                        instr.opcode.mnemonic(),
                        quote(signature)
                    ));
                }
                Operand::Addr(address) => {
                    out.push_str(&format!(
                        "        {}, 0x{address:08X}\n",
                        instr.opcode.mnemonic()
                    ));
                }
                Operand::Label(label) => {
                    // resolve() replaces every label; this line never
                    // renders from a successful emission.
                    out.push_str(&format!(
                        "        {}, <label {}>\n",
                        instr.opcode.mnemonic(),
                        label.0
                    ));
                }
            }
        }
        out.push_str(".code_end\n");

        out
    }
}

fn render_default(value: &UdonValue) -> String {
    match value {
        UdonValue::Null => "null".to_string(),
        UdonValue::Bool(v) => v.to_string(),
        UdonValue::Int32(v) => v.to_string(),
        UdonValue::Int64(v) => v.to_string(),
        UdonValue::UInt32(v) => format!("0x{v:08X}"),
        UdonValue::Single(v) => format!("{v:?}"),
        UdonValue::Double(v) => format!("{v:?}"),
        UdonValue::String(s) => quote(s),
        // Aggregate defaults are always null in the data section
        UdonValue::Vector3(_)
        | UdonValue::Color(_)
        | UdonValue::BehaviourRef(_)
        | UdonValue::Array(_) => "null".to_string(),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
