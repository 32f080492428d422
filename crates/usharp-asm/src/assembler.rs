//! Text assembler for the target VM.
//!
//! Input is newline-delimited assembly: directives, data declarations,
//! labels, instructions and `#` comments. Output is a finalized `Program`
//! sized to the heap size handed in by the caller's heap factory.
//!
//! Layout contract: named symbols take heap addresses in declaration order
//! starting at 0; extern signature literals are interned by value and take
//! the addresses after the last named symbol, in first-use order. The heap
//! layout planner on the compiler side computes sizes under the same rule.
//!
//! ```text
//! .data_start
//!     .export counter
//!     .sync counter, none
//!     counter: %SystemInt32, 0
//! .data_end
//! .code_start
//!     .export _interact
//!     _interact:
//!         PUSH, counter
//!         JUMP, 0xFFFFFFFC
//! .code_end
//! ```

use std::collections::HashMap;

use usharp_core::{Interner, SyncMode, UdonValue};

use crate::opcode::{Instruction, Opcode, STEP_SIZE};
use crate::program::{EntryPoints, Heap, HeapSymbol, Program, SymbolTable};

/// Errors raised while assembling. Messages are display-ready; the caller
/// stores them on the owning asset verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("line {line}: unexpected content '{text}'")]
    UnexpectedLine { line: usize, text: String },

    #[error("line {line}: malformed directive")]
    MalformedDirective { line: usize },

    #[error("line {line}: duplicate symbol '{name}'")]
    DuplicateSymbol { line: usize, name: String },

    #[error("line {line}: duplicate label '{name}'")]
    DuplicateLabel { line: usize, name: String },

    #[error("line {line}: unknown opcode '{mnemonic}'")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("line {line}: {mnemonic} requires an operand")]
    MissingOperand { line: usize, mnemonic: String },

    #[error("line {line}: {mnemonic} takes no operand")]
    UnexpectedOperand { line: usize, mnemonic: String },

    #[error("line {line}: bad operand: {detail}")]
    BadOperand { line: usize, detail: String },

    #[error("line {line}: unknown symbol '{name}'")]
    UnknownSymbol { line: usize, name: String },

    #[error("line {line}: bad default value: {detail}")]
    BadDefault { line: usize, detail: String },

    #[error("line {line}: unknown sync mode '{mode}'")]
    UnknownSyncMode { line: usize, mode: String },

    #[error("jump target '{name}' is not defined")]
    UndefinedLabel { name: String },

    #[error("exported name '{name}' is not defined")]
    ExportUnknownSymbol { name: String },

    #[error("heap overflow: program needs {needed} slots but the heap holds {available}")]
    HeapOverflow { needed: u32, available: u32 },
}

/// Carries the heap size from the layout planner into `assemble`.
///
/// One factory instance is shared across a batch compile; the caller sets
/// `factory_heap_size` before each unit. Mirrors the non-re-entrant,
/// one-compile-at-a-time contract of the compiler context that owns it.
#[derive(Debug, Clone, Default)]
pub struct HeapFactory {
    pub factory_heap_size: u32,
}

impl HeapFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble with the currently configured heap size.
    pub fn assemble(&self, text: &str) -> Result<Program, AssemblyError> {
        assemble(text, self.factory_heap_size)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Outside,
    Data,
    Code,
}

enum Operand {
    Resolved(u32),
    LabelRef { name: String, line: usize },
}

/// Assemble program text with the given heap size.
pub fn assemble(text: &str, heap_size: u32) -> Result<Program, AssemblyError> {
    let mut section = Section::Outside;

    let mut symbols = SymbolTable::new();
    let mut defaults: Vec<UdonValue> = Vec::new();
    let mut data_exports: Vec<(String, usize)> = Vec::new();
    let mut data_syncs: Vec<(String, SyncMode, usize)> = Vec::new();

    let mut literals = Interner::new();
    let mut pending: Vec<(Opcode, Operand)> = Vec::new();
    let mut labels: HashMap<String, u32> = HashMap::new();
    let mut code_exports: Vec<String> = Vec::new();
    // EXTERN operands are patched once the symbol count is final.
    let mut literal_fixups: Vec<(usize, u32)> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        match line {
            ".data_start" => {
                section = Section::Data;
                continue;
            }
            ".data_end" | ".code_end" => {
                section = Section::Outside;
                continue;
            }
            ".code_start" => {
                section = Section::Code;
                continue;
            }
            _ => {}
        }

        if let Some(rest) = line.strip_prefix(".export ") {
            let name = rest.trim().to_string();
            if name.is_empty() {
                return Err(AssemblyError::MalformedDirective { line: line_no });
            }
            match section {
                Section::Data => data_exports.push((name, line_no)),
                Section::Code => code_exports.push(name),
                Section::Outside => {
                    return Err(AssemblyError::UnexpectedLine {
                        line: line_no,
                        text: line.to_string(),
                    });
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(".sync ") {
            if section != Section::Data {
                return Err(AssemblyError::UnexpectedLine {
                    line: line_no,
                    text: line.to_string(),
                });
            }
            let Some((name, mode)) = rest.split_once(',') else {
                return Err(AssemblyError::MalformedDirective { line: line_no });
            };
            let mode_str = mode.trim();
            let Some(mode) = SyncMode::parse(mode_str) else {
                return Err(AssemblyError::UnknownSyncMode {
                    line: line_no,
                    mode: mode_str.to_string(),
                });
            };
            data_syncs.push((name.trim().to_string(), mode, line_no));
            continue;
        }

        if line.starts_with('.') {
            return Err(AssemblyError::MalformedDirective { line: line_no });
        }

        match section {
            Section::Data => {
                parse_data_decl(line, line_no, &mut symbols, &mut defaults)?;
            }
            Section::Code => {
                if let Some(name) = line.strip_suffix(':') {
                    let name = name.trim();
                    if name.is_empty() || name.contains(char::is_whitespace) {
                        return Err(AssemblyError::UnexpectedLine {
                            line: line_no,
                            text: line.to_string(),
                        });
                    }
                    let address = pending.len() as u32 * STEP_SIZE;
                    if labels.insert(name.to_string(), address).is_some() {
                        return Err(AssemblyError::DuplicateLabel {
                            line: line_no,
                            name: name.to_string(),
                        });
                    }
                    continue;
                }
                parse_instruction(
                    line,
                    line_no,
                    &symbols,
                    &mut literals,
                    &mut pending,
                    &mut literal_fixups,
                )?;
            }
            Section::Outside => {
                return Err(AssemblyError::UnexpectedLine {
                    line: line_no,
                    text: line.to_string(),
                });
            }
        }
    }

    // Apply data-section directives now that all symbols are declared.
    for (name, _line) in data_exports {
        if !symbols.set_exported(&name) {
            return Err(AssemblyError::ExportUnknownSymbol { name });
        }
    }
    for (name, mode, line) in data_syncs {
        if !symbols.set_sync(&name, mode) {
            return Err(AssemblyError::UnknownSymbol { line, name });
        }
    }

    // Literal heap slots live after the named symbols.
    let symbol_count = symbols.len() as u32;
    let needed = symbol_count + literals.len() as u32;
    if needed > heap_size {
        return Err(AssemblyError::HeapOverflow {
            needed,
            available: heap_size,
        });
    }

    for (instr_idx, literal_sym) in literal_fixups {
        let op = pending[instr_idx].0;
        pending[instr_idx] = (op, Operand::Resolved(symbol_count + literal_sym));
    }

    // Resolve label references and finalize the instruction stream.
    let mut instructions = Vec::with_capacity(pending.len());
    for (opcode, operand) in pending {
        let operand = match operand {
            Operand::Resolved(v) => v,
            Operand::LabelRef { name, .. } => match labels.get(&name) {
                Some(&addr) => addr,
                None => return Err(AssemblyError::UndefinedLabel { name }),
            },
        };
        instructions.push(Instruction::new(opcode, operand));
    }

    // Entry points: exported code labels, in export order.
    let mut entry_points = EntryPoints::new();
    for name in code_exports {
        let Some(&address) = labels.get(&name) else {
            return Err(AssemblyError::ExportUnknownSymbol { name });
        };
        entry_points.insert(name, address);
    }

    // Heap template: symbol defaults, then interned literal strings.
    let mut heap = Heap::new(heap_size);
    for (address, value) in defaults.into_iter().enumerate() {
        heap.set(address as u32, value);
    }
    for (sym, text) in literals.iter() {
        heap.set(symbol_count + sym.as_u32(), UdonValue::String(text.to_string()));
    }

    Ok(Program {
        instructions,
        heap,
        symbols,
        entry_points,
    })
}

fn parse_data_decl(
    line: &str,
    line_no: usize,
    symbols: &mut SymbolTable,
    defaults: &mut Vec<UdonValue>,
) -> Result<(), AssemblyError> {
    let Some((name, rest)) = line.split_once(':') else {
        return Err(AssemblyError::UnexpectedLine {
            line: line_no,
            text: line.to_string(),
        });
    };
    let name = name.trim();
    let rest = rest.trim();

    let Some(rest) = rest.strip_prefix('%') else {
        return Err(AssemblyError::UnexpectedLine {
            line: line_no,
            text: line.to_string(),
        });
    };
    let Some((vm_type, default)) = rest.split_once(',') else {
        return Err(AssemblyError::UnexpectedLine {
            line: line_no,
            text: line.to_string(),
        });
    };
    let vm_type = vm_type.trim();
    let default = parse_default(vm_type, default.trim(), line_no)?;

    let address = symbols.len() as u32;
    let inserted = symbols.insert(
        name.to_string(),
        HeapSymbol {
            address,
            vm_type: vm_type.to_string(),
            exported: false,
            sync: SyncMode::NotSynced,
        },
    );
    if !inserted {
        return Err(AssemblyError::DuplicateSymbol {
            line: line_no,
            name: name.to_string(),
        });
    }
    defaults.push(default);
    Ok(())
}

fn parse_default(vm_type: &str, text: &str, line: usize) -> Result<UdonValue, AssemblyError> {
    if text == "null" {
        return Ok(UdonValue::Null);
    }

    let bad = |detail: String| AssemblyError::BadDefault { line, detail };

    match vm_type {
        "SystemBoolean" => match text {
            "true" => Ok(UdonValue::Bool(true)),
            "false" => Ok(UdonValue::Bool(false)),
            other => Err(bad(format!("'{other}' is not a boolean"))),
        },
        "SystemInt32" => text
            .parse::<i32>()
            .map(UdonValue::Int32)
            .map_err(|e| bad(format!("'{text}': {e}"))),
        "SystemInt64" => text
            .parse::<i64>()
            .map(UdonValue::Int64)
            .map_err(|e| bad(format!("'{text}': {e}"))),
        "SystemUInt32" => parse_u32(text)
            .map(UdonValue::UInt32)
            .ok_or_else(|| bad(format!("'{text}' is not a u32"))),
        "SystemSingle" => text
            .parse::<f32>()
            .map(UdonValue::Single)
            .map_err(|e| bad(format!("'{text}': {e}"))),
        "SystemDouble" => text
            .parse::<f64>()
            .map(UdonValue::Double)
            .map_err(|e| bad(format!("'{text}': {e}"))),
        "SystemString" => parse_quoted(text)
            .map(UdonValue::String)
            .ok_or_else(|| bad(format!("'{text}' is not a quoted string"))),
        _ => Err(bad(format!(
            "type %{vm_type} only accepts a null default"
        ))),
    }
}

fn parse_instruction(
    line: &str,
    line_no: usize,
    symbols: &SymbolTable,
    literals: &mut Interner,
    pending: &mut Vec<(Opcode, Operand)>,
    literal_fixups: &mut Vec<(usize, u32)>,
) -> Result<(), AssemblyError> {
    let (mnemonic, operand_text) = match line.split_once(',') {
        Some((m, rest)) => (m.trim(), Some(rest.trim())),
        None => (line.trim(), None),
    };

    let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
        return Err(AssemblyError::UnknownOpcode {
            line: line_no,
            mnemonic: mnemonic.to_string(),
        });
    };

    let operand_text = match (opcode.has_operand(), operand_text) {
        (true, Some(text)) if !text.is_empty() => Some(text),
        (true, _) => {
            return Err(AssemblyError::MissingOperand {
                line: line_no,
                mnemonic: mnemonic.to_string(),
            });
        }
        (false, Some(_)) => {
            return Err(AssemblyError::UnexpectedOperand {
                line: line_no,
                mnemonic: mnemonic.to_string(),
            });
        }
        (false, None) => None,
    };

    let operand = match opcode {
        Opcode::Nop | Opcode::Pop | Opcode::Copy => Operand::Resolved(0),
        Opcode::Push | Opcode::JumpIndirect => {
            let name = operand_text.unwrap_or_default();
            match symbols.address_of(name) {
                Some(addr) => Operand::Resolved(addr),
                None => {
                    return Err(AssemblyError::UnknownSymbol {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
            }
        }
        Opcode::Jump | Opcode::JumpIfFalse => {
            let text = operand_text.unwrap_or_default();
            match parse_u32(text) {
                Some(addr) => Operand::Resolved(addr),
                None => Operand::LabelRef {
                    name: text.to_string(),
                    line: line_no,
                },
            }
        }
        Opcode::Extern => {
            let text = operand_text.unwrap_or_default();
            let Some(signature) = parse_quoted(text) else {
                return Err(AssemblyError::BadOperand {
                    line: line_no,
                    detail: format!("EXTERN expects a quoted signature, got '{text}'"),
                });
            };
            let sym = literals.intern_owned(signature);
            literal_fixups.push((pending.len(), sym.as_u32()));
            Operand::Resolved(0)
        }
    };

    pending.push((opcode, operand));
    Ok(())
}

fn parse_u32(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse::<u32>().ok()
    }
}

/// Unquote a string literal, handling `\"`, `\\`, `\n` and `\t`.
fn parse_quoted(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            _ => return None,
        }
    }
    Some(out)
}

/// Strip a trailing `#` comment, ignoring `#` inside quoted operands.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' if in_quotes => escaped = !escaped,
            '"' if !escaped => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..i],
            _ => escaped = false,
        }
    }
    line
}
