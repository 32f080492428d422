//! Reference interpreter for compiled programs.
//!
//! This is test tooling, not the production VM: it executes the instruction
//! stream against a copy of the heap template so the compiler's tests can
//! observe end-to-end behaviour (entry dispatch, extern evaluation, heap
//! mutation). It implements exactly the extern set the compiler can emit.
//!
//! Extern calling convention: arguments are pushed left to right (receiver
//! first for instance externs), destination slot last for non-void returns.

use usharp_core::{UdonArray, UdonType, UdonValue};

use crate::opcode::{Opcode, HALT_ADDRESS, STEP_SIZE};
use crate::program::Program;

/// Runtime failures. Any of these indicates either a malformed program or
/// an extern outside the supported surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpError {
    #[error("entry point '{0}' not found")]
    UnknownEntryPoint(String),

    #[error("code address {0:#010x} out of range")]
    InvalidCodeAddress(u32),

    #[error("heap address {0} out of range")]
    InvalidHeapAddress(u32),

    #[error("VM stack underflow")]
    StackUnderflow,

    #[error("extern '{0}' is not supported by the reference interpreter")]
    UnsupportedExtern(String),

    #[error("extern '{signature}' applied to incompatible value {value}")]
    TypeMismatch { signature: String, value: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("array index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: i32, len: usize },

    #[error("execution limit exceeded")]
    FuelExhausted,
}

/// Interpreter over one program with its own mutable heap copy.
pub struct Interpreter<'p> {
    program: &'p Program,
    heap: Vec<UdonValue>,
    stack: Vec<u32>,
    /// Remaining steps before the run aborts.
    fuel: u32,
}

const DEFAULT_FUEL: u32 = 1_000_000;

/// Instance externs pop a receiver in addition to their declared parameters.
fn is_instance_extern(name: &str) -> bool {
    matches!(
        name,
        "ToString" | "Get" | "Set" | "get_Length" | "SendCustomEvent"
    )
}

impl<'p> Interpreter<'p> {
    /// Create an interpreter with a fresh copy of the heap template.
    ///
    /// The `__this` slot, when present, is seeded with a behaviour
    /// reference the way the host VM would on instantiation.
    pub fn new(program: &'p Program) -> Self {
        let mut heap = program.heap.to_vec();
        if let Some(addr) = program.symbols.address_of("__this") {
            heap[addr as usize] = UdonValue::BehaviourRef(0);
        }
        Self {
            program,
            heap,
            stack: Vec::new(),
            fuel: DEFAULT_FUEL,
        }
    }

    pub fn with_fuel(mut self, fuel: u32) -> Self {
        self.fuel = fuel;
        self
    }

    /// Current value of a heap slot.
    pub fn heap_value(&self, address: u32) -> Option<&UdonValue> {
        self.heap.get(address as usize)
    }

    /// Current value of a named symbol.
    pub fn symbol_value(&self, name: &str) -> Option<&UdonValue> {
        let addr = self.program.symbols.address_of(name)?;
        self.heap.get(addr as usize)
    }

    /// Override a named symbol before running, as a public-variable table
    /// application would.
    pub fn set_symbol(&mut self, name: &str, value: UdonValue) -> bool {
        match self.program.symbols.address_of(name) {
            Some(addr) => {
                self.heap[addr as usize] = value;
                true
            }
            None => false,
        }
    }

    /// Run an exported entry point to completion.
    pub fn run_event(&mut self, name: &str) -> Result<(), InterpError> {
        let Some(entry) = self.program.entry_points.address_of(name) else {
            return Err(InterpError::UnknownEntryPoint(name.to_string()));
        };
        self.run_from(entry)
    }

    fn run_from(&mut self, mut pc: u32) -> Result<(), InterpError> {
        loop {
            if pc == HALT_ADDRESS {
                return Ok(());
            }
            if self.fuel == 0 {
                return Err(InterpError::FuelExhausted);
            }
            self.fuel -= 1;

            let Some(instr) = self.program.instruction_at(pc) else {
                return Err(InterpError::InvalidCodeAddress(pc));
            };
            let mut next = pc + STEP_SIZE;

            match instr.opcode {
                Opcode::Nop => {}
                Opcode::Push => self.stack.push(instr.operand),
                Opcode::Pop => {
                    self.pop()?;
                }
                Opcode::Copy => {
                    let dst = self.pop()?;
                    let src = self.pop()?;
                    let value = self.read(src)?.clone();
                    self.write(dst, value)?;
                }
                Opcode::Jump => next = instr.operand,
                Opcode::JumpIfFalse => {
                    let cond = self.pop()?;
                    match self.read(cond)? {
                        UdonValue::Bool(true) => {}
                        UdonValue::Bool(false) => next = instr.operand,
                        other => {
                            return Err(InterpError::TypeMismatch {
                                signature: "JUMP_IF_FALSE".to_string(),
                                value: other.display_string(),
                            });
                        }
                    }
                }
                Opcode::JumpIndirect => {
                    let value = self.read(instr.operand)?;
                    let Some(target) = value.as_u32() else {
                        return Err(InterpError::TypeMismatch {
                            signature: "JUMP_INDIRECT".to_string(),
                            value: value.display_string(),
                        });
                    };
                    next = target;
                }
                Opcode::Extern => {
                    let value = self.read(instr.operand)?.clone();
                    let Some(signature) = value.as_str() else {
                        return Err(InterpError::TypeMismatch {
                            signature: "EXTERN".to_string(),
                            value: value.display_string(),
                        });
                    };
                    self.eval_extern(signature)?;
                }
            }

            pc = next;
        }
    }

    fn pop(&mut self) -> Result<u32, InterpError> {
        self.stack.pop().ok_or(InterpError::StackUnderflow)
    }

    fn read(&self, address: u32) -> Result<&UdonValue, InterpError> {
        self.heap
            .get(address as usize)
            .ok_or(InterpError::InvalidHeapAddress(address))
    }

    fn write(&mut self, address: u32, value: UdonValue) -> Result<(), InterpError> {
        match self.heap.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(InterpError::InvalidHeapAddress(address)),
        }
    }

    fn eval_extern(&mut self, signature: &str) -> Result<(), InterpError> {
        let parsed = parse_signature(signature)
            .ok_or_else(|| InterpError::UnsupportedExtern(signature.to_string()))?;

        let is_void = parsed.ret == "SystemVoid";
        // Destination address is on top unless the extern returns void.
        let dst = if is_void { None } else { Some(self.pop()?) };

        let argc = parsed.params.len() + usize::from(is_instance_extern(parsed.name));
        let mut addrs = Vec::with_capacity(argc);
        for _ in 0..argc {
            addrs.push(self.pop()?);
        }
        addrs.reverse();

        // Set mutates the receiver's heap slot in place; everything else
        // works on cloned argument values.
        if parsed.name == "Set" {
            return self.extern_array_set(signature, &addrs);
        }
        if parsed.name == "SendCustomEvent" {
            return self.extern_send_custom_event(signature, &addrs);
        }

        let mut args = Vec::with_capacity(addrs.len());
        for addr in addrs {
            args.push(self.read(addr)?.clone());
        }

        let result = self.apply_extern(signature, &parsed, &args)?;
        if let (Some(dst), Some(result)) = (dst, result) {
            self.write(dst, result)?;
        }
        Ok(())
    }

    fn extern_array_set(&mut self, signature: &str, addrs: &[u32]) -> Result<(), InterpError> {
        let [recv, index, value] = addrs else {
            return Err(InterpError::UnsupportedExtern(signature.to_string()));
        };
        let index = match self.read(*index)? {
            UdonValue::Int32(i) => *i,
            other => {
                return Err(InterpError::TypeMismatch {
                    signature: signature.to_string(),
                    value: other.display_string(),
                });
            }
        };
        let value = self.read(*value)?.clone();

        let slot = self
            .heap
            .get_mut(*recv as usize)
            .ok_or(InterpError::InvalidHeapAddress(*recv))?;
        let UdonValue::Array(arr) = slot else {
            return Err(InterpError::TypeMismatch {
                signature: signature.to_string(),
                value: slot.display_string(),
            });
        };
        let len = arr.items.len();
        match arr.items.get_mut(index as usize) {
            Some(item) => {
                *item = value;
                Ok(())
            }
            None => Err(InterpError::IndexOutOfBounds { index, len }),
        }
    }

    /// Runtime custom-event dispatch. Only the self reference resolves in
    /// the reference interpreter; there is no scene to look up other
    /// behaviours in.
    fn extern_send_custom_event(
        &mut self,
        signature: &str,
        addrs: &[u32],
    ) -> Result<(), InterpError> {
        let [recv, name] = addrs else {
            return Err(InterpError::UnsupportedExtern(signature.to_string()));
        };
        let receiver = self.read(*recv)?.clone();
        let event = match self.read(*name)? {
            UdonValue::String(s) => s.clone(),
            other => {
                return Err(InterpError::TypeMismatch {
                    signature: signature.to_string(),
                    value: other.display_string(),
                });
            }
        };

        match receiver {
            UdonValue::BehaviourRef(0) => self.run_event(&event),
            other => Err(InterpError::TypeMismatch {
                signature: signature.to_string(),
                value: other.display_string(),
            }),
        }
    }

    fn apply_extern(
        &mut self,
        signature: &str,
        parsed: &ParsedSignature<'_>,
        args: &[UdonValue],
    ) -> Result<Option<UdonValue>, InterpError> {
        let unsupported = || InterpError::UnsupportedExtern(signature.to_string());

        match parsed.name {
            "op_Addition" | "op_Subtraction" | "op_Multiplication" | "op_Division"
            | "op_Remainder" => {
                let [a, b] = args else { return Err(unsupported()) };
                Ok(Some(numeric_binary(parsed.name, a, b, signature)?))
            }
            "op_LessThan" | "op_GreaterThan" | "op_LessThanOrEqual" | "op_GreaterThanOrEqual" => {
                let [a, b] = args else { return Err(unsupported()) };
                Ok(Some(numeric_compare(parsed.name, a, b, signature)?))
            }
            "op_Equality" => {
                let [a, b] = args else { return Err(unsupported()) };
                Ok(Some(UdonValue::Bool(a == b)))
            }
            "op_Inequality" => {
                let [a, b] = args else { return Err(unsupported()) };
                Ok(Some(UdonValue::Bool(a != b)))
            }
            "op_UnaryMinus" => {
                let [a] = args else { return Err(unsupported()) };
                let negated = match a {
                    UdonValue::Int32(v) => UdonValue::Int32(-v),
                    UdonValue::Int64(v) => UdonValue::Int64(-v),
                    UdonValue::Single(v) => UdonValue::Single(-v),
                    UdonValue::Double(v) => UdonValue::Double(-v),
                    other => {
                        return Err(InterpError::TypeMismatch {
                            signature: signature.to_string(),
                            value: other.display_string(),
                        });
                    }
                };
                Ok(Some(negated))
            }
            "op_UnaryNegation" => {
                let [UdonValue::Bool(b)] = args else { return Err(unsupported()) };
                Ok(Some(UdonValue::Bool(!b)))
            }
            "ToString" => {
                let [a] = args else { return Err(unsupported()) };
                Ok(Some(UdonValue::String(a.display_string())))
            }
            "Concat" => {
                let [a, b] = args else { return Err(unsupported()) };
                let mut s = string_of(a);
                s.push_str(&string_of(b));
                Ok(Some(UdonValue::String(s)))
            }
            "ctor" if parsed.vm_type.ends_with("Array") => {
                let [UdonValue::Int32(len)] = args else { return Err(unsupported()) };
                let elem = element_type_of(parsed.vm_type).ok_or_else(unsupported)?;
                Ok(Some(UdonValue::Array(UdonArray::new(elem, *len as usize))))
            }
            "Get" => {
                let [UdonValue::Array(arr), UdonValue::Int32(index)] = args else {
                    return Err(unsupported());
                };
                let item =
                    arr.items
                        .get(*index as usize)
                        .ok_or(InterpError::IndexOutOfBounds {
                            index: *index,
                            len: arr.items.len(),
                        })?;
                Ok(Some(item.clone()))
            }
            "get_Length" => {
                let [value] = args else { return Err(unsupported()) };
                match value {
                    UdonValue::Array(arr) => Ok(Some(UdonValue::Int32(arr.items.len() as i32))),
                    UdonValue::String(s) => Ok(Some(UdonValue::Int32(s.len() as i32))),
                    other => Err(InterpError::TypeMismatch {
                        signature: signature.to_string(),
                        value: other.display_string(),
                    }),
                }
            }
            "Log" => Ok(None),
            _ => Err(unsupported()),
        }
    }
}

fn numeric_binary(
    op: &str,
    a: &UdonValue,
    b: &UdonValue,
    signature: &str,
) -> Result<UdonValue, InterpError> {
    macro_rules! arith {
        ($a:expr, $b:expr, $wrap:path, int) => {
            match op {
                "op_Addition" => $wrap($a.wrapping_add($b)),
                "op_Subtraction" => $wrap($a.wrapping_sub($b)),
                "op_Multiplication" => $wrap($a.wrapping_mul($b)),
                "op_Division" => {
                    $wrap($a.checked_div($b).ok_or(InterpError::DivideByZero)?)
                }
                _ => $wrap($a.checked_rem($b).ok_or(InterpError::DivideByZero)?),
            }
        };
        ($a:expr, $b:expr, $wrap:path, float) => {
            match op {
                "op_Addition" => $wrap($a + $b),
                "op_Subtraction" => $wrap($a - $b),
                "op_Multiplication" => $wrap($a * $b),
                "op_Division" => $wrap($a / $b),
                _ => $wrap($a % $b),
            }
        };
    }

    Ok(match (a, b) {
        (UdonValue::Int32(a), UdonValue::Int32(b)) => arith!(a, *b, UdonValue::Int32, int),
        (UdonValue::Int64(a), UdonValue::Int64(b)) => arith!(a, *b, UdonValue::Int64, int),
        (UdonValue::Single(a), UdonValue::Single(b)) => arith!(a, *b, UdonValue::Single, float),
        (UdonValue::Double(a), UdonValue::Double(b)) => arith!(a, *b, UdonValue::Double, float),
        _ => {
            return Err(InterpError::TypeMismatch {
                signature: signature.to_string(),
                value: format!("{} / {}", a.display_string(), b.display_string()),
            });
        }
    })
}

fn numeric_compare(
    op: &str,
    a: &UdonValue,
    b: &UdonValue,
    signature: &str,
) -> Result<UdonValue, InterpError> {
    macro_rules! cmp {
        ($a:expr, $b:expr) => {
            match op {
                "op_LessThan" => $a < $b,
                "op_GreaterThan" => $a > $b,
                "op_LessThanOrEqual" => $a <= $b,
                _ => $a >= $b,
            }
        };
    }

    let result = match (a, b) {
        (UdonValue::Int32(a), UdonValue::Int32(b)) => cmp!(a, b),
        (UdonValue::Int64(a), UdonValue::Int64(b)) => cmp!(a, b),
        (UdonValue::Single(a), UdonValue::Single(b)) => cmp!(a, b),
        (UdonValue::Double(a), UdonValue::Double(b)) => cmp!(a, b),
        _ => {
            return Err(InterpError::TypeMismatch {
                signature: signature.to_string(),
                value: format!("{} / {}", a.display_string(), b.display_string()),
            });
        }
    };
    Ok(UdonValue::Bool(result))
}

fn string_of(value: &UdonValue) -> String {
    match value {
        UdonValue::String(s) => s.clone(),
        other => other.display_string(),
    }
}

fn element_type_of(array_vm_type: &str) -> Option<UdonType> {
    let elem = array_vm_type.strip_suffix("Array")?;
    Some(match elem {
        "SystemBoolean" => UdonType::Bool,
        "SystemInt32" => UdonType::Int32,
        "SystemInt64" => UdonType::Int64,
        "SystemSingle" => UdonType::Single,
        "SystemDouble" => UdonType::Double,
        "SystemString" => UdonType::String,
        "SystemObject" => UdonType::Object,
        "UnityEngineVector3" => UdonType::Vector3,
        "UnityEngineColor" => UdonType::Color,
        "ScriptedBehaviour" => UdonType::Behaviour(None),
        _ => return None,
    })
}

struct ParsedSignature<'a> {
    vm_type: &'a str,
    name: &'a str,
    params: Vec<&'a str>,
    ret: &'a str,
}

/// Split `Type.__Name__Param_Param__Ret` / `Type.__Name__Ret`.
fn parse_signature(signature: &str) -> Option<ParsedSignature<'_>> {
    let (vm_type, rest) = signature.split_once(".__")?;
    let (head, ret) = rest.rsplit_once("__")?;

    let (name, params) = match head.split_once("__") {
        Some((name, params)) => (name, params.split('_').collect()),
        None => (head, Vec::new()),
    };

    Some(ParsedSignature {
        vm_type,
        name,
        params,
        ret,
    })
}
