//! Instruction set of the target VM.
//!
//! Every instruction occupies one 8-byte step: a u32 opcode followed by a
//! u32 operand, both little-endian. Opcodes without an operand encode 0.
//! Code addresses are byte offsets into the instruction stream, so step N
//! lives at address `N * STEP_SIZE`.

use serde::{Deserialize, Serialize};

/// Bytes per instruction step (opcode + operand).
pub const STEP_SIZE: u32 = 8;

/// Jumping here terminates execution. Exported entry points seed their
/// return slot with this address so a plain return halts the program.
pub const HALT_ADDRESS: u32 = 0xFFFF_FFFC;

/// VM opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum Opcode {
    Nop = 0,
    /// Push a heap address onto the VM stack.
    Push = 1,
    /// Discard the top of the stack.
    Pop = 2,
    /// Pop destination then source address; copy source slot to destination.
    Copy = 3,
    /// Unconditional jump to a code address.
    Jump = 4,
    /// Pop a condition address; jump when the slot holds false.
    JumpIfFalse = 5,
    /// Jump to the code address held in a heap slot.
    JumpIndirect = 6,
    /// Invoke the extern whose signature string is in the operand heap slot.
    Extern = 7,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Copy => "COPY",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::JumpIndirect => "JUMP_INDIRECT",
            Opcode::Extern => "EXTERN",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        match s {
            "NOP" => Some(Opcode::Nop),
            "PUSH" => Some(Opcode::Push),
            "POP" => Some(Opcode::Pop),
            "COPY" => Some(Opcode::Copy),
            "JUMP" => Some(Opcode::Jump),
            "JUMP_IF_FALSE" => Some(Opcode::JumpIfFalse),
            "JUMP_INDIRECT" => Some(Opcode::JumpIndirect),
            "EXTERN" => Some(Opcode::Extern),
            _ => None,
        }
    }

    pub fn from_u32(v: u32) -> Option<Opcode> {
        match v {
            0 => Some(Opcode::Nop),
            1 => Some(Opcode::Push),
            2 => Some(Opcode::Pop),
            3 => Some(Opcode::Copy),
            4 => Some(Opcode::Jump),
            5 => Some(Opcode::JumpIfFalse),
            6 => Some(Opcode::JumpIndirect),
            7 => Some(Opcode::Extern),
            _ => None,
        }
    }

    /// Whether the textual form carries an operand.
    pub fn has_operand(self) -> bool {
        !matches!(self, Opcode::Nop | Opcode::Pop | Opcode::Copy)
    }
}

/// One decoded instruction step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: u32) -> Self {
        Self { opcode, operand }
    }

    /// Encode as 8 little-endian bytes.
    pub fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&(self.opcode as u32).to_le_bytes());
        bytes[4..].copy_from_slice(&self.operand.to_le_bytes());
        bytes
    }

    /// Decode from 8 bytes. Returns None for an unknown opcode.
    pub fn from_bytes(bytes: &[u8; 8]) -> Option<Self> {
        let opcode = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let operand = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Opcode::from_u32(opcode).map(|opcode| Self { opcode, operand })
    }
}
