use crate::{Instruction, Opcode, HALT_ADDRESS};

#[test]
fn mnemonic_roundtrip() {
    for op in [
        Opcode::Nop,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Copy,
        Opcode::Jump,
        Opcode::JumpIfFalse,
        Opcode::JumpIndirect,
        Opcode::Extern,
    ] {
        assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        assert_eq!(Opcode::from_u32(op as u32), Some(op));
    }
    assert_eq!(Opcode::from_mnemonic("CALL"), None);
    assert_eq!(Opcode::from_u32(99), None);
}

#[test]
fn encoding_is_little_endian_steps() {
    let instr = Instruction::new(Opcode::Jump, HALT_ADDRESS);
    let bytes = instr.to_bytes();

    assert_eq!(&bytes[..4], &4u32.to_le_bytes());
    assert_eq!(&bytes[4..], &0xFFFF_FFFCu32.to_le_bytes());
    assert_eq!(Instruction::from_bytes(&bytes), Some(instr));
}

#[test]
fn decode_rejects_unknown_opcode() {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&1000u32.to_le_bytes());
    assert_eq!(Instruction::from_bytes(&bytes), None);
}

#[test]
fn operand_presence() {
    assert!(Opcode::Push.has_operand());
    assert!(Opcode::Extern.has_operand());
    assert!(!Opcode::Copy.has_operand());
    assert!(!Opcode::Nop.has_operand());
}
