//! Human-readable program dump.
//!
//! Renders the symbol table, heap template and disassembled instruction
//! stream. Output is stable for a given program, so it doubles as a cheap
//! determinism probe in tests.

use crate::opcode::{Opcode, STEP_SIZE};
use crate::program::Program;

/// Render a full disassembly of the program.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();

    out.push_str(&format!("; heap ({} slots)\n", program.heap.len()));
    for (name, sym) in program.symbols.iter() {
        let value = program
            .heap
            .heap_variable(sym.address)
            .map(|v| v.display_string())
            .unwrap_or_else(|| "?".to_string());
        let export = if sym.exported { " export" } else { "" };
        out.push_str(&format!(
            "  [{:04}] {}: %{} = {}{} sync={}\n",
            sym.address, name, sym.vm_type, value, export, sym.sync
        ));
    }
    let literal_base = program.symbols.len();
    for (offset, value) in program.heap.values().iter().skip(literal_base).enumerate() {
        if value.is_null() {
            continue;
        }
        out.push_str(&format!(
            "  [{:04}] <literal> = {}\n",
            literal_base + offset,
            value.display_string()
        ));
    }

    out.push_str("; entry points\n");
    for name in program.entry_points.exported_symbols() {
        let address = program.entry_points.address_of(name).unwrap_or(0);
        out.push_str(&format!("  {name} -> {address:#010x}\n"));
    }

    out.push_str(&format!("; code ({} steps)\n", program.instructions.len()));
    for (idx, instr) in program.instructions.iter().enumerate() {
        let address = idx as u32 * STEP_SIZE;
        match render_operand(program, instr.opcode, instr.operand) {
            Some(operand) => out.push_str(&format!(
                "  {:#010x}: {}, {}\n",
                address,
                instr.opcode.mnemonic(),
                operand
            )),
            None => out.push_str(&format!(
                "  {:#010x}: {}\n",
                address,
                instr.opcode.mnemonic()
            )),
        }
    }

    out
}

fn render_operand(program: &Program, opcode: Opcode, operand: u32) -> Option<String> {
    match opcode {
        Opcode::Nop | Opcode::Pop | Opcode::Copy => None,
        Opcode::Jump | Opcode::JumpIfFalse => Some(format!("{operand:#010x}")),
        Opcode::Push | Opcode::JumpIndirect => Some(
            symbol_name_at(program, operand)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("[{operand}]")),
        ),
        Opcode::Extern => Some(
            program
                .heap
                .heap_variable(operand)
                .and_then(|v| v.as_str())
                .map(|s| format!("\"{s}\""))
                .unwrap_or_else(|| format!("[{operand}]")),
        ),
    }
}

fn symbol_name_at(program: &Program, address: u32) -> Option<&str> {
    program
        .symbols
        .iter()
        .find(|(_, sym)| sym.address == address)
        .map(|(name, _)| name)
}
