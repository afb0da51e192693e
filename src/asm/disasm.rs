//! Disassembler for machine-code programs.

use crate::bits::BitVector;
use crate::cpu::decode::{decode, Instruction, Operand, TrapVector};

/// Disassemble a single word.
///
/// Words that do not decode, and branches that test no flag (which is how
/// small data words decode), become `.FILL`.
pub fn disassemble_word(word: &BitVector) -> String {
    match decode(word) {
        Ok(Instruction::Br { nzp, .. }) if nzp.is_zero() => fill(word),
        Ok(instr) => format_instruction(&instr),
        Err(_) => fill(word),
    }
}

fn fill(word: &BitVector) -> String {
    format!(".FILL x{:04X}", word.unsigned_value())
}

/// Disassemble a program into an address-annotated listing.
pub fn disassemble(words: &[BitVector]) -> String {
    let mut output = String::new();
    output.push_str("; lc3-mini disassembly\n");
    output.push_str("; --------------------\n\n");

    for (addr, word) in words.iter().enumerate() {
        output.push_str(&format!("{:02}: {:<18} ; {}\n", addr, disassemble_word(word), word));
    }

    output
}

/// Format a decoded instruction in assembler syntax.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::Br { nzp, pc_offset } => {
            let flags: String = ['n', 'z', 'p']
                .iter()
                .zip(nzp.bits())
                .filter(|(_, bit)| bit.is_set())
                .map(|(c, _)| *c)
                .collect();
            format!("BR{} #{}", flags, pc_offset.twos_complement_value())
        }
        Instruction::Add { dr, sr1, operand } => {
            format!("ADD {}, {}, {}", dr, sr1, format_operand(operand))
        }
        Instruction::Ld { dr, pc_offset } => {
            format!("LD {}, #{}", dr, pc_offset.twos_complement_value())
        }
        Instruction::And { dr, sr1, operand } => {
            format!("AND {}, {}, {}", dr, sr1, format_operand(operand))
        }
        Instruction::Not { dr, sr } => format!("NOT {}, {}", dr, sr),
        Instruction::Trap { vector } => match vector {
            TrapVector::Out => "OUT".to_string(),
            TrapVector::Halt => "HALT".to_string(),
            TrapVector::Other(code) => format!("TRAP x{:02X}", code),
        },
    }
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Register(reg) => reg.to_string(),
        Operand::Immediate(imm) => format!("#{}", imm.twos_complement_value()),
    }
}
