//! Instruction decoder.
//!
//! Every instruction is one 16-bit word. The opcode is the top four bits;
//! the remaining fields depend on the opcode. Offsets below are counted from
//! the MSB, matching [`BitVector::substring`]:
//!
//! ```text
//!           0    4    7    10 11   13   16
//! BR    0000 nzp  pcOffset9..........
//! ADD   0001 dr   sr1  0  00   sr2
//! ADD   0001 dr   sr1  1  imm5.......
//! LD    0010 dr   pcOffset9..........
//! AND   0101 dr   sr1  0  00   sr2
//! AND   0101 dr   sr1  1  imm5.......
//! NOT   1001 dr   sr   111111
//! TRAP  1111 0000 trapvect8
//! ```

use std::fmt;
use crate::bits::{Bit, BitError, BitVector, WORD_WIDTH};
use crate::cpu::registers::Reg;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A bitfield position inside an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub start: usize,
    pub len: usize,
}

impl Field {
    const fn new(name: &'static str, start: usize, len: usize) -> Self {
        Self { name, start, len }
    }

    /// Pull this field out of `word`.
    pub fn extract(self, word: &BitVector) -> Result<BitVector, DecodeError> {
        Ok(word.substring(self.start, self.len)?)
    }
}

pub const OPCODE: Field = Field::new("opcode", 0, 4);
pub const NZP: Field = Field::new("nzp", 4, 3);
pub const DR: Field = Field::new("dr", 4, 3);
pub const SR1: Field = Field::new("sr1", 7, 3);
pub const MODE: Field = Field::new("mode", 10, 1);
pub const SR2: Field = Field::new("sr2", 13, 3);
pub const IMM5: Field = Field::new("imm5", 11, 5);
pub const PC_OFFSET9: Field = Field::new("pcOffset9", 7, 9);
pub const TRAP_VECT8: Field = Field::new("trapvect8", 8, 8);

/// The six opcodes. There is no seventh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    And = 0b0101,
    Not = 0b1001,
    Trap = 0b1111,
}

impl Opcode {
    pub const ALL: [Opcode; 6] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::And,
        Opcode::Not,
        Opcode::Trap,
    ];

    /// The 4-bit encoding.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Br => "BR",
            Opcode::Add => "ADD",
            Opcode::Ld => "LD",
            Opcode::And => "AND",
            Opcode::Not => "NOT",
            Opcode::Trap => "TRAP",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.bits() == value)
            .ok_or(DecodeError::UnsupportedOpcode(value))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Trap vectors the machine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapVector {
    /// `x21`: write the low byte of R0 to the console.
    Out,
    /// `x25`: stop the machine.
    Halt,
    /// Any other vector. The machine treats these as a halt too.
    Other(u8),
}

impl TrapVector {
    pub const OUT: u8 = 0x21;
    pub const HALT: u8 = 0x25;

    pub const fn from_u8(value: u8) -> Self {
        match value {
            Self::OUT => TrapVector::Out,
            Self::HALT => TrapVector::Halt,
            other => TrapVector::Other(other),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            TrapVector::Out => Self::OUT,
            TrapVector::Halt => Self::HALT,
            TrapVector::Other(v) => v,
        }
    }
}

/// Second source operand of ADD and AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register mode (bit 10 clear): the value of `sr2`.
    Register(Reg),
    /// Immediate mode (bit 10 set): the raw 5-bit `imm5` field. It is
    /// operand data only and is sign-extended before use.
    Immediate(BitVector),
}

/// A decoded instruction. Offset and immediate fields keep their encoded
/// width; the engine sign-extends them when it uses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Branch if any tested flag is set: PC := PC + sext(pc_offset)
    Br { nzp: BitVector, pc_offset: BitVector },

    /// dr := sr1 + operand
    Add { dr: Reg, sr1: Reg, operand: Operand },

    /// dr := mem[PC + sext(pc_offset)]
    Ld { dr: Reg, pc_offset: BitVector },

    /// dr := sr1 & operand
    And { dr: Reg, sr1: Reg, operand: Operand },

    /// dr := !sr
    Not { dr: Reg, sr: Reg },

    /// System call through a trap vector
    Trap { vector: TrapVector },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::And { .. } => Opcode::And,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Trap { .. } => Opcode::Trap,
        }
    }

    /// `BR` testing the given flags with a signed offset.
    pub fn br(n: bool, z: bool, p: bool, offset: i32) -> Result<Self, DecodeError> {
        let nzp = BitVector::from_bit_slice(&[n.into(), z.into(), p.into()])?;
        Ok(Instruction::Br { nzp, pc_offset: signed_field(PC_OFFSET9, offset)? })
    }

    /// `ADD dr, sr1, sr2`
    pub fn add(dr: Reg, sr1: Reg, sr2: Reg) -> Self {
        Instruction::Add { dr, sr1, operand: Operand::Register(sr2) }
    }

    /// `ADD dr, sr1, #imm`
    pub fn add_imm(dr: Reg, sr1: Reg, imm: i32) -> Result<Self, DecodeError> {
        Ok(Instruction::Add { dr, sr1, operand: Operand::Immediate(signed_field(IMM5, imm)?) })
    }

    /// `LD dr, #offset`
    pub fn ld(dr: Reg, offset: i32) -> Result<Self, DecodeError> {
        Ok(Instruction::Ld { dr, pc_offset: signed_field(PC_OFFSET9, offset)? })
    }

    /// `AND dr, sr1, sr2`
    pub fn and(dr: Reg, sr1: Reg, sr2: Reg) -> Self {
        Instruction::And { dr, sr1, operand: Operand::Register(sr2) }
    }

    /// `AND dr, sr1, #imm`
    pub fn and_imm(dr: Reg, sr1: Reg, imm: i32) -> Result<Self, DecodeError> {
        Ok(Instruction::And { dr, sr1, operand: Operand::Immediate(signed_field(IMM5, imm)?) })
    }

    /// `NOT dr, sr`
    pub fn not(dr: Reg, sr: Reg) -> Self {
        Instruction::Not { dr, sr }
    }

    /// `TRAP vector`
    pub fn trap(vector: u8) -> Self {
        Instruction::Trap { vector: TrapVector::from_u8(vector) }
    }
}

/// Encode `value` into a two's-complement field, rejecting values that do
/// not fit rather than wrapping them.
pub fn signed_field(field: Field, value: i32) -> Result<BitVector, DecodeError> {
    let v = BitVector::with_twos_complement(field.len, value)?;
    if v.twos_complement_value() != value {
        return Err(DecodeError::ValueOutOfRange {
            field: field.name,
            value,
            min: v.min_signed(),
            max: v.max_signed(),
        });
    }
    Ok(v)
}

/// Read the opcode of an instruction word.
pub fn decode_opcode(word: &BitVector) -> Result<Opcode, DecodeError> {
    let raw = OPCODE.extract(word)?.unsigned_value() as u8;
    Opcode::try_from(raw)
}

fn reg(word: &BitVector, field: Field) -> Result<Reg, DecodeError> {
    let bits = field.extract(word)?;
    Reg::from_field(&bits).ok_or(DecodeError::InvalidRegister(bits.unsigned_value()))
}

fn operand(word: &BitVector) -> Result<Operand, DecodeError> {
    if MODE.extract(word)?.unsigned_value() == 1 {
        Ok(Operand::Immediate(IMM5.extract(word)?))
    } else {
        Ok(Operand::Register(reg(word, SR2)?))
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: &BitVector) -> Result<Instruction, DecodeError> {
    if word.width() != WORD_WIDTH {
        return Err(DecodeError::WordWidth(word.width()));
    }

    let instruction = match decode_opcode(word)? {
        Opcode::Br => Instruction::Br {
            nzp: NZP.extract(word)?,
            pc_offset: PC_OFFSET9.extract(word)?,
        },
        Opcode::Add => Instruction::Add {
            dr: reg(word, DR)?,
            sr1: reg(word, SR1)?,
            operand: operand(word)?,
        },
        Opcode::Ld => Instruction::Ld {
            dr: reg(word, DR)?,
            pc_offset: PC_OFFSET9.extract(word)?,
        },
        Opcode::And => Instruction::And {
            dr: reg(word, DR)?,
            sr1: reg(word, SR1)?,
            operand: operand(word)?,
        },
        Opcode::Not => Instruction::Not {
            dr: reg(word, DR)?,
            sr: reg(word, SR1)?,
        },
        Opcode::Trap => {
            let vector = TRAP_VECT8.extract(word)?.unsigned_value() as u8;
            Instruction::Trap { vector: TrapVector::from_u8(vector) }
        }
    };

    Ok(instruction)
}

/// Encode an instruction back to a 16-bit word.
pub fn encode(instr: &Instruction) -> Result<BitVector, DecodeError> {
    let mut bits: Vec<Bit> = Vec::with_capacity(WORD_WIDTH);
    push_unsigned(&mut bits, u32::from(instr.opcode().bits()), OPCODE.len);

    match instr {
        Instruction::Br { nzp, pc_offset } => {
            push_field(&mut bits, NZP, nzp)?;
            push_field(&mut bits, PC_OFFSET9, pc_offset)?;
        }
        Instruction::Add { dr, sr1, operand } | Instruction::And { dr, sr1, operand } => {
            push_reg(&mut bits, *dr);
            push_reg(&mut bits, *sr1);
            match operand {
                Operand::Register(sr2) => {
                    push_unsigned(&mut bits, 0, 3);
                    push_reg(&mut bits, *sr2);
                }
                Operand::Immediate(imm) => {
                    bits.push(Bit::One);
                    push_field(&mut bits, IMM5, imm)?;
                }
            }
        }
        Instruction::Ld { dr, pc_offset } => {
            push_reg(&mut bits, *dr);
            push_field(&mut bits, PC_OFFSET9, pc_offset)?;
        }
        Instruction::Not { dr, sr } => {
            push_reg(&mut bits, *dr);
            push_reg(&mut bits, *sr);
            push_unsigned(&mut bits, 0b11_1111, 6);
        }
        Instruction::Trap { vector } => {
            push_unsigned(&mut bits, 0, 4);
            push_unsigned(&mut bits, u32::from(vector.to_u8()), TRAP_VECT8.len);
        }
    }

    Ok(BitVector::from_bit_slice(&bits)?)
}

fn push_unsigned(bits: &mut Vec<Bit>, value: u32, len: usize) {
    bits.extend((0..len).rev().map(|shift| Bit::from_lsb(u64::from(value >> shift))));
}

fn push_reg(bits: &mut Vec<Bit>, reg: Reg) {
    push_unsigned(bits, reg.index() as u32, 3);
}

fn push_field(bits: &mut Vec<Bit>, field: Field, value: &BitVector) -> Result<(), DecodeError> {
    if value.width() != field.len {
        return Err(DecodeError::FieldWidth {
            field: field.name,
            expected: field.len,
            got: value.width(),
        });
    }
    bits.extend_from_slice(value.bits());
    Ok(())
}

/// Errors that can occur during instruction decoding and encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported opcode: {0:04b}")]
    UnsupportedOpcode(u8),

    #[error("instruction must be 16 bits, got {0}")]
    WordWidth(usize),

    #[error("invalid register number {0}")]
    InvalidRegister(u32),

    #[error("{field} field is {expected} bits wide, got {got}")]
    FieldWidth { field: &'static str, expected: usize, got: usize },

    #[error("{value} does not fit the {field} field ({min}..={max})")]
    ValueOutOfRange { field: &'static str, value: i32, min: i32, max: i32 },

    #[error("bitfield error: {0}")]
    Field(#[from] BitError),
}
