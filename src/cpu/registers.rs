//! Register file and condition codes.
//!
//! The machine has eight 16-bit general registers R0-R7 and a 3-bit
//! condition code register holding the N, Z and P flags in that order.

use std::fmt;
use crate::bits::{Bit, BitVector};
use serde::{Serialize, Deserialize};

/// The number of general registers.
pub const REGISTER_COUNT: usize = 8;

/// Width of the condition code register.
pub const CC_WIDTH: usize = 3;

/// A general register index, 0-7.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg(u8);

impl Reg {
    /// R0, the OUT trap's source register.
    pub const R0: Reg = Reg(0);

    /// Build a register index, `None` if it is not in 0-7.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Build from a 3-bit register field.
    pub fn from_field(field: &BitVector) -> Option<Self> {
        u8::try_from(field.unsigned_value()).ok().and_then(Self::new)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The eight general registers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    regs: Vec<BitVector>,
}

impl RegisterFile {
    /// Create a register file where register *i* holds the value *i*.
    ///
    /// Non-zero defaults let a test tell registers apart without first
    /// loading them.
    pub fn new() -> Self {
        let regs = (0..REGISTER_COUNT as u32)
            .map(|i| {
                let mut word = BitVector::word();
                word.set_unsigned_value(i);
                word
            })
            .collect();
        Self { regs }
    }

    /// Reset every register to its default value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> &BitVector {
        &self.regs[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Reg, value: BitVector) {
        self.regs[reg.index()] = value;
    }

    /// Copy of all eight registers.
    pub fn snapshot(&self) -> Vec<BitVector> {
        self.regs.clone()
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// The sign class of the last result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionCode {
    /// Result was negative (`100`)
    Negative,
    /// Result was zero (`010`)
    Zero,
    /// Result was positive (`001`)
    Positive,
}

impl ConditionCode {
    /// Classify a signed result.
    pub fn from_value(value: i32) -> Self {
        match value {
            v if v < 0 => ConditionCode::Negative,
            0 => ConditionCode::Zero,
            _ => ConditionCode::Positive,
        }
    }

    /// Recover the flag from a 3-bit register, `None` unless exactly one
    /// bit is set.
    pub fn from_register(cc: &BitVector) -> Option<Self> {
        match cc.to_string().as_str() {
            "100" => Some(ConditionCode::Negative),
            "010" => Some(ConditionCode::Zero),
            "001" => Some(ConditionCode::Positive),
            _ => None,
        }
    }

    /// The N, Z, P bits for this code.
    pub const fn flags(self) -> [Bit; CC_WIDTH] {
        match self {
            ConditionCode::Negative => [Bit::One, Bit::Zero, Bit::Zero],
            ConditionCode::Zero => [Bit::Zero, Bit::One, Bit::Zero],
            ConditionCode::Positive => [Bit::Zero, Bit::Zero, Bit::One],
        }
    }

    /// The code as a 3-bit register value.
    pub fn to_register(self) -> BitVector {
        BitVector::from_bit_slice(&self.flags()).unwrap_or_else(|_| cleared_condition_code())
    }
}

/// A condition code register with no flag set, the power-on value.
pub fn cleared_condition_code() -> BitVector {
    BitVector::from_bit_slice(&[Bit::Zero; CC_WIDTH]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let regs = RegisterFile::new();
        for i in 0..REGISTER_COUNT as u8 {
            let value = regs.get(Reg::new(i).unwrap());
            assert_eq!(value.unsigned_value(), u32::from(i));
            assert_eq!(value.width(), 16);
        }
    }

    #[test]
    fn test_reg_bounds() {
        assert!(Reg::new(7).is_some());
        assert!(Reg::new(8).is_none());
        let field = BitVector::from_bits("101").unwrap();
        assert_eq!(Reg::from_field(&field), Reg::new(5));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let regs = RegisterFile::new();
        let mut snap = regs.snapshot();
        snap[3].invert();
        assert_eq!(regs.get(Reg::new(3).unwrap()).unsigned_value(), 3);
    }

    #[test]
    fn test_condition_code_from_value() {
        assert_eq!(ConditionCode::from_value(-6), ConditionCode::Negative);
        assert_eq!(ConditionCode::from_value(0), ConditionCode::Zero);
        assert_eq!(ConditionCode::from_value(21), ConditionCode::Positive);
    }

    #[test]
    fn test_condition_code_register() {
        assert_eq!(ConditionCode::Negative.to_register().to_string(), "100");
        assert_eq!(ConditionCode::Zero.to_register().to_string(), "010");
        assert_eq!(ConditionCode::Positive.to_register().to_string(), "001");

        for code in [ConditionCode::Negative, ConditionCode::Zero, ConditionCode::Positive] {
            let reg = code.to_register();
            assert_eq!(ConditionCode::from_register(&reg), Some(code));
            assert_eq!(reg.bits(), &code.flags());
        }

        assert_eq!(ConditionCode::from_register(&cleared_condition_code()), None);
    }
}
