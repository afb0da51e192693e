//! Complete machine state.
//!
//! [`MachineState`] owns every bit vector in the machine: the register
//! file, memory, PC, IR and CC. Outside the crate it is read-only; each
//! accessor hands out a fresh copy so callers can never alias (and corrupt)
//! the simulator's own storage.

use std::fmt;
use crate::bits::BitVector;
use crate::cpu::memory::{Memory, MemoryError, MEMORY_SIZE};
use crate::cpu::registers::{cleared_condition_code, ConditionCode, Reg, RegisterFile, REGISTER_COUNT};
use serde::{Serialize, Deserialize};

/// Registers, memory, PC, IR and CC of one machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub(crate) registers: RegisterFile,
    pub(crate) memory: Memory,
    pub(crate) pc: BitVector,
    pub(crate) ir: BitVector,
    pub(crate) cc: BitVector,
}

impl MachineState {
    /// Power-on state: Ri = i, memory zeroed, PC = IR = 0, CC = `000`.
    pub fn new() -> Self {
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(),
            pc: BitVector::word(),
            ir: BitVector::word(),
            cc: cleared_condition_code(),
        }
    }

    /// Return to the power-on state.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.memory.clear();
        self.pc = BitVector::word();
        self.ir = BitVector::word();
        self.cc = cleared_condition_code();
    }

    /// Copies of R0-R7.
    pub fn registers(&self) -> Vec<BitVector> {
        self.registers.snapshot()
    }

    /// Copy of a single register.
    pub fn register(&self, reg: Reg) -> BitVector {
        self.registers.get(reg).clone()
    }

    /// Copies of all memory words, address order.
    pub fn memory(&self) -> Vec<BitVector> {
        self.memory.snapshot()
    }

    /// Copy of the word at `addr`.
    pub fn memory_word(&self, addr: i32) -> Result<BitVector, MemoryError> {
        self.memory.read(addr).cloned()
    }

    /// Copy of the program counter.
    pub fn pc(&self) -> BitVector {
        self.pc.clone()
    }

    /// Copy of the instruction register.
    pub fn ir(&self) -> BitVector {
        self.ir.clone()
    }

    /// Copy of the condition code register.
    pub fn cc(&self) -> BitVector {
        self.cc.clone()
    }

    /// The condition code as a flag, `None` before any result was produced.
    pub fn condition(&self) -> Option<ConditionCode> {
        ConditionCode::from_register(&self.cc)
    }

    /// Set exactly one of N, Z, P from the sign of `value`.
    pub(crate) fn set_condition_code(&mut self, value: i32) {
        self.cc = ConditionCode::from_value(value).to_register();
    }

    /// Place `words` at consecutive addresses from 0.
    ///
    /// Callers validate the program first; a word that does not fit is an
    /// address error and stops the copy where it is.
    pub(crate) fn load_words(&mut self, words: &[BitVector]) -> Result<(), MemoryError> {
        for (addr, word) in (0..).zip(words) {
            self.memory.write(addr, word.clone())?;
        }
        Ok(())
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MachineState {
    /// PC, IR and CC on one line, then registers and memory three per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC {}   IR {}   CC {}", self.pc, self.ir, self.cc)?;

        for (i, value) in self.registers.snapshot().iter().enumerate() {
            write!(f, "R{} {}", i, value)?;
            if i % 3 == 2 || i == REGISTER_COUNT - 1 {
                writeln!(f)?;
            } else {
                write!(f, "   ")?;
            }
        }

        for (addr, word) in self.memory.dump(0, MEMORY_SIZE) {
            write!(f, "{:3} {}", addr, word)?;
            if addr % 3 == 2 || addr == MEMORY_SIZE - 1 {
                writeln!(f)?;
            } else {
                write!(f, "   ")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let state = MachineState::new();
        assert_eq!(state.pc().unsigned_value(), 0);
        assert_eq!(state.ir().unsigned_value(), 0);
        assert_eq!(state.cc().to_string(), "000");
        assert_eq!(state.condition(), None);
        assert_eq!(state.registers().len(), REGISTER_COUNT);
        assert_eq!(state.memory().len(), MEMORY_SIZE);
        assert_eq!(state.registers()[5].unsigned_value(), 5);
    }

    #[test]
    fn test_accessors_return_copies() {
        let state = MachineState::new();

        let mut pc = state.pc();
        pc.increment_unsigned();
        let mut regs = state.registers();
        regs[1].invert();
        let mut cc = state.cc();
        cc.invert();

        assert_eq!(state.pc().unsigned_value(), 0);
        assert_eq!(state.registers()[1].unsigned_value(), 1);
        assert_eq!(state.cc().to_string(), "000");
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut state = MachineState::new();
        state.load_words(&[BitVector::with_unsigned(16, 0xF025).unwrap()]).unwrap();
        state.registers.set(Reg::R0, BitVector::with_unsigned(16, 99).unwrap());
        state.pc.increment_unsigned();
        state.set_condition_code(-1);

        state.reset();

        assert_eq!(state, MachineState::new());
        assert!(state.memory().iter().all(BitVector::is_zero));
        assert_eq!(state.registers()[0].unsigned_value(), 0);
        assert_eq!(state.cc().to_string(), "000");
    }

    #[test]
    fn test_set_condition_code() {
        let mut state = MachineState::new();
        state.set_condition_code(-1);
        assert_eq!(state.cc().to_string(), "100");
        state.set_condition_code(0);
        assert_eq!(state.cc().to_string(), "010");
        state.set_condition_code(7);
        assert_eq!(state.cc().to_string(), "001");
        assert_eq!(state.condition(), Some(ConditionCode::Positive));
    }

    #[test]
    fn test_load_words() {
        let mut state = MachineState::new();
        let words = vec![
            BitVector::with_unsigned(16, 1).unwrap(),
            BitVector::with_unsigned(16, 2).unwrap(),
        ];
        state.load_words(&words).unwrap();
        assert_eq!(state.memory_word(0).unwrap().unsigned_value(), 1);
        assert_eq!(state.memory_word(1).unwrap().unsigned_value(), 2);
        assert!(state.memory_word(2).unwrap().is_zero());
    }

    #[test]
    fn test_display_layout() {
        let text = MachineState::new().to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("PC 0000000000000000   IR 0000000000000000   CC 000")
        );
        assert!(text.contains("R7 0000000000000111"));
        assert!(text.contains(" 49 0000000000000000"));
    }

    #[test]
    fn test_json_snapshot() {
        let json = serde_json::to_value(MachineState::new()).unwrap();
        assert_eq!(json["cc"], "000");
        assert_eq!(json["registers"]["regs"][2], "0000000000000010");
    }
}
