//! Fetch-decode-execute engine.
//!
//! [`ExecutionEngine`] borrows a [`MachineState`] and a console writer and
//! owns nothing else. One [`step`](ExecutionEngine::step) fetches `mem[PC]`
//! into IR, increments PC, decodes and dispatches; [`run`](ExecutionEngine::run)
//! repeats until a halting trap.

use std::io::Write;
use crate::bits::{arith, BitError, BitVector, WORD_WIDTH};
use crate::cpu::decode::{self, DecodeError, Instruction, Operand, TrapVector};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::Reg;
use crate::cpu::state::MachineState;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Execution state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Fetching and executing instructions.
    Running,
    /// A halting trap was executed. Terminal.
    Halted,
}

/// What the loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// The instruction interpreter.
pub struct ExecutionEngine<'a, W: Write + ?Sized> {
    state: &'a mut MachineState,
    console: &'a mut W,
}

impl<'a, W: Write + ?Sized> ExecutionEngine<'a, W> {
    pub fn new(state: &'a mut MachineState, console: &'a mut W) -> Self {
        Self { state, console }
    }

    /// Execute a single instruction.
    ///
    /// Returns the decoded instruction and whether the machine halted.
    pub fn step(&mut self) -> Result<(Instruction, Flow), CpuError> {
        // Fetch
        let pc = self.state.pc.unsigned_value() as i32;
        self.state.ir = self.state.memory.read(pc)?.clone();

        // PC is advanced before execution; BR and LD are relative to it
        self.state.pc.increment_unsigned();

        // Decode
        let instr = decode::decode(&self.state.ir)?;
        trace!(pc, ir = %self.state.ir, ?instr, "fetched");

        // Execute
        let flow = self.execute(&instr)?;
        Ok((instr, flow))
    }

    /// Run until a halting trap.
    ///
    /// Returns the number of instructions executed, the halting trap included.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let mut executed = 0;
        loop {
            let (_, flow) = self.step()?;
            executed += 1;
            if flow == Flow::Halt {
                return Ok(executed);
            }
        }
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<(u64, Flow), CpuError> {
        let mut executed = 0;
        while executed < max_cycles {
            let (_, flow) = self.step()?;
            executed += 1;
            if flow == Flow::Halt {
                return Ok((executed, Flow::Halt));
            }
        }
        Ok((executed, Flow::Continue))
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: &Instruction) -> Result<Flow, CpuError> {
        match instr {
            Instruction::Br { nzp, pc_offset } => {
                let taken = nzp
                    .bits()
                    .iter()
                    .zip(self.state.cc.bits())
                    .any(|(test, flag)| test.is_set() && flag.is_set());

                if taken {
                    let offset = pc_offset.sign_extend(WORD_WIDTH)?;
                    let (target, _carry) = arith::add(&self.state.pc, &offset)?;
                    debug!(
                        from = self.state.pc.unsigned_value(),
                        to = target.unsigned_value(),
                        "branch taken"
                    );
                    self.state.pc = target;
                }
            }

            Instruction::Add { dr, sr1, operand } => {
                let second = self.operand_value(operand)?;
                let first = self.state.registers.get(*sr1);
                if arith::would_overflow(first, &second)? {
                    debug!(sr1 = %sr1, "signed overflow wraps");
                }
                let (sum, _carry) = arith::add(first, &second)?;
                self.write_result(*dr, sum);
            }

            Instruction::Ld { dr, pc_offset } => {
                let offset = pc_offset.sign_extend(WORD_WIDTH)?;
                let address = self.state.pc.twos_complement_value() + offset.twos_complement_value();
                let value = self.state.memory.read(address)?.clone();
                self.write_result(*dr, value);
            }

            Instruction::And { dr, sr1, operand } => {
                let second = self.operand_value(operand)?;
                let result = arith::and(self.state.registers.get(*sr1), &second)?;
                self.write_result(*dr, result);
            }

            Instruction::Not { dr, sr } => {
                let result = arith::not(self.state.registers.get(*sr));
                self.write_result(*dr, result);
            }

            Instruction::Trap { vector } => return self.trap(*vector),
        }

        Ok(Flow::Continue)
    }

    /// Resolve the second operand of ADD/AND.
    ///
    /// An immediate is sign-extended into a fresh word; no register is
    /// touched.
    fn operand_value(&self, operand: &Operand) -> Result<BitVector, CpuError> {
        match operand {
            Operand::Register(sr2) => Ok(self.state.registers.get(*sr2).clone()),
            Operand::Immediate(imm) => Ok(imm.sign_extend(WORD_WIDTH)?),
        }
    }

    /// Store a result and set the condition code from its sign.
    fn write_result(&mut self, dr: Reg, value: BitVector) {
        let signed = value.twos_complement_value();
        self.state.registers.set(dr, value);
        self.state.set_condition_code(signed);
    }

    fn trap(&mut self, vector: TrapVector) -> Result<Flow, CpuError> {
        match vector {
            TrapVector::Out => {
                let r0 = self.state.registers.get(Reg::R0).twos_complement_value();
                let ch = char::from((r0 & 0xFF) as u8);
                write!(self.console, "{}", ch)
                    .and_then(|_| self.console.flush())
                    .map_err(|e| CpuError::Console(e.to_string()))?;
                Ok(Flow::Continue)
            }
            TrapVector::Halt => {
                info!(pc = self.state.pc.unsigned_value(), "halted");
                Ok(Flow::Halt)
            }
            TrapVector::Other(code) => {
                warn!(vector = code, "unrecognised trap vector, halting");
                Ok(Flow::Halt)
            }
        }
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("machine not running: {0:?}")]
    NotRunning(RunState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("bit vector error: {0}")]
    Bits(#[from] BitError),

    #[error("console write failed: {0}")]
    Console(String),
}
