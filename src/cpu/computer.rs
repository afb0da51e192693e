//! The whole machine: state, console and run bookkeeping.

use std::io::{self, Stdout, Write};
use crate::asm::program::{self, ProgramError};
use crate::bits::BitVector;
use crate::cpu::decode::Instruction;
use crate::cpu::execute::{CpuError, ExecutionEngine, Flow, RunState};
use crate::cpu::state::MachineState;
use tracing::info;

/// A simulated computer.
///
/// Owns one [`MachineState`] and the writer the OUT trap prints to.
/// Tracks whether the machine is still running and how many instructions
/// it has executed.
pub struct Computer<W: Write = Stdout> {
    state: MachineState,
    console: W,
    run_state: RunState,
    cycles: u64,
    last_instr: Option<Instruction>,
}

impl Computer<Stdout> {
    /// A powered-on machine printing to standard output.
    pub fn new() -> Self {
        Self::with_console(io::stdout())
    }
}

impl Default for Computer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Computer<W> {
    /// A powered-on machine printing to `console`.
    pub fn with_console(console: W) -> Self {
        Self {
            state: MachineState::new(),
            console,
            run_state: RunState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Load a program given as 16-character bit-pattern literals.
    ///
    /// Every literal is checked before memory is touched, so a rejected
    /// program leaves the machine exactly as it was.
    pub fn load_machine_code<S: AsRef<str>>(&mut self, literals: &[S]) -> Result<(), ProgramError> {
        let words = program::parse_program(literals)?;
        self.load_program(&words)
    }

    /// Load already-built words at address 0.
    pub fn load_program(&mut self, words: &[BitVector]) -> Result<(), ProgramError> {
        program::validate_program(words)?;
        self.state.load_words(words)?;
        self.run_state = RunState::Running;
        Ok(())
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.run_state != RunState::Running {
            return Err(CpuError::NotRunning(self.run_state));
        }

        let (instr, flow) = ExecutionEngine::new(&mut self.state, &mut self.console).step()?;
        self.cycles += 1;
        self.last_instr = Some(instr.clone());
        if flow == Flow::Halt {
            self.run_state = RunState::Halted;
        }
        Ok(instr)
    }

    /// Run from the current PC until the machine halts.
    ///
    /// Returns the number of instructions executed by this call; a machine
    /// that has already halted executes nothing.
    pub fn execute(&mut self) -> Result<u64, CpuError> {
        let start = self.cycles;
        while self.run_state == RunState::Running {
            self.step()?;
        }
        let executed = self.cycles - start;
        if executed > 0 {
            info!(executed, total = self.cycles, "execution finished");
        }
        Ok(executed)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start = self.cycles;
        while self.run_state == RunState::Running && self.cycles - start < max_cycles {
            self.step()?;
        }
        Ok(self.cycles - start)
    }

    /// Power-on state: registers, memory and bookkeeping all reset.
    pub fn reset(&mut self) {
        self.state.reset();
        self.run_state = RunState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Copies of R0-R7.
    pub fn registers(&self) -> Vec<BitVector> {
        self.state.registers()
    }

    /// Copies of all 50 memory words.
    pub fn memory(&self) -> Vec<BitVector> {
        self.state.memory()
    }

    pub fn pc(&self) -> BitVector {
        self.state.pc()
    }

    pub fn ir(&self) -> BitVector {
        self.state.ir()
    }

    pub fn cc(&self) -> BitVector {
        self.state.cc()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_halted(&self) -> bool {
        self.run_state == RunState::Halted
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    /// Instructions executed since power-on or the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.last_instr.as_ref()
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut W {
        &mut self.console
    }

    pub fn into_console(self) -> W {
        self.console
    }
}
