//! # lc3-mini
//!
//! A simulator of a small 16-bit stored-program computer.
//!
//! Every register, memory word and instruction field is a fixed-width
//! [`BitVector`]. The machine has eight general registers, fifty words of
//! memory and six instructions (BR, ADD, LD, AND, NOT, TRAP), executed by a
//! fetch-decode-execute loop until a halting trap.

pub mod bits;
pub mod cpu;
pub mod asm;

mod property_tests;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{Bit, BitError, BitVector};
pub use cpu::{Computer, CpuError, Instruction, MachineState, MemoryError, RunState};
pub use asm::{assemble, disassemble, AssemblerError, ProgramError, ProgramFile, load_program_file, save_program_file};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
