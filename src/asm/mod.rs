//! Program tooling.
//!
//! This module provides:
//! - The `.bin` program file format and program validation
//! - A two-pass assembler (text → program words)
//! - A disassembler (program words → readable text)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use program::{
    load_program_file, parse_program, parse_program_text, save_program_file, validate_program,
    ProgramError, ProgramFile, MAX_PROGRAM_WORDS,
};
