//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register, PC/IR and condition code view
//! - Memory view with the PC highlighted
//! - Step/run/breakpoint controls
//! - Disassembly view and captured OUT output

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
