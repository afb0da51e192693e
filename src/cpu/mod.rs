//! The simulated machine.
//!
//! - 50 sixteen-bit memory words
//! - 8 general registers, PC, IR and a 3-bit N/Z/P condition code
//! - six instructions: BR, ADD, LD, AND, NOT, TRAP

pub mod memory;
pub mod registers;
pub mod state;
pub mod decode;
pub mod execute;
pub mod computer;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{ConditionCode, Reg, RegisterFile};
pub use state::MachineState;
pub use decode::{DecodeError, Instruction, Opcode, Operand, TrapVector};
pub use execute::{CpuError, ExecutionEngine, Flow, RunState};
pub use computer::Computer;
