//! WebAssembly bindings.
//!
//! JavaScript-friendly wrappers around [`Computer`]. OUT output is
//! buffered and handed to the page through [`WasmComputer::take_output`].

use wasm_bindgen::prelude::*;
use js_sys::Array;
use crate::asm::{assemble, disassemble_word, parse_program_text};
use crate::bits::BitVector;
use crate::cpu::Computer;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// A machine driven from JavaScript.
#[wasm_bindgen]
pub struct WasmComputer {
    computer: Computer<Vec<u8>>,
    program: Vec<BitVector>,
}

#[wasm_bindgen]
impl WasmComputer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            computer: Computer::with_console(Vec::new()),
            program: Vec::new(),
        }
    }

    /// Load a program from assembly source. Returns the word count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let words = assemble(source).map_err(js_error)?;
        self.load(words)
    }

    /// Load a program in `.bin` text form. Returns the word count.
    #[wasm_bindgen]
    pub fn load_bin(&mut self, text: &str) -> Result<usize, JsError> {
        let program = parse_program_text(text).map_err(js_error)?;
        self.load(program.words)
    }

    fn load(&mut self, words: Vec<BitVector>) -> Result<usize, JsError> {
        self.computer = Computer::with_console(Vec::new());
        self.computer.load_program(&words).map_err(js_error)?;
        self.program = words;
        Ok(self.program.len())
    }

    /// Step one instruction. Returns its disassembly.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        self.computer.step().map_err(js_error)?;
        Ok(disassemble_word(&self.computer.ir()))
    }

    /// Run until halt or `max_cycles`. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.computer.run_limited(u64::from(max_cycles)).map_err(js_error)?;
        Ok(self.computer.cycles())
    }

    /// Reset to power-on state with the loaded program and an empty
    /// output buffer.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.computer = Computer::with_console(Vec::new());
        if !self.program.is_empty() {
            self.computer.load_program(&self.program).map_err(js_error)?;
        }
        Ok(())
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.computer.is_halted()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.computer.cycles()
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u32 {
        self.computer.pc().unsigned_value()
    }

    #[wasm_bindgen]
    pub fn ir(&self) -> String {
        self.computer.ir().to_string()
    }

    /// Condition code as `NZP` bits.
    #[wasm_bindgen]
    pub fn cc(&self) -> String {
        self.computer.cc().to_string()
    }

    /// Signed register values R0-R7.
    #[wasm_bindgen]
    pub fn registers(&self) -> Array {
        self.computer
            .registers()
            .iter()
            .map(|r| JsValue::from(r.twos_complement_value()))
            .collect()
    }

    /// Memory words as bit strings.
    #[wasm_bindgen]
    pub fn memory(&self) -> Array {
        self.computer
            .memory()
            .iter()
            .map(|w| JsValue::from(w.to_string()))
            .collect()
    }

    /// The whole machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.computer.state()).map_err(js_error)
    }

    /// Drain the OUT buffer.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> String {
        let bytes = std::mem::take(self.computer.console_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for WasmComputer {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return it in `.bin` text form.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<String, JsError> {
    let words = assemble(source).map_err(js_error)?;
    Ok(crate::asm::program::format_program(&words))
}

/// Disassemble a single 16-bit word.
#[wasm_bindgen]
pub fn wasm_disassemble(value: u16) -> String {
    let mut word = BitVector::word();
    word.set_unsigned_value(u32::from(value));
    disassemble_word(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reloads_program_and_clears_output() {
        let mut wc = WasmComputer::new();
        let count = wc
            .load_asm("ADD R0, R0, #15\nADD R0, R0, #15\nADD R0, R0, #3\nOUT\nHALT")
            .ok();
        assert_eq!(count, Some(5));
        assert_eq!(wc.run(100).ok(), Some(5));
        assert!(wc.is_halted());

        assert!(wc.reset().is_ok());
        assert!(!wc.is_halted());
        assert_eq!(wc.cycles(), 0);
        assert_eq!(wc.take_output(), "");

        assert!(wc.run(100).is_ok());
        assert_eq!(wc.take_output(), "!");
    }
}
