//! Debugger application state and logic.

use std::collections::HashSet;
use crate::asm::disasm::disassemble_word;
use crate::asm::ProgramError;
use crate::bits::BitVector;
use crate::cpu::{Computer, MEMORY_SIZE};

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged. OUT output is captured, not printed.
    pub computer: Computer<Vec<u8>>,
    /// Original program, reloaded on reset.
    pub program: Vec<BitVector>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u32>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<BitVector>) -> Result<Self, ProgramError> {
        let mut computer = Computer::with_console(Vec::<u8>::new());
        computer.load_program(&program)?;

        Ok(Self {
            computer,
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
        })
    }

    pub fn pc(&self) -> u32 {
        self.computer.pc().unsigned_value()
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        if !self.computer.is_running() {
            self.status = format!("Machine halted after {} cycles", self.computer.cycles());
            self.running = false;
            return;
        }

        let pc = self.pc();
        match self.computer.step() {
            Ok(_) => {
                let ir = self.computer.ir();
                self.status = format!("PC={:02}: {}", pc, disassemble_word(&ir));
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.computer.is_running() {
            self.running = false;
            self.status = format!("Halted after {} cycles", self.computer.cycles());
            return;
        }

        self.step();

        let pc = self.pc();
        if self.running && self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at PC={}", pc);
        }
    }

    /// Toggle a breakpoint at the current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.pc();
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={}", pc);
        }
    }

    /// Reset the machine, clear the output and reload the program.
    pub fn reset(&mut self) {
        self.computer.reset();
        self.computer.console_mut().clear();
        self.running = false;
        self.status = match self.computer.load_program(&self.program) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Reload failed: {}", e),
        };
    }

    /// Characters written by OUT so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(self.computer.console()).into_owned()
    }

    /// Disassembly window around the current PC: (address, text, is_pc).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u32, String, bool)> {
        let pc = self.pc() as usize;
        let start = pc.saturating_sub(lines / 2);
        let memory = self.computer.memory();

        (start..(start + lines).min(MEMORY_SIZE))
            .map(|addr| (addr as u32, disassemble_word(&memory[addr]), addr == pc))
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<BitVector>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    let mut app = DebuggerApp::new(program)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                        KeyCode::Down => {
                            if app.mem_scroll + 1 < MEMORY_SIZE {
                                app.mem_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn app(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap()).unwrap()
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app("ADD R1, R1, #5\nNOT R2, R2\nHALT");
        // Break before NOT
        app.computer.step().unwrap();
        app.toggle_breakpoint();
        app.reset();

        app.run();
        for _ in 0..10 {
            app.tick();
        }

        assert!(!app.running);
        assert_eq!(app.pc(), 1);
        assert!(app.status.starts_with("Breakpoint"));
    }

    #[test]
    fn test_reset_clears_output_and_reloads_program() {
        let mut app = app("ADD R0, R0, #15\nADD R0, R0, #15\nADD R0, R0, #3\nOUT\nHALT");
        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(app.computer.is_halted());
        assert_eq!(app.output(), "!");

        app.reset();
        assert!(app.computer.is_running());
        assert_eq!(app.pc(), 0);
        assert_eq!(app.output(), "");
        assert!(!app.computer.memory()[0].is_zero());

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert_eq!(app.output(), "!");
    }

    #[test]
    fn test_disassembly_window() {
        let app = app("NOT R4, R5\nHALT");
        let window = app.get_disassembly(4);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0], (0, "NOT R4, R5".to_string(), true));
        assert_eq!(window[1].1, "HALT");
    }

    #[test]
    fn test_empty_program_rejected() {
        assert!(DebuggerApp::new(Vec::new()).is_err());
    }
}
