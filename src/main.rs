//! lc3-mini - CLI Entry Point
//!
//! Commands:
//! - `lc3-mini run <program>` - Run a `.bin` or `.asm` program
//! - `lc3-mini debug <program>` - Interactive debugger
//! - `lc3-mini asm <source>` - Assemble to `.bin`
//! - `lc3-mini disasm <program>` - Disassemble a `.bin` program
//! - `lc3-mini test` - Built-in self-test

use std::io::Write;
use std::path::Path;
use clap::{Parser, Subcommand};
use lc3::{BitVector, Computer};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lc3-mini")]
#[command(version)]
#[command(about = "A simulator of a tiny 16-bit stored-program computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the .bin or .asm file to execute
        program: String,
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Log every fetched instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the .bin or .asm file to debug
        program: String,
    },
    /// Assemble source to a .bin program file
    Asm {
        /// Path to the source file
        source: String,
        /// Output program file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a .bin program file
    Disasm {
        /// Path to the program file
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    init_logging(trace);

    match cli.command {
        Some(Commands::Run { program, max_cycles, json, .. }) => {
            run_program(&program, max_cycles, json);
        }
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("lc3-mini v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit bit-string computer simulator");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or every fetch with `--trace`.
fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("lc3=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

/// Load a program, assembling `.asm` sources first.
fn load_words(path: &str) -> Vec<BitVector> {
    if Path::new(path).extension().is_some_and(|ext| ext == "asm") {
        let source = std::fs::read_to_string(path)
            .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
        lc3::assemble(&source).unwrap_or_else(|e| fail(format!("Assembly error: {}", e)))
    } else {
        lc3::load_program_file(path)
            .map(|program| program.words)
            .unwrap_or_else(|e| fail(format!("Failed to load program: {}", e)))
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    state: &'a lc3::MachineState,
    run_state: lc3::RunState,
    cycles: u64,
    output: String,
}

fn run_program(path: &str, max_cycles: u64, json: bool) {
    let words = load_words(path);

    if json {
        let mut computer = Computer::with_console(Vec::<u8>::new());
        execute(&mut computer, &words, max_cycles);
        let report = RunReport {
            state: computer.state(),
            run_state: computer.run_state(),
            cycles: computer.cycles(),
            output: String::from_utf8_lossy(computer.console()).into_owned(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(format!("Failed to encode state: {}", e)),
        }
        return;
    }

    println!("🔧 Running: {} ({} words)", path, words.len());
    println!();
    println!("━━━ Output ━━━");

    let mut computer = Computer::new();
    execute(&mut computer, &words, max_cycles);

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", computer.cycles());
    println!("State: {:?}", computer.run_state());
    println!();
    print!("{}", computer.state());

    if computer.is_running() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

fn execute<W: Write>(computer: &mut Computer<W>, words: &[BitVector], max_cycles: u64) {
    if let Err(e) = computer.load_program(words) {
        fail(format!("Failed to load program: {}", e));
    }
    if let Err(e) = computer.run_limited(max_cycles) {
        fail(format!("Machine error at PC={}: {}", computer.pc().unsigned_value(), e));
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    let words = load_words(path);

    println!("🚀 Launching debugger...");
    if let Err(e) = lc3::run_debugger(words) {
        fail(format!("Debugger error: {}", e));
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str) {
    fail("this build has no debugger (enable the `tui` feature)");
}

fn assemble_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path).with_extension("bin").to_string_lossy().into_owned()
    });

    println!("📝 Assembling: {} → {}", source_path, out_path);

    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| fail(format!("Failed to read file: {}", e)));
    let words = lc3::assemble(&source).unwrap_or_else(|e| fail(format!("Assembly error: {}", e)));

    println!("✓ Assembled {} words", words.len());

    if let Err(e) = lc3::save_program_file(&out_path, &words) {
        fail(format!("Failed to save program: {}", e));
    }

    println!("✓ Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    let program = lc3::load_program_file(path)
        .unwrap_or_else(|e| fail(format!("Failed to load program: {}", e)));
    print!("{}", lc3::disassemble(&program.words));
}

/// Reference programs and the registers they must leave behind.
const SELF_TESTS: &[(&str, &[&str], usize, i32, &str)] = &[
    (
        "loop summation",
        &[
            "0001001001100101",
            "0001000000000001",
            "0001001001111111",
            "0000001111111101",
            "1111000000100101",
        ],
        0,
        21,
        "010",
    ),
    ("LD from memory", &["0010001000000001", "1111000000100101", "0000000000000101"], 1, 5, "001"),
    ("AND of defaults", &["0101000001000011", "1111000000100101"], 0, 1, "001"),
    ("NOT of default", &["1001100101111111", "1111000000100101"], 4, -6, "100"),
    ("ADD registers", &["0001000010000010", "1111000000100101"], 0, 4, "001"),
    ("ADD immediate", &["0001000010100011", "1111000000100101"], 0, 5, "001"),
    ("ADD negative immediate", &["0001000010111101", "1111000000100101"], 0, -1, "100"),
];

fn run_self_test() {
    println!("━━━ lc3-mini Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    for (name, program, reg, expected, cc) in SELF_TESTS {
        print!("{}... ", name);
        let mut computer = Computer::with_console(Vec::<u8>::new());
        let result = computer
            .load_machine_code(*program)
            .map_err(|e| e.to_string())
            .and_then(|_| computer.execute().map_err(|e| e.to_string()));

        let got = computer.registers()[*reg].twos_complement_value();
        let got_cc = computer.cc().to_string();
        match result {
            Ok(_) if got == *expected && got_cc == *cc => {
                println!("✓");
                passed += 1;
            }
            Ok(_) => {
                println!("✗ (R{} = {}, CC = {}; expected {}, {})", reg, got, got_cc, expected, cc);
                failed += 1;
            }
            Err(e) => {
                println!("✗ ({})", e);
                failed += 1;
            }
        }
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
