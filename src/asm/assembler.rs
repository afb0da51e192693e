//! Two-pass assembler for machine-code programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//!         ADD R1, R1, #5      ; register or immediate operand
//! LOOP:   ADD R0, R0, R1
//!         ADD R1, R1, #-1
//!         BRp LOOP            ; BR, BRn, BRz, BRp, BRnz, ... ; BR alone is BRnzp
//!         LD  R2, DATA        ; PC-relative label or #offset
//!         NOT R3, R2
//!         AND R4, R3, x0F
//!         OUT                 ; TRAP x21
//!         HALT                ; TRAP x25
//! DATA    .FILL #42
//! ```
//!
//! Numbers are `#decimal`, `xHEX` or `b0101`; a bare decimal is accepted
//! too. Labels end with `:` or stand alone at the start of a line.

use std::collections::HashMap;
use crate::bits::BitVector;
use crate::cpu::decode::{encode, DecodeError, Instruction, TrapVector};
use crate::cpu::registers::Reg;
use thiserror::Error;

/// Assemble source code to program words.
pub fn assemble(source: &str) -> Result<Vec<BitVector>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// One statement, after labels and comments are stripped.
struct Statement {
    line: usize,
    addr: i32,
    mnemonic: String,
    operands: Vec<String>,
}

/// The assembler state.
struct Assembler {
    /// Label -> address.
    symbols: HashMap<String, i32>,
    /// Statements in address order.
    statements: Vec<Statement>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<BitVector>, AssemblerError> {
        // Pass 1: addresses and labels
        for (line_num, line) in source.lines().enumerate() {
            self.scan_line(line, line_num + 1)?;
        }

        // Pass 2: encode with every label known
        self.statements.iter().map(|stmt| self.encode_statement(stmt)).collect()
    }

    fn scan_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let mut code = line.split(';').next().unwrap_or("").trim();
        if code.is_empty() {
            return Ok(());
        }

        if let Some((label, rest)) = code.split_once(':') {
            self.define_label(label.trim(), line_num)?;
            code = rest.trim();
        }

        let mut tokens: Vec<String> = code
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(first) = tokens.first() {
            if !is_mnemonic(&first.to_uppercase()) {
                let label = tokens.remove(0);
                self.define_label(&label, line_num)?;
            }
        }

        if tokens.is_empty() {
            return Ok(());
        }

        let mnemonic = tokens.remove(0).to_uppercase();
        self.statements.push(Statement {
            line: line_num,
            addr: self.statements.len() as i32,
            mnemonic,
            operands: tokens,
        });
        Ok(())
    }

    fn define_label(&mut self, label: &str, line_num: usize) -> Result<(), AssemblerError> {
        let valid = label.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid label '{}'", label),
            });
        }

        let key = label.to_uppercase();
        if self.symbols.contains_key(&key) {
            return Err(AssemblerError::DuplicateLabel { line: line_num, label: key });
        }
        self.symbols.insert(key, self.statements.len() as i32);
        Ok(())
    }

    fn encode_statement(&self, stmt: &Statement) -> Result<BitVector, AssemblerError> {
        if stmt.mnemonic == ".FILL" {
            return self.fill(stmt);
        }

        let instr = self.parse_instruction(stmt)?;
        encode(&instr).map_err(|e| decode_error(stmt.line, e))
    }

    fn parse_instruction(&self, stmt: &Statement) -> Result<Instruction, AssemblerError> {
        let line = stmt.line;
        let ops = &stmt.operands;

        let instr = match stmt.mnemonic.as_str() {
            "ADD" | "AND" => {
                expect_operands(stmt, 3)?;
                let dr = register(&ops[0], line)?;
                let sr1 = register(&ops[1], line)?;
                let is_add = stmt.mnemonic == "ADD";
                match parse_register(&ops[2]) {
                    Some(sr2) if is_add => Instruction::add(dr, sr1, sr2),
                    Some(sr2) => Instruction::and(dr, sr1, sr2),
                    None => {
                        let imm = number(&ops[2], line)?;
                        let built = if is_add {
                            Instruction::add_imm(dr, sr1, imm)
                        } else {
                            Instruction::and_imm(dr, sr1, imm)
                        };
                        built.map_err(|e| decode_error(line, e))?
                    }
                }
            }

            "NOT" => {
                expect_operands(stmt, 2)?;
                Instruction::not(register(&ops[0], line)?, register(&ops[1], line)?)
            }

            "LD" => {
                expect_operands(stmt, 2)?;
                let dr = register(&ops[0], line)?;
                let offset = self.pc_offset(&ops[1], stmt)?;
                Instruction::ld(dr, offset).map_err(|e| decode_error(line, e))?
            }

            "OUT" => {
                expect_operands(stmt, 0)?;
                Instruction::trap(TrapVector::OUT)
            }

            "HALT" => {
                expect_operands(stmt, 0)?;
                Instruction::trap(TrapVector::HALT)
            }

            "TRAP" => {
                expect_operands(stmt, 1)?;
                let vector = number(&ops[0], line)?;
                let vector = u8::try_from(vector).map_err(|_| AssemblerError::ValueOutOfRange {
                    line,
                    value: vector,
                    min: 0,
                    max: 255,
                })?;
                Instruction::trap(vector)
            }

            mnemonic => match branch_flags(mnemonic) {
                Some((n, z, p)) => {
                    expect_operands(stmt, 1)?;
                    let offset = self.pc_offset(&ops[0], stmt)?;
                    Instruction::br(n, z, p, offset).map_err(|e| decode_error(line, e))?
                }
                None => {
                    return Err(AssemblerError::UnknownMnemonic {
                        line,
                        mnemonic: mnemonic.to_string(),
                    })
                }
            },
        };

        Ok(instr)
    }

    /// `.FILL value`: a number, or a label's absolute address.
    fn fill(&self, stmt: &Statement) -> Result<BitVector, AssemblerError> {
        expect_operands(stmt, 1)?;
        let value = match parse_number(&stmt.operands[0]) {
            Some(v) => v,
            None => self.lookup(&stmt.operands[0], stmt.line)?,
        };
        if !(-32_768..=65_535).contains(&value) {
            return Err(AssemblerError::ValueOutOfRange {
                line: stmt.line,
                value,
                min: -32_768,
                max: 65_535,
            });
        }
        BitVector::with_twos_complement(16, value).map_err(|e| decode_error(stmt.line, e.into()))
    }

    /// A PC-relative operand: `#offset`, or a label measured from the
    /// following word.
    fn pc_offset(&self, operand: &str, stmt: &Statement) -> Result<i32, AssemblerError> {
        match parse_number(operand) {
            Some(offset) => Ok(offset),
            None => Ok(self.lookup(operand, stmt.line)? - (stmt.addr + 1)),
        }
    }

    fn lookup(&self, label: &str, line: usize) -> Result<i32, AssemblerError> {
        self.symbols
            .get(&label.to_uppercase())
            .copied()
            .ok_or_else(|| AssemblerError::UndefinedLabel {
                line,
                label: label.to_uppercase(),
            })
    }
}

fn is_mnemonic(token: &str) -> bool {
    matches!(token, "ADD" | "AND" | "NOT" | "LD" | "TRAP" | "OUT" | "HALT" | ".FILL")
        || branch_flags(token).is_some()
}

/// Flags tested by a `BR` mnemonic, `None` if it is not one.
fn branch_flags(mnemonic: &str) -> Option<(bool, bool, bool)> {
    let suffix = mnemonic.strip_prefix("BR")?;
    if suffix.is_empty() {
        return Some((true, true, true));
    }

    let mut rest = suffix;
    let mut take = |flag: char| match rest.strip_prefix(flag) {
        Some(r) => {
            rest = r;
            true
        }
        None => false,
    };
    let flags = (take('N'), take('Z'), take('P'));
    rest.is_empty().then_some(flags)
}

fn expect_operands(stmt: &Statement, count: usize) -> Result<(), AssemblerError> {
    if stmt.operands.len() != count {
        return Err(AssemblerError::SyntaxError {
            line: stmt.line,
            message: format!(
                "{} takes {} operand(s), found {}",
                stmt.mnemonic,
                count,
                stmt.operands.len()
            ),
        });
    }
    Ok(())
}

fn parse_register(token: &str) -> Option<Reg> {
    let digits = token.strip_prefix(&['R', 'r'][..])?;
    digits.parse::<u8>().ok().and_then(Reg::new)
}

fn register(token: &str, line: usize) -> Result<Reg, AssemblerError> {
    parse_register(token).ok_or_else(|| AssemblerError::SyntaxError {
        line,
        message: format!("expected a register R0-R7, found '{}'", token),
    })
}

/// Parse `#dec`, `xHEX`, `bBIN` or a bare decimal.
fn parse_number(token: &str) -> Option<i32> {
    let (negative, body) = match token.strip_prefix('#') {
        Some(dec) => return dec.parse().ok(),
        None => match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        },
    };

    let value = if let Some(hex) = body.strip_prefix(&['x', 'X'][..]) {
        i32::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = body.strip_prefix(&['b', 'B'][..]) {
        i32::from_str_radix(bin, 2).ok()?
    } else if body.chars().all(|c| c.is_ascii_digit()) {
        body.parse().ok()?
    } else {
        return None;
    };

    Some(if negative { -value } else { value })
}

fn number(token: &str, line: usize) -> Result<i32, AssemblerError> {
    parse_number(token).ok_or_else(|| AssemblerError::SyntaxError {
        line,
        message: format!("expected a number, found '{}'", token),
    })
}

fn decode_error(line: usize, err: DecodeError) -> AssemblerError {
    match err {
        DecodeError::ValueOutOfRange { value, min, max, .. } => {
            AssemblerError::ValueOutOfRange { line, value, min, max }
        }
        other => AssemblerError::SyntaxError { line, message: other.to_string() },
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value} (expected {min}..={max})")]
    ValueOutOfRange { line: usize, value: i32, min: i32, max: i32 },
}
