//! Machine-code programs and the `.bin` program file format.
//!
//! A program is 1-49 sixteen-bit words placed at address 0. On disk each
//! word is a line of `0`/`1` characters:
//! - `;` and `//` start a comment
//! - blank lines are ignored
//! - spaces and `_` inside a literal are ignored, so fields can be grouped
//!   (`0001 001 001 1 00101`)

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use crate::asm::disasm::disassemble_word;
use crate::bits::{BitError, BitVector, WORD_WIDTH};
use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use thiserror::Error;

/// The longest loadable program.
pub const MAX_PROGRAM_WORDS: usize = MEMORY_SIZE - 1;

/// Parse one exactly-16-character literal.
pub fn parse_word(literal: &str) -> Result<BitVector, BitError> {
    let word = BitVector::from_bits(literal)?;
    if word.width() != WORD_WIDTH {
        return Err(BitError::WidthMismatch { left: WORD_WIDTH, right: word.width() });
    }
    Ok(word)
}

/// Parse and validate a whole program of literals.
pub fn parse_program<S: AsRef<str>>(literals: &[S]) -> Result<Vec<BitVector>, ProgramError> {
    check_length(literals.len())?;
    literals
        .iter()
        .enumerate()
        .map(|(index, literal)| {
            let literal = literal.as_ref();
            parse_word(literal).map_err(|source| ProgramError::Malformed {
                index,
                literal: literal.to_string(),
                source,
            })
        })
        .collect()
}

/// Check that `words` can be loaded: 1-49 words, each 16 bits wide.
pub fn validate_program(words: &[BitVector]) -> Result<(), ProgramError> {
    check_length(words.len())?;
    match words.iter().position(|w| w.width() != WORD_WIDTH) {
        Some(index) => Err(ProgramError::Malformed {
            index,
            literal: words[index].to_string(),
            source: BitError::WidthMismatch { left: WORD_WIDTH, right: words[index].width() },
        }),
        None => Ok(()),
    }
}

fn check_length(count: usize) -> Result<(), ProgramError> {
    match count {
        0 => Err(ProgramError::Empty),
        n if n > MAX_PROGRAM_WORDS => Err(ProgramError::TooLong { count: n }),
        _ => Ok(()),
    }
}

/// A program read from a `.bin` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFile {
    /// The program words, address order.
    pub words: Vec<BitVector>,
    /// The line each word came from.
    pub source_lines: Vec<String>,
}

impl ProgramFile {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            source_lines: Vec::new(),
        }
    }

    pub fn push(&mut self, word: BitVector, source: &str) {
        self.words.push(word);
        self.source_lines.push(source.to_string());
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for ProgramFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse program file text.
///
/// Only the syntax is checked here; the length limits are applied by
/// [`validate_program`] when the words are loaded.
pub fn parse_program_text(text: &str) -> Result<ProgramFile, ProgramError> {
    parse_lines(text.lines().map(|line| Ok(line.to_string())))
}

/// Load a program file from disk.
pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<ProgramFile, ProgramError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| ProgramError::Io(e.to_string()))?;
    let lines = BufReader::new(file)
        .lines()
        .map(|line| line.map_err(|e| ProgramError::Io(e.to_string())));
    parse_lines(lines)
}

fn parse_lines<I>(lines: I) -> Result<ProgramFile, ProgramError>
where
    I: Iterator<Item = Result<String, ProgramError>>,
{
    let mut program = ProgramFile::new();

    for (line_num, line) in lines.enumerate() {
        let line = line?;
        let code = strip_comment(&line).trim();
        if code.is_empty() {
            continue;
        }

        let literal: String = code
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect();
        let word = parse_word(&literal).map_err(|e| ProgramError::Parse {
            line: line_num + 1,
            message: e.to_string(),
        })?;
        program.push(word, line.trim());
    }

    Ok(program)
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find(';'), line.find("//")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..end]
}

/// Write a program file, one word per line with its disassembly.
pub fn save_program_file<P: AsRef<Path>>(path: P, words: &[BitVector]) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::Io(e.to_string()))?;
    file.write_all(format_program(words).as_bytes())
        .map_err(|e| ProgramError::Io(e.to_string()))
}

/// Render words in program file syntax.
pub fn format_program(words: &[BitVector]) -> String {
    let mut out = String::new();
    out.push_str("; lc3-mini program\n");
    out.push_str(&format!("; {} words\n\n", words.len()));
    for (addr, word) in words.iter().enumerate() {
        out.push_str(&format!("{} ; {:02}  {}\n", word, addr, disassemble_word(word)));
    }
    out
}

/// Errors raised while reading or loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,

    #[error("program has {count} words (at most {} fit)", MAX_PROGRAM_WORDS)]
    TooLong { count: usize },

    #[error("word {index} ({literal:?}) is not a 16-bit pattern: {source}")]
    Malformed { index: usize, literal: String, source: BitError },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_word() {
        assert_eq!(parse_word("0001001001100101").unwrap().unsigned_value(), 0x1265);
        assert_eq!(
            parse_word("0001"),
            Err(BitError::WidthMismatch { left: 16, right: 4 })
        );
        assert_eq!(parse_word("000100100110010x"), Err(BitError::InvalidBit('x')));
        assert_eq!(parse_word(""), Err(BitError::Empty));
    }

    #[test]
    fn test_parse_program_limits() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_program(&empty), Err(ProgramError::Empty));

        let full = vec!["0000000000000000"; MAX_PROGRAM_WORDS];
        assert_eq!(parse_program(&full).unwrap().len(), 49);

        let over = vec!["0000000000000000"; MAX_PROGRAM_WORDS + 1];
        assert_eq!(parse_program(&over), Err(ProgramError::TooLong { count: 50 }));
    }

    #[test]
    fn test_parse_program_reports_index() {
        let err = parse_program(&["1111000000100101", "1111 000000100101"]).unwrap_err();
        assert_eq!(
            err,
            ProgramError::Malformed {
                index: 1,
                literal: "1111 000000100101".to_string(),
                source: BitError::InvalidBit(' '),
            }
        );
    }

    #[test]
    fn test_validate_rejects_narrow_word() {
        let words = vec![BitVector::word(), BitVector::zero(3).unwrap()];
        assert!(matches!(
            validate_program(&words),
            Err(ProgramError::Malformed { index: 1, .. })
        ));
    }

    #[test]
    fn test_program_text() {
        let text = "\
; sum 5..1
0001 001 001 1 00101   ; ADD R1, R1, #5

// halt
1111_0000_0010_0101
";
        let program = parse_program_text(text).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.words[0].to_string(), "0001001001100101");
        assert_eq!(program.words[1].to_string(), "1111000000100101");
        assert_eq!(program.source_lines[1], "1111_0000_0010_0101");
    }

    #[test]
    fn test_program_text_error_line() {
        let err = parse_program_text("\n; header\n0001\n").unwrap_err();
        assert!(matches!(err, ProgramError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("lc3-mini-{}.bin", std::process::id()));
        let words = parse_program(&["0010001000000001", "1111000000100101", "0000000000000101"]).unwrap();

        save_program_file(&path, &words).unwrap();
        let loaded = load_program_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.words, words);
    }

    #[test]
    fn test_missing_file() {
        let err = load_program_file("/nonexistent/lc3-mini.bin").unwrap_err();
        assert!(matches!(err, ProgramError::Io(_)));
    }
}
