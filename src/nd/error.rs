//! Error taxonomy for the parser (§7). Library-internal failures are plain
//! enums implementing `std::error::Error`, matching the teacher's split
//! (`anyhow` only at the CLI boundary, plain types inside the library) — see
//! SPEC_FULL.md §2.

use std::fmt;
use std::path::PathBuf;

/// A syntax-level failure: unbalanced brackets, a malformed inference or
/// proof block, a missing rule name on a non-assumption line, or a
/// reference to an unknown inference rule. These abort the file (§7.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub file: Option<PathBuf>,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError { file: None, line, message: message.into() }
    }

    pub fn in_file(file: PathBuf, line: usize, message: impl Into<String>) -> Self {
        ParseError { file: Some(file), line, message: message.into() }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(path) => write!(f, "{}:{}: {}", path.display(), self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for ParseError {}
