//! Prefix-syntax term parser and proof-file stream parser (§4.7).

pub mod file;
pub mod term;

pub use file::{parse_proof_file, FsIncludeSource, IncludeSource, ParsedFile};
pub use term::{parse_premise, parse_term_str};
