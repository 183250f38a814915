//! `natded`: a natural-deduction proof checker for a user-extensible
//! formal language (spec.md §1). The crate root only re-exports the core;
//! the CLI front end lives in `src/bin/natded.rs`.

pub mod nd;
