//! The one CLI collaborator this crate implements: reads one or more proof
//! files, verifies every proof each defines, and reports the first failing
//! line per proof (spec.md §1 lists the file-picker dialog, the printer
//! strategies, and multi-file include expansion beyond what parsing already
//! does as out-of-scope external collaborators; this binary is
//! intentionally thin).
//!
//! Exit-code contract (§6): `0` if every proof in every given file
//! verifies, non-zero otherwise.

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use natded::nd::parser::{parse_proof_file, FsIncludeSource};
use natded::nd::proof::VerifyOutcome;
use natded::nd::term::TermFactory;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: natded <proof-file>...");
        std::process::exit(2);
    }

    let mut any_failed = false;
    for path in &args[1..] {
        if !run_file(path)? {
            any_failed = true;
        }
    }

    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}

fn run_file(path: &str) -> Result<bool> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read '{path}'"))?;
    let fac = TermFactory::new();
    let mut includes = FsIncludeSource;

    let parsed = match parse_proof_file(&fac, path, &text, &mut includes) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return Ok(false);
        }
    };

    let mut all_ok = true;
    for (name, proof) in &parsed.proofs {
        match proof.borrow_mut().verify() {
            VerifyOutcome::Valid => {
                println!("{}: {name}: valid", Path::new(path).display());
            }
            VerifyOutcome::FailingLine(n) => {
                println!("{}: {name}: fails at line {n}", Path::new(path).display());
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}
