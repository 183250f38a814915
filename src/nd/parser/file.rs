//! The proof-file stream parser (§4.7, §6): a finite-state machine over
//! `{ default, in-inference, in-proof }` that turns a UTF-8 text file into
//! inference rules and proofs, following `include` directives as it goes.
//! Grounded in pyLemma's `parsers.defaultProofParser`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::nd::error::ParseError;
use crate::nd::parser::term::{parse_premise, parse_term_str};
use crate::nd::proof::Proof;
use crate::nd::rule::{InferenceRule, RuleRef};
use crate::nd::term::TermFactory;

/// The core consumes file contents through this trait rather than calling
/// `std::fs` directly (spec §6: `openIncluded(path) -> text` is an external
/// collaborator interface). The CLI binary supplies [`FsIncludeSource`].
pub trait IncludeSource {
    fn read_include(&mut self, path: &str) -> std::io::Result<String>;
}

/// The obvious filesystem-backed implementation, used by the CLI.
pub struct FsIncludeSource;

impl IncludeSource for FsIncludeSource {
    fn read_include(&mut self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// The result of parsing one proof file: every proof in textual order, plus
/// the combined name table of every inference rule and derived-rule proof
/// defined anywhere in the file (§3: "A Proof's `inferences` map contains
/// every rule textually referenced... plus the built-in `Assumption` rule").
pub struct ParsedFile {
    pub proofs: Vec<(String, Rc<std::cell::RefCell<Proof>>)>,
    pub rules: HashMap<String, RuleRef>,
}

#[derive(Clone)]
struct QueuedLine {
    text: String,
    source: Rc<str>,
    line_no: usize,
}

enum State {
    Default,
    InInference { lines: Vec<(String, Rc<str>, usize)> },
    InProof { name: Option<String>, proof: Option<Proof>, line_refs: HashMap<String, crate::nd::line::LineRef> },
}

/// Parses `text` (the contents of `source_name`) into every inference rule
/// and proof it and its includes define.
pub fn parse_proof_file(
    fac: &TermFactory,
    source_name: &str,
    text: &str,
    includes: &mut dyn IncludeSource,
) -> Result<ParsedFile, ParseError> {
    let mut rules: HashMap<String, RuleRef> = HashMap::new();
    rules.insert("Assumption".to_string(), RuleRef::Atomic(Rc::new(InferenceRule::assumption())));

    let mut proofs: Vec<(String, Rc<std::cell::RefCell<Proof>>)> = Vec::new();
    let mut included: HashSet<String> = HashSet::new();
    included.insert(source_name.to_string());

    let root: Rc<str> = Rc::from(source_name);
    let mut queue: VecDeque<QueuedLine> = text
        .split('\n')
        .enumerate()
        .map(|(n, line)| QueuedLine { text: line.to_string(), source: root.clone(), line_no: n + 1 })
        .collect();

    let mut state = State::Default;

    while let Some(QueuedLine { text: raw, source, line_no }) = queue.pop_front() {
        let line = strip_comment(&raw).trim().to_string();
        if line.is_empty() {
            continue;
        }

        match &mut state {
            State::Default => {
                if let Some(rest) = strip_keyword(&line, "include") {
                    handle_include(rest, &source, &mut included, includes, &mut queue, line_no)?;
                } else if strip_keyword(&line, "set").is_some() {
                    // Forward-compatible no-op directive (SPEC_FULL.md §3: the
                    // `set key value` directive is recognized and ignored).
                } else if line.eq_ignore_ascii_case("inference") {
                    state = State::InInference { lines: Vec::new() };
                } else if line.eq_ignore_ascii_case("proof") {
                    state = State::InProof { name: None, proof: None, line_refs: HashMap::new() };
                } else {
                    return Err(ParseError::in_file(
                        source.to_string().into(),
                        line_no,
                        format!("expected 'inference', 'proof', 'include', or 'set', found '{line}'"),
                    ));
                }
            }
            State::InInference { lines } => {
                if line.eq_ignore_ascii_case("done") {
                    let rule = finalize_inference(fac, lines, &source, line_no)?;
                    rules.insert(rule.name.clone(), RuleRef::Atomic(Rc::new(rule)));
                    state = State::Default;
                } else {
                    lines.push((line, source.clone(), line_no));
                }
            }
            State::InProof { name, proof, line_refs } => {
                if line.eq_ignore_ascii_case("done") {
                    let Some(finished) = proof.take() else {
                        return Err(ParseError::in_file(source.to_string().into(), line_no, "empty proof block"));
                    };
                    let proof_name = name.clone().expect("proof name set before first body line");
                    let cell = Rc::new(std::cell::RefCell::new(finished));
                    rules.insert(proof_name.clone(), RuleRef::Derived(cell.clone()));
                    proofs.push((proof_name, cell));
                    state = State::Default;
                } else if proof.is_none() {
                    let mut p = Proof::new(line.clone());
                    for rule_ref in rules.values() {
                        p.register_rule(rule_ref.clone());
                    }
                    *name = Some(line.clone());
                    *proof = Some(p);
                } else {
                    add_proof_line(fac, proof.as_mut().unwrap(), line_refs, &line, &source, line_no)?;
                }
            }
        }
    }

    if !matches!(state, State::Default) {
        return Err(ParseError::in_file(source_name.to_string().into(), 0, "unterminated inference or proof block"));
    }

    Ok(ParsedFile { proofs, rules })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Recognizes a `keyword` token at the start of `line` (case-insensitive),
/// separated from the rest by whitespace or a tab, and returns the
/// remainder.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let lower = line.to_ascii_lowercase();
    if lower == keyword {
        return Some("");
    }
    if let Some(rest) = lower.strip_prefix(keyword) {
        if rest.starts_with(char::is_whitespace) {
            return Some(line[keyword.len()..].trim_start());
        }
    }
    None
}

fn parse_line_spec(spec: &str) -> HashSet<usize> {
    let mut set = HashSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if let Some((lo, hi)) = part.split_once('-') {
            if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<usize>(), hi.trim().parse::<usize>()) {
                set.extend(lo..=hi);
            }
        } else if let Ok(n) = part.parse::<usize>() {
            set.insert(n);
        }
    }
    set
}

fn handle_include(
    rest: &str,
    current_source: &Rc<str>,
    included: &mut HashSet<String>,
    includes: &mut dyn IncludeSource,
    queue: &mut VecDeque<QueuedLine>,
    line_no: usize,
) -> Result<(), ParseError> {
    let mut parts = rest.split_whitespace();
    let path = parts
        .next()
        .ok_or_else(|| ParseError::in_file(current_source.to_string().into(), line_no, "include with no path"))?;
    let line_spec = parts.next();

    if line_spec.is_none() && included.contains(path) {
        // Whole-file re-include: ignored after the first time (spec §8
        // boundary behaviour "Include cycles: ignored after first").
        return Ok(());
    }

    let text = includes.read_include(path).map_err(|e| {
        ParseError::in_file(current_source.to_string().into(), line_no, format!("cannot include '{path}': {e}"))
    })?;
    included.insert(path.to_string());

    let source: Rc<str> = Rc::from(path);
    let all_lines: Vec<&str> = text.split('\n').collect();
    let selected: Vec<(usize, &str)> = match line_spec {
        Some(spec) => {
            let wanted = parse_line_spec(spec);
            all_lines.iter().enumerate().filter(|(i, _)| wanted.contains(&(i + 1))).map(|(i, l)| (i, *l)).collect()
        }
        None => all_lines.iter().enumerate().map(|(i, l)| (i, *l)).collect(),
    };

    for (i, l) in selected.into_iter().rev() {
        queue.push_front(QueuedLine { text: l.to_string(), source: source.clone(), line_no: i + 1 });
    }
    Ok(())
}

fn finalize_inference(
    fac: &TermFactory,
    lines: &[(String, Rc<str>, usize)],
    source: &Rc<str>,
    done_line_no: usize,
) -> Result<InferenceRule, ParseError> {
    if lines.len() < 2 {
        return Err(ParseError::in_file(
            source.to_string().into(),
            done_line_no,
            "an inference block needs a name line and a conclusion line",
        ));
    }
    let (name, _, _) = &lines[0];
    let (conclusion_text, conclusion_src, conclusion_line) = lines.last().unwrap();
    let (conclusion, _conclusion_fresh) = parse_premise(fac, conclusion_text).map_err(|e| {
        ParseError::in_file(conclusion_src.to_string().into(), *conclusion_line, e.to_string())
    })?;

    let mut premises = Vec::new();
    let mut fresh_table = HashMap::new();
    for (text, src, line_no) in &lines[1..lines.len() - 1] {
        let (premise, fresh_vars) = parse_premise(fac, text)
            .map_err(|e| ParseError::in_file(src.to_string().into(), *line_no, e.to_string()))?;
        if !fresh_vars.is_empty() {
            fresh_table.insert(premise.clone(), fresh_vars);
        }
        premises.push(premise);
    }

    let mut rule = InferenceRule::new(name.clone(), Some(conclusion), premises);
    rule.fresh = fresh_table;
    Ok(rule)
}

fn add_proof_line(
    fac: &TermFactory,
    proof: &mut Proof,
    line_refs: &mut HashMap<String, crate::nd::line::LineRef>,
    line: &str,
    source: &Rc<str>,
    line_no: usize,
) -> Result<(), ParseError> {
    // Fields are tab-separated; runs of empty fields (from consecutive
    // tabs) collapse, per spec §6.
    let tokens: Vec<&str> = line.split('\t').map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.len() < 2 {
        return Err(ParseError::in_file(
            source.to_string().into(),
            line_no,
            "a proof line needs at least a line number and a sentence",
        ));
    }

    let sentence = parse_term_str(fac, tokens[1])
        .map_err(|e| ParseError::in_file(source.to_string().into(), line_no, e.to_string()))?;

    let rule = if tokens.len() >= 3 {
        proof.rule(tokens[2]).cloned().ok_or_else(|| {
            ParseError::in_file(
                source.to_string().into(),
                line_no,
                format!("'{}' is not a defined inference rule or proof", tokens[2]),
            )
        })?
    } else {
        proof.rule("Assumption").cloned().expect("Assumption is always registered")
    };

    let mut supports = Vec::new();
    if tokens.len() >= 4 {
        for id in tokens[3].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let r = line_refs.get(id).copied().ok_or_else(|| {
                ParseError::in_file(source.to_string().into(), line_no, format!("'{id}' is not a line"))
            })?;
            supports.push(r);
        }
    }

    let line_ref = proof.add_line(Some(sentence), Some(rule), supports);
    line_refs.insert(tokens[0].to_string(), line_ref);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoIncludes;
    impl IncludeSource for NoIncludes {
        fn read_include(&mut self, path: &str) -> std::io::Result<String> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, path))
        }
    }

    #[test]
    fn parses_modus_ponens_rule_and_proof() {
        let fac = TermFactory::new();
        let text = "\
inference
MP
if(?P,?Q)
?P
?Q
done

proof
Demo
1\tif(A,B)
2\tA
3\tB\tMP\t1,2
done
";
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap();
        assert!(parsed.rules.contains_key("MP"));
        assert_eq!(parsed.proofs.len(), 1);
        let (name, proof) = &parsed.proofs[0];
        assert_eq!(name, "Demo");
        assert_eq!(proof.borrow_mut().verify(), crate::nd::proof::VerifyOutcome::Valid);
    }

    #[test]
    fn forward_reference_fails_at_the_referencing_line() {
        let fac = TermFactory::new();
        let text = "\
inference
MP
if(?P,?Q)
?P
?Q
done

proof
Demo
1\tB\tMP\t2,3
2\tif(A,B)
3\tA
done
";
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap();
        let (_, proof) = &parsed.proofs[0];
        assert_eq!(proof.borrow_mut().verify(), crate::nd::proof::VerifyOutcome::FailingLine(1));
    }

    #[test]
    fn derived_rule_is_reusable_by_name_in_a_later_proof() {
        let fac = TermFactory::new();
        let text = "\
proof
Reflexivity
1\tA
done

proof
UsesIt
1\tP
2\tP\tReflexivity\t1
done
";
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap();
        assert_eq!(parsed.proofs.len(), 2);
        for (_, proof) in &parsed.proofs {
            assert_eq!(proof.borrow_mut().verify(), crate::nd::proof::VerifyOutcome::Valid);
        }
    }

    #[test]
    fn unknown_inference_rule_is_a_parse_error() {
        let fac = TermFactory::new();
        let text = "\
proof
Demo
1\tA
2\tB\tNoSuchRule\t1
done
";
        let err = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap_err();
        assert!(err.message.contains("NoSuchRule"));
    }

    #[test]
    fn unknown_support_reference_is_a_parse_error() {
        let fac = TermFactory::new();
        let text = "\
inference
MP
if(?P,?Q)
?P
?Q
done

proof
Demo
1\tif(A,B)
2\tB\tMP\t1,99
done
";
        let err = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap_err();
        assert!(err.message.contains("99"));
    }

    #[test]
    fn set_directive_is_a_no_op() {
        let fac = TermFactory::new();
        let text = "\
set\tfoo\tbar
proof
Demo
1\tA
done
";
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut NoIncludes).unwrap();
        assert_eq!(parsed.proofs.len(), 1);
    }

    struct MapIncludes(HashMap<&'static str, &'static str>);
    impl IncludeSource for MapIncludes {
        fn read_include(&mut self, path: &str) -> std::io::Result<String> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path))
        }
    }

    #[test]
    fn include_splices_another_file_lines() {
        let fac = TermFactory::new();
        let mut includes = MapIncludes(HashMap::from([(
            "rules.proof",
            "inference\nMP\nif(?P,?Q)\n?P\n?Q\ndone\n",
        )]));
        let text = "\
include\trules.proof
proof
Demo
1\tif(A,B)
2\tA
3\tB\tMP\t1,2
done
";
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut includes).unwrap();
        assert!(parsed.rules.contains_key("MP"));
        assert_eq!(parsed.proofs[0].1.borrow_mut().verify(), crate::nd::proof::VerifyOutcome::Valid);
    }

    #[test]
    fn repeated_whole_file_include_is_ignored_after_first() {
        let fac = TermFactory::new();
        let mut includes = MapIncludes(HashMap::from([(
            "rules.proof",
            "inference\nMP\nif(?P,?Q)\n?P\n?Q\ndone\n",
        )]));
        let text = "\
include\trules.proof
include\trules.proof
proof
Demo
1\tA
done
";
        // Should not error (duplicate rule definition would conflict) and
        // should still parse the one proof.
        let parsed = parse_proof_file(&fac, "test.proof", text, &mut includes).unwrap();
        assert_eq!(parsed.proofs.len(), 1);
    }
}
