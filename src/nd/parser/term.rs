//! Prefix-syntax term parser (§4.7). Grounded in pyLemma's
//! `parsers.prefixSentenceParser`, rewritten as a bounded recursive-descent
//! parser over `&str` the way the teacher's `nars::parser` tokenizes
//! Narsese with `nom` primitives for the leaf tokens.
//!
//! Concrete grammar (whitespace is stripped before parsing, matching
//! pyLemma's `"".join(string.split())`):
//!
//! ```text
//! term     := wff | var | lit | compound | ctxop | group
//! wff      := '@' name
//! var      := '?' name
//! lit      := name
//! compound := head '(' term (',' term)* ')'      ; head optional -> empty-name op
//! ctxop    := head '[' term ']'
//! group    := '(' term ')'                        ; no comma -> just grouping
//! ```
//!
//! `head` is itself a `wff | var | lit` (never a compound) — this lets a
//! rule schema's operator position be a schema variable (`?P[?x](...)`)
//! while keeping a compound's own argument list free of ambiguity.
//!
//! The grammar in spec.md §4.7 permits a comma-separated list inside a
//! `ctxop`'s brackets (`'[' term (',' term)* ']'`), but §3's data model
//! gives `ContextualOperator` exactly one hole and one body term. We
//! resolve that by folding multiple bracketed terms into a single body via
//! the same empty-name-compound convention used for a bare `(a,b)` (see
//! `DESIGN.md`); every worked example in spec.md only ever uses a single
//! bracketed term, so this never fires in practice.

use nom::bytes::complete::take_while1;
use nom::IResult;

use crate::nd::term::{Term, TermFactory};

/// A syntax error local to term parsing; the caller (premise/file parser)
/// attaches file + line context and turns this into an `nd::error::ParseError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSyntaxError(pub String);

impl std::fmt::Display for TermSyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !"()[],$@?#".contains(c)
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

/// Byte offset of the close bracket matching the open bracket at byte 0 of
/// `s` (either `(`/`)` or `[`/`]`; the two bracket kinds share one nesting
/// counter so a `[` inside a `(...)` group, or vice versa, doesn't throw
/// off the count).
fn matching_close(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `s` on top-level commas, i.e. commas not nested inside `(...)` or
/// `[...]`.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Parses the bare head of a term: a Wff, Variable, or Literal (never a
/// compound — a compound's operator position is always one of these three).
fn parse_head<'a>(fac: &TermFactory, input: &'a str) -> Result<(Term, &'a str), TermSyntaxError> {
    if let Some(rest) = input.strip_prefix('@') {
        let (rest, name) =
            parse_name(rest).map_err(|_| TermSyntaxError("Expected a name after '@'".into()))?;
        return Ok((fac.wff(name), rest));
    }
    if let Some(rest) = input.strip_prefix('?') {
        let (rest, name) =
            parse_name(rest).map_err(|_| TermSyntaxError("Expected a name after '?'".into()))?;
        return Ok((fac.variable(name), rest));
    }
    let (rest, name) =
        parse_name(input).map_err(|_| TermSyntaxError(format!("Expected a term, found '{}'", first_chunk(input))))?;
    Ok((fac.literal(name), rest))
}

fn first_chunk(s: &str) -> &str {
    let end = s.char_indices().nth(16).map(|(i, _)| i).unwrap_or(s.len());
    &s[..end]
}

/// Parses one term starting at byte 0 of `input`, returning the term and
/// whatever input remains unconsumed.
pub fn parse_term<'a>(fac: &TermFactory, input: &'a str) -> Result<(Term, &'a str), TermSyntaxError> {
    // An empty string is the empty-name Literal (pyLemma's `emptySen`,
    // `prefixSentenceParser('')`); it shows up as the inner term of `()`.
    if input.is_empty() {
        return Ok((fac.literal(""), input));
    }

    // A leading '(' with no preceding head is either a grouping paren
    // (no top-level comma) or an empty-operator compound (§4.7: "treats a
    // parenthesised list with no operator (a,b) as a compound with an
    // empty-name operator").
    if input.starts_with('(') {
        let close = matching_close(input)
            .ok_or_else(|| TermSyntaxError("Unmatched Open Parenthesis".into()))?;
        let inner = &input[1..close];
        let rest = &input[close + 1..];
        let parts = split_top_level_commas(inner);
        if parts.len() <= 1 {
            let (term, leftover) = parse_term(fac, inner)?;
            if !leftover.is_empty() {
                return Err(TermSyntaxError(format!("Unexpected trailing input '{leftover}'")));
            }
            return Ok((term, rest));
        }
        let mut args = Vec::with_capacity(parts.len());
        for part in parts {
            let (term, leftover) = parse_term(fac, part)?;
            if !leftover.is_empty() {
                return Err(TermSyntaxError(format!("Unexpected trailing input '{leftover}'")));
            }
            args.push(term);
        }
        return Ok((fac.compound(fac.literal(""), args), rest));
    }

    let (mut head, mut rest) = parse_head(fac, input)?;

    // Optional single contextual-operator bracket: `head[body]`.
    if rest.starts_with('[') {
        let close = matching_close(rest).ok_or_else(|| TermSyntaxError("Unmatched Open Bracket".into()))?;
        let inner = &rest[1..close];
        rest = &rest[close + 1..];
        let parts = split_top_level_commas(inner);
        let body = if parts.len() <= 1 {
            let (term, leftover) = parse_term(fac, inner)?;
            if !leftover.is_empty() {
                return Err(TermSyntaxError(format!("Unexpected trailing input '{leftover}'")));
            }
            term
        } else {
            let mut args = Vec::with_capacity(parts.len());
            for part in parts {
                let (term, leftover) = parse_term(fac, part)?;
                if !leftover.is_empty() {
                    return Err(TermSyntaxError(format!("Unexpected trailing input '{leftover}'")));
                }
                args.push(term);
            }
            fac.compound(fac.literal(""), args)
        };
        head = fac.contextual_operator(head, body);
    }

    // Optional single compound-call parens: `head(arg, arg, ...)`.
    if rest.starts_with('(') {
        let close = matching_close(rest).ok_or_else(|| TermSyntaxError("Unmatched Open Parenthesis".into()))?;
        let inner = &rest[1..close];
        rest = &rest[close + 1..];
        let parts = split_top_level_commas(inner);
        let args = if parts.len() == 1 && parts[0].is_empty() {
            Vec::new()
        } else {
            let mut args = Vec::with_capacity(parts.len());
            for part in parts {
                let (term, leftover) = parse_term(fac, part)?;
                if !leftover.is_empty() {
                    return Err(TermSyntaxError(format!("Unexpected trailing input '{leftover}'")));
                }
                args.push(term);
            }
            args
        };
        head = fac.compound(head, args);
    }

    Ok((head, rest))
}

/// Checks the whole string for balanced `()`/`[]` before parsing, matching
/// pyLemma's up-front paren-count check (and pinning the exact message of
/// spec.md §8 scenario 6: `"and(P, Q"` → `"Unmatched Open Parenthesis"`).
fn check_balance(s: &str) -> Result<(), TermSyntaxError> {
    let opens = s.chars().filter(|&c| c == '(').count() as i64;
    let closes = s.chars().filter(|&c| c == ')').count() as i64;
    if opens > closes {
        return Err(TermSyntaxError("Unmatched Open Parenthesis".into()));
    }
    if closes > opens {
        return Err(TermSyntaxError("Unmatched Close Parenthesis".into()));
    }
    let bopens = s.chars().filter(|&c| c == '[').count() as i64;
    let bcloses = s.chars().filter(|&c| c == ']').count() as i64;
    if bopens > bcloses {
        return Err(TermSyntaxError("Unmatched Open Bracket".into()));
    }
    if bcloses > bopens {
        return Err(TermSyntaxError("Unmatched Close Bracket".into()));
    }
    Ok(())
}

/// Parses a whole term from a string, requiring every byte to be consumed.
pub fn parse_term_str(fac: &TermFactory, input: &str) -> Result<Term, TermSyntaxError> {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    check_balance(&stripped)?;
    let (term, rest) = parse_term(fac, &stripped)?;
    if !rest.is_empty() {
        return Err(TermSyntaxError(format!("Unexpected trailing input '{rest}'")));
    }
    Ok(term)
}

/// Parses a premise/conclusion sentence together with its freshness
/// annotations (§4.7's `fresh` production: `term ('$' name)*`). The `$`
/// tokens trail the term on the same line; each introduces one freshness
/// obligation (spec §3's auxiliary metadata, implemented as `InferenceRule::fresh`).
pub fn parse_premise(fac: &TermFactory, input: &str) -> Result<(Term, Vec<Term>), TermSyntaxError> {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    check_balance(&stripped)?;
    let (term, mut rest) = parse_term(fac, &stripped)?;
    let mut fresh = Vec::new();
    while let Some(after_dollar) = rest.strip_prefix('$') {
        let (fresh_term, leftover) = parse_term(fac, after_dollar)?;
        fresh.push(fresh_term);
        rest = leftover;
    }
    if !rest.is_empty() {
        return Err(TermSyntaxError(format!("Unexpected trailing input '{rest}'")));
    }
    Ok((term, fresh))
}
