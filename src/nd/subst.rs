//! Substitutions and the two combinators that operate on them: `substitute`
//! (apply a substitution to a term) and `map_merge` (fuse two substitutions
//! under subsumption). Grounded in pyLemma's `Sentence.subsitute` and
//! `util.mapMerge` (§4.3, §9).

use std::collections::HashMap;

use crate::nd::term::Term;

/// A finite map from placeholder terms (Variable, Wff, or a ContextualOperator
/// root) to the terms they're bound to. Only ever keyed by non-Literal terms
/// (spec §3 invariant: "A Literal is never reachable as a key").
pub type Substitution = HashMap<Term, Term>;

/// Apply `sigma` to `term`.
///
/// `replace_all = true` rewrites every occurrence and returns the single
/// result. `replace_all = false` enumerates every combination of "rewrite
/// this matched sub-position or leave it be", per pyLemma's `subsitute`
/// (§9 Open Question 2, resolved in SPEC_FULL.md §4.2): if the whole `term`
/// is itself a key, the substitution there is unconditional: there's no
/// "leave it as the key" branch at that exact node, only at sub-positions.
pub fn substitute(term: &Term, sigma: &Substitution, replace_all: bool) -> Vec<Term> {
    if let Some(bound) = sigma.get(term) {
        return vec![bound.clone()];
    }

    if replace_all {
        let mut result = term.clone();
        result = apply_all(&result, sigma);
        return vec![result];
    }

    let mut results = vec![term.clone()];
    match term {
        Term::Compound(data) => {
            let positions: Vec<&Term> = std::iter::once(&data.op).chain(data.args.iter()).collect();
            for (i, pos) in positions.iter().enumerate() {
                for sub in substitute(pos, sigma, false) {
                    if &sub == *pos {
                        continue;
                    }
                    let rebuilt = rebuild_compound(term, i, sub);
                    results.push(rebuilt.clone());
                    results.extend(substitute(&rebuilt, sigma, false));
                }
            }
        }
        Term::ContextualOperator(data) => {
            for (i, pos) in [&data.hole, &data.body].into_iter().enumerate() {
                for sub in substitute(pos, sigma, false) {
                    if &sub == pos {
                        continue;
                    }
                    let rebuilt = rebuild_contextual(term, i, sub);
                    results.push(rebuilt.clone());
                    results.extend(substitute(&rebuilt, sigma, false));
                }
            }
        }
        _ => {}
    }

    dedup(results)
}

fn dedup(mut terms: Vec<Term>) -> Vec<Term> {
    let mut seen = Vec::new();
    terms.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });
    terms
}

fn rebuild_compound(term: &Term, position: usize, replacement: Term) -> Term {
    let Term::Compound(data) = term else {
        unreachable!("rebuild_compound called on non-compound");
    };
    if position == 0 {
        Term::Compound(std::rc::Rc::new(crate::nd::term::CompoundData {
            op: replacement,
            args: data.args.clone(),
        }))
    } else {
        let mut args = data.args.clone();
        args[position - 1] = replacement;
        Term::Compound(std::rc::Rc::new(crate::nd::term::CompoundData { op: data.op.clone(), args }))
    }
}

fn rebuild_contextual(term: &Term, position: usize, replacement: Term) -> Term {
    let Term::ContextualOperator(data) = term else {
        unreachable!("rebuild_contextual called on non-contextual-operator");
    };
    if position == 0 {
        Term::ContextualOperator(std::rc::Rc::new(crate::nd::term::ContextualData {
            hole: replacement,
            body: data.body.clone(),
        }))
    } else {
        Term::ContextualOperator(std::rc::Rc::new(crate::nd::term::ContextualData {
            hole: data.hole.clone(),
            body: replacement,
        }))
    }
}

/// `replace_all = true` helper: `term.apply_function` wired to look each
/// sub-term up in `sigma`.
fn apply_all(term: &Term, sigma: &Substitution) -> Term {
    term.apply_function(
        &mut |t: &Term, sigma: &mut &Substitution| sigma.get(t).cloned().unwrap_or_else(|| t.clone()),
        &mut &*sigma,
    )
}

/// The smallest map containing every key of `a` and `b`. For a key in both,
/// keep the `≤`-greater value (the one with more structure); fail (return
/// `None`) if the two values are incomparable and unequal.
///
/// This is spec.md's redesign of pyLemma's `util.mapMerge`, which only
/// checks strict value equality on key collision (see DESIGN.md — we
/// implement the spec's subsumption-based version, not the original).
pub fn map_merge(a: &Substitution, b: &Substitution) -> Option<Substitution> {
    if a.is_empty() {
        return Some(b.clone());
    }
    if b.is_empty() {
        return Some(a.clone());
    }

    let mut merged = a.clone();
    for (key, b_val) in b {
        match merged.get(key) {
            None => {
                merged.insert(key.clone(), b_val.clone());
            }
            Some(a_val) => {
                if a_val == b_val {
                    continue;
                } else if a_val.le(b_val) {
                    merged.insert(key.clone(), b_val.clone());
                } else if b_val.le(a_val) {
                    // a_val already kept, it's the greater one.
                } else {
                    return None;
                }
            }
        }
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nd::term::TermFactory;

    #[test]
    fn replace_all_rewrites_every_occurrence() {
        let f = TermFactory::new();
        let x = f.variable("x");
        let a = f.literal("a");
        let sen = f.compound(f.literal("and"), vec![x.clone(), x.clone()]);
        let mut sigma = Substitution::new();
        sigma.insert(x, a.clone());
        let results = substitute(&sen, &sigma, true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0], f.compound(f.literal("and"), vec![a.clone(), a]));
    }

    #[test]
    fn replace_all_false_enumerates_keep_or_replace() {
        let f = TermFactory::new();
        let x = f.variable("x");
        let a = f.literal("a");
        let sen = f.compound(f.literal("and"), vec![x.clone(), x.clone()]);
        let mut sigma = Substitution::new();
        sigma.insert(x, a.clone());
        let results = substitute(&sen, &sigma, false);
        // original, left-replaced, right-replaced, both-replaced
        assert!(results.contains(&sen));
        assert!(results.contains(&f.compound(f.literal("and"), vec![a.clone(), a.clone()])));
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn whole_term_key_match_is_unconditional() {
        let f = TermFactory::new();
        let x = f.variable("x");
        let a = f.literal("a");
        let mut sigma = Substitution::new();
        sigma.insert(x.clone(), a.clone());
        let results = substitute(&x, &sigma, false);
        assert_eq!(results, vec![a]);
    }

    #[test]
    fn map_merge_keeps_greater_binding() {
        let f = TermFactory::new();
        let p = f.wff("P");
        // a Wff value (maximally unspecific, a stand-in like the case-6
        // sentinel) is subsumed by a concrete literal bound to the same key.
        let sentinel = f.wff("sentinel");
        let a = f.literal("a");

        let mut sigma_a = Substitution::new();
        sigma_a.insert(p.clone(), sentinel);
        let mut sigma_b = Substitution::new();
        sigma_b.insert(p.clone(), a.clone());

        let merged = map_merge(&sigma_a, &sigma_b).expect("wff value is subsumed by the literal value");
        assert_eq!(merged.get(&p), Some(&a));
    }

    #[test]
    fn map_merge_fails_on_incomparable_literals() {
        let f = TermFactory::new();
        let p = f.wff("P");
        let a = f.literal("a");
        let b = f.literal("b");

        let mut sigma_a = Substitution::new();
        sigma_a.insert(p.clone(), a);
        let mut sigma_b = Substitution::new();
        sigma_b.insert(p, b);

        assert!(map_merge(&sigma_a, &sigma_b).is_none());
    }

    #[test]
    fn map_merge_identity_on_empty() {
        let f = TermFactory::new();
        let p = f.wff("P");
        let mut sigma = Substitution::new();
        sigma.insert(p, f.literal("a"));
        assert_eq!(map_merge(&Substitution::new(), &sigma), Some(sigma.clone()));
        assert_eq!(map_merge(&sigma, &Substitution::new()), Some(sigma));
    }
}
