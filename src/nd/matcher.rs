//! `mapInto`: the second-order pattern matcher (§4.2). Grounded in pyLemma's
//! `Sentence.mapInto` (cases 1-5) and `Operator.mapInto` (case 6, the
//! contextual-operator higher-order match).

use crate::nd::subst::{map_merge, substitute, Substitution};
use crate::nd::term::Term;

/// All minimal substitutions `sigma` such that `substitute(schema, sigma) ==
/// target`. Empty means no match; `[{}]` means "matches trivially."
///
/// `replace_all` is threaded through to the sentinel-substitution step of
/// case 6 exactly as pyLemma's `Operator.mapInto` does (it is the
/// `replaceAll` argument of the *enclosing* match, not a fresh default).
pub fn map_into(schema: &Term, target: &Term, replace_all: bool) -> Vec<Substitution> {
    match schema {
        Term::Literal(_) => {
            if schema == target {
                vec![Substitution::new()]
            } else {
                Vec::new()
            }
        }
        Term::Variable(name) => {
            if target.is_atomic() {
                let mut sigma = Substitution::new();
                sigma.insert(Term::Variable(name.clone()), target.clone());
                vec![sigma]
            } else {
                Vec::new()
            }
        }
        Term::Wff(name) => {
            let mut sigma = Substitution::new();
            sigma.insert(Term::Wff(name.clone()), target.clone());
            vec![sigma]
        }
        Term::Compound(schema_data) => {
            let Term::Compound(target_data) = target else {
                return Vec::new();
            };
            if schema_data.args.len() != target_data.args.len() {
                return Vec::new();
            }

            let mut results = vec![Substitution::new()];
            // operator, then each argument, left to right (§5: deterministic
            // pre-order enumeration).
            let pairs = std::iter::once((&schema_data.op, &target_data.op))
                .chain(schema_data.args.iter().zip(target_data.args.iter()));

            for (s, t) in pairs {
                let candidates = map_into(s, t, replace_all);
                if candidates.is_empty() {
                    return Vec::new();
                }
                let mut merged = Vec::new();
                for existing in &results {
                    for candidate in &candidates {
                        if let Some(m) = map_merge(existing, candidate) {
                            merged.push(m);
                        }
                    }
                }
                if merged.is_empty() {
                    return Vec::new();
                }
                results = merged;
            }
            results
        }
        Term::ContextualOperator(schema_data) => {
            let hole = &schema_data.hole;
            let body = &schema_data.body;
            let mut results = Vec::new();

            for s in target.sub_sentences() {
                for mu in map_into(body, &s, replace_all) {
                    let Some(subbed) = substitute(body, &mu, true).into_iter().next() else {
                        continue;
                    };

                    let mut sentinel_key = Substitution::new();
                    // A Wff with an arbitrary unused name acts as the
                    // sentinel placeholder for the replaced sub-position.
                    let sentinel = Term::Wff("\u{2205}".into());
                    sentinel_key.insert(subbed, sentinel.clone());

                    for structure in substitute(target, &sentinel_key, replace_all) {
                        if !hole.le(&structure.op()) {
                            continue;
                        }
                        let mut binding = Substitution::new();
                        binding.insert(hole.clone(), structure);
                        if let Some(merged) = map_merge(&binding, &mu) {
                            results.push(merged);
                        }
                    }
                }
            }
            results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nd::term::TermFactory;

    fn fac() -> TermFactory {
        TermFactory::new()
    }

    #[test]
    fn literal_matches_only_itself() {
        let f = fac();
        assert_eq!(map_into(&f.literal("a"), &f.literal("a"), true).len(), 1);
        assert!(map_into(&f.literal("a"), &f.literal("b"), true).is_empty());
    }

    #[test]
    fn variable_matches_atoms_only() {
        let f = fac();
        let x = f.variable("x");
        let a = f.literal("a");
        let compound = f.compound(f.literal("p"), vec![a.clone()]);
        assert_eq!(map_into(&x, &a, true).len(), 1);
        assert!(map_into(&x, &compound, true).is_empty());
    }

    #[test]
    fn wff_matches_anything() {
        let f = fac();
        let p = f.wff("P");
        let compound = f.compound(f.literal("and"), vec![f.literal("a"), f.literal("b")]);
        let results = map_into(&p, &compound, true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(&p), Some(&compound));
    }

    #[test]
    fn compound_requires_matching_arity() {
        let f = fac();
        let schema = f.compound(f.literal("p"), vec![f.wff("A")]);
        let target_wrong_arity = f.compound(f.literal("p"), vec![f.literal("a"), f.literal("b")]);
        assert!(map_into(&schema, &target_wrong_arity, true).is_empty());
    }

    #[test]
    fn compound_recurses_positionally() {
        let f = fac();
        let schema = f.compound(f.literal("if"), vec![f.wff("P"), f.wff("Q")]);
        let a = f.literal("a");
        let b = f.literal("b");
        let target = f.compound(f.literal("if"), vec![a.clone(), b.clone()]);
        let results = map_into(&schema, &target, true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(&f.wff("P")), Some(&a));
        assert_eq!(results[0].get(&f.wff("Q")), Some(&b));
    }

    #[test]
    fn reflexivity_every_term_maps_into_itself() {
        let f = fac();
        let sen = f.compound(f.literal("and"), vec![f.literal("a"), f.wff("B")]);
        assert!(!map_into(&sen, &sen, true).is_empty());
    }

    #[test]
    fn contextual_operator_single_hole_match() {
        // ?P[?x].mapInto(if(A(y),B(y))) == {?P |-> if(A([.]),B([.])), ?x |-> y}
        // exactly one substitution (spec §8 scenario 5): the candidate
        // hole-positions come from `target.sub_sentences()`, which must not
        // include the operator literals ("if", "A", "B") or this would
        // spuriously also bind `?x` to one of them.
        let f = fac();
        let p_hole = f.variable("P");
        let x = f.variable("x");
        let schema = f.contextual_operator(p_hole.clone(), x.clone());

        let y = f.literal("y");
        let a_y = f.compound(f.literal("A"), vec![y.clone()]);
        let b_y = f.compound(f.literal("B"), vec![y.clone()]);
        let target = f.compound(f.literal("if"), vec![a_y, b_y]);

        let results = map_into(&schema, &target, true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get(&x), Some(&y));

        let sentinel = Term::Wff("\u{2205}".into());
        let a_hole = f.compound(f.literal("A"), vec![sentinel.clone()]);
        let b_hole = f.compound(f.literal("B"), vec![sentinel]);
        let expected_context = f.compound(f.literal("if"), vec![a_hole, b_hole]);
        assert_eq!(results[0].get(&p_hole), Some(&expected_context));
    }
}
