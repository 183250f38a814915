//! End-to-end checks mirroring the teacher's `nars::tests_integration`
//! shape (SPEC_FULL.md §2): build a small proof file by hand, parse and
//! verify it, assert on the result. These cover the six worked scenarios
//! of spec.md §8 as whole-pipeline tests, on top of the unit tests already
//! living alongside each module.

use crate::nd::parser::file::{parse_proof_file, IncludeSource};
use crate::nd::proof::VerifyOutcome;
use crate::nd::term::TermFactory;

struct NoIncludes;
impl IncludeSource for NoIncludes {
    fn read_include(&mut self, path: &str) -> std::io::Result<String> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, path))
    }
}

fn parse(text: &str) -> Vec<(String, VerifyOutcome)> {
    let fac = TermFactory::new();
    let parsed = parse_proof_file(&fac, "scenario.proof", text, &mut NoIncludes).unwrap();
    parsed.proofs.into_iter().map(|(name, proof)| (name, proof.borrow_mut().verify())).collect()
}

/// Scenario 1: modus ponens.
#[test]
fn modus_ponens_end_to_end() {
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
    let results = parse(text);
    assert_eq!(results, vec![("Demo".to_string(), VerifyOutcome::Valid)]);
}

/// Scenario 2: forward reference always fails at the referencing line.
#[test]
fn forward_reference_end_to_end() {
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
    let results = parse(text);
    assert_eq!(results, vec![("Demo".to_string(), VerifyOutcome::FailingLine(1))]);
}

/// Scenario 3: a freshness side-condition rejects a binding that also
/// occurs in another cited supporting line.
#[test]
fn freshness_violation_end_to_end() {
    let text = "\
inference
FreshIntro
@Q
?x $?x
P(?x)
done

proof
Demo
1\tA(a)
2\ta
3\tP(a)\tFreshIntro\t1,2
done
";
    let results = parse(text);
    assert_eq!(results, vec![("Demo".to_string(), VerifyOutcome::FailingLine(3))]);
}

/// The same rule applied with a genuinely new name (no other cited support
/// mentions it) succeeds.
#[test]
fn freshness_holds_for_a_new_name_end_to_end() {
    let text = "\
inference
FreshIntro
@Q
?x $?x
P(?x)
done

proof
Demo
1\tB
2\ta
3\tP(a)\tFreshIntro\t1,2
done
";
    let results = parse(text);
    assert_eq!(results, vec![("Demo".to_string(), VerifyOutcome::Valid)]);
}

/// Scenario 4: a verified proof is reusable as a named rule in a later
/// proof, and stays verified independently.
#[test]
fn derived_rule_reuse_end_to_end() {
    let text = "\
inference
TND
or(?A,not(?A))
done

proof
ExcludedMiddle
1\tor(A,not(A))\tTND
done

proof
UsesIt
1\tor(P,not(P))\tExcludedMiddle
done
";
    let results = parse(text);
    assert_eq!(
        results,
        vec![
            ("ExcludedMiddle".to_string(), VerifyOutcome::Valid),
            ("UsesIt".to_string(), VerifyOutcome::Valid),
        ]
    );
}

/// Scenario 5: the contextual-operator matcher decomposes a target into a
/// context-with-a-hole and the term that fills it.
#[test]
fn contextual_operator_match_end_to_end() {
    use crate::nd::matcher::map_into;

    let fac = TermFactory::new();
    let p = fac.variable("P");
    let x = fac.variable("x");
    let schema = fac.contextual_operator(p.clone(), x.clone());

    let y = fac.literal("y");
    let a_y = fac.compound(fac.literal("A"), vec![y.clone()]);
    let b_y = fac.compound(fac.literal("B"), vec![y.clone()]);
    let target = fac.compound(fac.literal("if"), vec![a_y, b_y]);

    let results = map_into(&schema, &target, true);
    assert!(!results.is_empty());
    assert!(results.iter().any(|sigma| sigma.get(&x) == Some(&y)));
}

/// Scenario 6: an unbalanced prefix term is a parse error with the pinned
/// message.
#[test]
fn unbalanced_parser_input_end_to_end() {
    use crate::nd::parser::term::parse_term_str;

    let fac = TermFactory::new();
    let err = parse_term_str(&fac, "and(P, Q").unwrap_err();
    assert_eq!(err.0, "Unmatched Open Parenthesis");
}

/// §8 boundary behaviour: an assumption-only prefix always verifies.
#[test]
fn assumption_only_prefix_always_verifies() {
    let text = "\
proof
JustAssumptions
1\tA
2\tB
done
";
    let results = parse(text);
    assert_eq!(results, vec![("JustAssumptions".to_string(), VerifyOutcome::Valid)]);
}
