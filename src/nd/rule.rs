//! Inference rules and the bipartite premise-to-support assignment that
//! decides whether a rule justifies a line (§4.4). Grounded in pyLemma's
//! `inference.Inference.isValid` and `proof.Proof.makeMapping`/
//! `makeMappingHelper`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::nd::matcher::map_into;
use crate::nd::proof::Proof;
use crate::nd::subst::{map_merge, Substitution};
use crate::nd::term::Term;

/// A rule is either an atomic, hand-written [`InferenceRule`] or a verified
/// [`Proof`] reused polymorphically as a rule (§4.6, §9: "never inherit one
/// from the other" — this sum type is the alternative spec.md names to a
/// shared base class).
#[derive(Debug, Clone)]
pub enum RuleRef {
    Atomic(Rc<InferenceRule>),
    Derived(Rc<RefCell<Proof>>),
}

impl RuleRef {
    pub fn name(&self) -> String {
        match self {
            RuleRef::Atomic(rule) => rule.name.clone(),
            RuleRef::Derived(proof) => proof.borrow().name().to_string(),
        }
    }

    /// Does this rule (atomic or derived) justify `sen` from `refs`?
    pub fn is_valid(&self, sen: &Term, refs: &[Term]) -> bool {
        match self {
            RuleRef::Atomic(rule) => rule.is_valid(sen, refs),
            RuleRef::Derived(proof) => proof.borrow_mut().is_valid(sen, refs),
        }
    }
}

/// `premises → conclusion`, with an optional freshness side-table.
///
/// `fresh` maps a premise term to the variables that must be fresh when that
/// premise is matched: their image under the winning substitution must not
/// occur in any of the reference sentences passed to `is_valid` (§4.4 step
/// 4). This is the typed replacement for pyLemma's generic
/// `extraData['extra']['newVars']` bag (see SPEC_FULL.md §3).
#[derive(Debug, Clone)]
pub struct InferenceRule {
    pub name: String,
    pub conclusion: Option<Term>,
    pub premises: Vec<Term>,
    pub fresh: HashMap<Term, Vec<Term>>,
}

impl InferenceRule {
    pub fn new(name: impl Into<String>, conclusion: Option<Term>, premises: Vec<Term>) -> Self {
        InferenceRule { name: name.into(), conclusion, premises, fresh: HashMap::new() }
    }

    /// The built-in zero-premise rule used for assumption lines: its
    /// conclusion is a bare Wff, so it matches any sentence, and because a
    /// Wff subsumes an anonymous Variable too, `getPremises`-style checks
    /// (conclusion `<=` Variable) recognize assumption lines correctly
    /// (grounded in pyLemma's `defaultInferenceParser('Assumption\n@A')`).
    pub fn assumption() -> Self {
        InferenceRule::new("Assumption", Some(Term::Wff("A".into())), Vec::new())
    }

    /// Does this rule justify `sen` from `refs` (the sentences of the
    /// resolved, live supports)?
    pub fn is_valid(&self, sen: &Term, refs: &[Term]) -> bool {
        let Some(conclusion) = &self.conclusion else {
            return true;
        };

        for conclusion_map in map_into(conclusion, sen, true) {
            if make_mapping(&conclusion_map, &self.premises, refs, false, &self.fresh).is_some() {
                return true;
            }
        }
        false
    }
}

/// Attempt to extend `conclusion_map` with a consistent assignment of every
/// premise to some reference in `refs`.
///
/// `exact`, when true, requires `premises.len() == refs.len()` up front
/// (used for derived-rule promotion, §4.6); atomic inference rules call
/// this with `exact = false` so that a rule may be applied with more
/// supports on hand than it needs.
///
/// Assignment is injective: once a reference has justified one premise in
/// the current branch it is not offered to another, per spec §4.4 step 3
/// ("pairing injectively") — pyLemma's own `makeMappingHelper` does not
/// track consumed references, a looseness spec.md tightens deliberately
/// (see DESIGN.md).
pub fn make_mapping(
    conclusion_map: &Substitution,
    premises: &[Term],
    refs: &[Term],
    exact: bool,
    fresh: &HashMap<Term, Vec<Term>>,
) -> Option<Substitution> {
    if premises.is_empty() {
        return Some(conclusion_map.clone());
    }
    if exact && premises.len() != refs.len() {
        return None;
    }
    let mut used = vec![false; refs.len()];
    make_mapping_helper(conclusion_map, premises, refs, fresh, &mut used)
}

fn make_mapping_helper(
    conclusion_map: &Substitution,
    premises: &[Term],
    refs: &[Term],
    fresh: &HashMap<Term, Vec<Term>>,
    used: &mut [bool],
) -> Option<Substitution> {
    let Some((cur_premise, rest)) = premises.split_first() else {
        return Some(conclusion_map.clone());
    };

    for i in 0..refs.len() {
        if used[i] {
            continue;
        }
        for mapping in map_into(cur_premise, &refs[i], false) {
            if violates_freshness(cur_premise, &mapping, refs, i, fresh) {
                continue;
            }
            let Some(merged) = map_merge(conclusion_map, &mapping) else {
                continue;
            };
            used[i] = true;
            if let Some(result) = make_mapping_helper(&merged, rest, refs, fresh, used) {
                return Some(result);
            }
            used[i] = false;
        }
    }
    None
}

/// A fresh-marked variable's image must not occur in any supporting
/// reference *other than* the one this premise itself matched against (that
/// one trivially contains the image). Grounded in spec §4.4 step 4 and the
/// worked freshness scenario of §8 (a bound name that also occurs in an
/// earlier, unrelated line fails the check).
fn violates_freshness(
    premise: &Term,
    mapping: &Substitution,
    refs: &[Term],
    matched: usize,
    fresh: &HashMap<Term, Vec<Term>>,
) -> bool {
    let Some(fresh_vars) = fresh.get(premise) else {
        return false;
    };
    fresh_vars.iter().any(|v| {
        mapping.get(v).is_some_and(|bound| {
            refs.iter().enumerate().any(|(j, other)| j != matched && other.contains(bound))
        })
    })
}
