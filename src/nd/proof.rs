//! `Proof`: an ordered sequence of lines, the line-by-line verifier (§4.5),
//! and derived-rule promotion (§4.6). Grounded in pyLemma's `proof.Proof`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::nd::line::{Line, LineRef};
use crate::nd::rule::{make_mapping, InferenceRule, RuleRef};
use crate::nd::term::Term;

struct Slot {
    generation: u64,
    line: Option<Line>,
}

/// Clean/dirty/verified per spec §4.5: any structural edit drops straight to
/// `Dirty`; `verify` on either non-verified state produces `Verified` or
/// reports the failing line (and resets to `Clean`, numbers cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofState {
    Clean,
    Dirty,
    Verified,
}

/// The result of [`Proof::verify`]: either every line checked out, or the
/// first failing line under the proof's numbering function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    FailingLine(usize),
}

/// An ordered sequence of lines plus the name table of rules it references.
/// A `Proof` *is* a rule (§3): its assumption lines are premises, any of its
/// lines may serve as a conclusion (§4.6).
pub struct Proof {
    name: String,
    slots: Vec<Slot>,
    order: Vec<usize>,
    inferences: HashMap<String, RuleRef>,
    state: ProofState,
    numbering: fn(usize) -> usize,
}

impl Proof {
    pub fn new(name: impl Into<String>) -> Self {
        let mut inferences = HashMap::new();
        inferences.insert("Assumption".to_string(), RuleRef::Atomic(Rc::new(InferenceRule::assumption())));
        Proof {
            name: name.into(),
            slots: Vec::new(),
            order: Vec::new(),
            inferences,
            state: ProofState::Clean,
            numbering: |pos| pos + 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProofState {
        self.state
    }

    pub fn set_numbering(&mut self, numbering: fn(usize) -> usize) {
        self.numbering = numbering;
    }

    pub fn register_rule(&mut self, rule: RuleRef) {
        self.inferences.insert(rule.name(), rule);
    }

    pub fn rule(&self, name: &str) -> Option<&RuleRef> {
        self.inferences.get(name)
    }

    pub fn inferences(&self) -> &HashMap<String, RuleRef> {
        &self.inferences
    }

    /// Append a new line at the end of the proof and return a reference to
    /// it (for later lines in the same parse to cite as a support).
    pub fn add_line(&mut self, sentence: Option<Term>, rule: Option<RuleRef>, supports: Vec<LineRef>) -> LineRef {
        let index = self.slots.len();
        self.slots.push(Slot { generation: 0, line: Some(Line::new(sentence, rule, supports)) });
        self.order.push(index);
        self.state = ProofState::Dirty;
        LineRef { index, generation: 0 }
    }

    /// Replace a line's contents in place via its single edit method
    /// (spec §9). Any outstanding `LineRef` to this line remains valid
    /// (same generation) since the slot itself wasn't removed.
    pub fn edit_line(&mut self, line_ref: LineRef, sentence: Option<Term>, rule: Option<RuleRef>, supports: Vec<LineRef>) {
        if let Some(line) = self.resolve_mut(line_ref) {
            line.edit(sentence, rule, supports);
            self.state = ProofState::Dirty;
        }
    }

    /// Remove a line. Any other line whose supports still name this
    /// `LineRef` will find it dangling on the next `verify` (its generation
    /// no longer matches).
    pub fn remove_line(&mut self, line_ref: LineRef) {
        if let Some(slot) = self.slots.get_mut(line_ref.index) {
            if slot.generation == line_ref.generation {
                slot.line = None;
                slot.generation += 1;
            }
        }
        self.order.retain(|&i| i != line_ref.index);
        self.state = ProofState::Dirty;
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.order.iter().filter_map(move |&i| self.slots[i].line.as_ref())
    }

    fn resolve(&self, line_ref: LineRef) -> Option<&Line> {
        self.slots.get(line_ref.index).and_then(|slot| {
            if slot.generation == line_ref.generation {
                slot.line.as_ref()
            } else {
                None
            }
        })
    }

    fn resolve_mut(&mut self, line_ref: LineRef) -> Option<&mut Line> {
        self.slots.get_mut(line_ref.index).and_then(|slot| {
            if slot.generation == line_ref.generation {
                slot.line.as_mut()
            } else {
                None
            }
        })
    }

    /// §4.5: walk lines in textual order, checking that every support is
    /// already numbered (rules out forward and dangling references) and
    /// that the justifying rule accepts the sentence from those supports.
    pub fn verify(&mut self) -> VerifyOutcome {
        let order = self.order.clone();
        let mut err_pos: Option<usize> = None;

        'lines: for (pos, &slot_idx) in order.iter().enumerate() {
            let (sentence, rule, supports) = {
                let line = self.slots[slot_idx].line.as_ref().expect("order only names live slots");
                (line.sentence.clone(), line.rule.clone(), line.supports.clone())
            };

            if rule.is_none() {
                if sentence.is_some() {
                    err_pos = Some(pos);
                    break;
                }
                self.slots[slot_idx].line.as_mut().unwrap().set_number(Some(pos));
                continue;
            }

            let mut support_sentences = Vec::with_capacity(supports.len());
            for s in &supports {
                match self.resolve(*s) {
                    Some(support_line) if support_line.number().is_some() => {
                        support_sentences.push(
                            support_line.sentence.clone().expect("a numbered line always has a sentence"),
                        );
                    }
                    _ => {
                        err_pos = Some(pos);
                        break 'lines;
                    }
                }
            }

            let Some(sen) = sentence else {
                err_pos = Some(pos);
                break;
            };

            if !rule.unwrap().is_valid(&sen, &support_sentences) {
                err_pos = Some(pos);
                break;
            }

            self.slots[slot_idx].line.as_mut().unwrap().set_number(Some(pos));
        }

        match err_pos {
            None => {
                self.state = ProofState::Verified;
                VerifyOutcome::Valid
            }
            Some(pos) => {
                for &idx in &order {
                    if let Some(line) = self.slots[idx].line.as_mut() {
                        line.set_number(None);
                    }
                }
                self.state = ProofState::Clean;
                VerifyOutcome::FailingLine((self.numbering)(pos))
            }
        }
    }

    /// Lines whose rule is the built-in `Assumption` and whose conclusion
    /// schema is `<=` a bare Variable (§4.6 step 2, grounded in pyLemma's
    /// `getPremises`).
    pub fn premises(&self) -> Vec<Term> {
        let anonymous_variable = Term::Variable("".into());
        self.lines()
            .filter(|line| match line.rule() {
                Some(RuleRef::Atomic(rule)) => {
                    rule.premises.is_empty()
                        && rule.conclusion.as_ref().is_some_and(|c| c.le(&anonymous_variable))
                }
                _ => false,
            })
            .filter_map(|line| line.sentence().cloned())
            .collect()
    }

    /// Derived-rule promotion (§4.6): does this (verified) proof prove that
    /// `sen` follows from `refs`?
    pub fn is_valid(&mut self, sen: &Term, refs: &[Term]) -> bool {
        if self.verify() != VerifyOutcome::Valid {
            return false;
        }

        let generalized_premises: Vec<Term> = self.premises().iter().map(Term::generalize).collect();

        let turnstile = Term::Literal("|-".into());
        let (target, mut all_refs) = if sen.op() == turnstile && sen.arity() == 2 {
            let mut refs = refs.to_vec();
            let left = &sen.args()[0];
            if !matches!(left, Term::Literal(name) if name.is_empty()) {
                refs.push(left.clone());
            }
            (sen.args()[1].clone(), refs)
        } else {
            (sen.clone(), refs.to_vec())
        };
        all_refs.dedup();

        let fresh = HashMap::new();
        for line in self.lines() {
            let Some(line_sen) = line.sentence() else { continue };
            let generalized = line_sen.generalize();
            for conclusion_map in crate::nd::matcher::map_into(&generalized, &target, true) {
                if make_mapping(&conclusion_map, &generalized_premises, &all_refs, true, &fresh).is_some() {
                    return true;
                }
            }
        }
        false
    }
}

impl std::fmt::Debug for Proof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proof")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("lines", &self.order.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nd::term::TermFactory;

    fn modus_ponens(f: &TermFactory) -> RuleRef {
        let p = f.wff("P");
        let q = f.wff("Q");
        let if_pq = f.compound(f.literal("if"), vec![p.clone(), q.clone()]);
        RuleRef::Atomic(Rc::new(InferenceRule::new("MP", Some(q), vec![if_pq, p])))
    }

    #[test]
    fn modus_ponens_proof_verifies() {
        let f = TermFactory::new();
        let mut proof = Proof::new("demo");
        proof.register_rule(modus_ponens(&f));

        let assumption = proof.rule("Assumption").cloned().unwrap();
        let mp = proof.rule("MP").cloned().unwrap();

        let if_ab = f.compound(f.literal("if"), vec![f.literal("A"), f.literal("B")]);
        let l1 = proof.add_line(Some(if_ab), Some(assumption.clone()), vec![]);
        let l2 = proof.add_line(Some(f.literal("A")), Some(assumption), vec![]);
        proof.add_line(Some(f.literal("B")), Some(mp), vec![l1, l2]);

        assert_eq!(proof.verify(), VerifyOutcome::Valid);
    }

    #[test]
    fn forward_reference_fails_at_referencing_line() {
        let f = TermFactory::new();
        let mut proof = Proof::new("demo");
        proof.register_rule(modus_ponens(&f));
        let assumption = proof.rule("Assumption").cloned().unwrap();
        let mp = proof.rule("MP").cloned().unwrap();

        // Pre-allocate all three slots in textual order (as a two-pass
        // parser would, to resolve by-name supports before their content is
        // known), then fill them in: the MP line physically comes first but
        // cites the two assumptions that follow it.
        let l1 = proof.add_line(None, None, vec![]);
        let l2 = proof.add_line(None, None, vec![]);
        let l3 = proof.add_line(None, None, vec![]);
        let if_ab = f.compound(f.literal("if"), vec![f.literal("A"), f.literal("B")]);
        proof.edit_line(l1, Some(f.literal("B")), Some(mp), vec![l2, l3]);
        proof.edit_line(l2, Some(if_ab), Some(assumption.clone()), vec![]);
        proof.edit_line(l3, Some(f.literal("A")), Some(assumption), vec![]);

        // Line 1 (1-based) cites supports at later textual positions.
        assert_eq!(proof.verify(), VerifyOutcome::FailingLine(1));
    }

    #[test]
    fn removing_a_supporting_line_dangles_the_reference() {
        let f = TermFactory::new();
        let mut proof = Proof::new("demo");
        proof.register_rule(modus_ponens(&f));
        let assumption = proof.rule("Assumption").cloned().unwrap();
        let mp = proof.rule("MP").cloned().unwrap();

        let if_ab = f.compound(f.literal("if"), vec![f.literal("A"), f.literal("B")]);
        let l1 = proof.add_line(Some(if_ab), Some(assumption.clone()), vec![]);
        let l2 = proof.add_line(Some(f.literal("A")), Some(assumption), vec![]);
        proof.add_line(Some(f.literal("B")), Some(mp), vec![l1, l2]);
        assert_eq!(proof.verify(), VerifyOutcome::Valid);

        proof.remove_line(l1);
        assert_eq!(proof.verify(), VerifyOutcome::FailingLine(2));
    }

    #[test]
    fn derived_rule_reuse_matches_generalized_premises_to_refs() {
        let f = TermFactory::new();
        let mut reflexivity = Proof::new("Reflexivity");
        let assumption = reflexivity.rule("Assumption").cloned().unwrap();
        reflexivity.add_line(Some(f.literal("A")), Some(assumption), vec![]);
        assert_eq!(reflexivity.verify(), VerifyOutcome::Valid);

        // The proof's one line is both its premise and its conclusion, so
        // reused as a rule it proves "concrete" from a ref of "concrete".
        let concrete = f.literal("P");
        assert!(reflexivity.is_valid(&concrete, &[concrete.clone()]));
        assert!(!reflexivity.is_valid(&concrete, &[]));
    }
}
