//! A single Fitch-style proof line and the lifecycle-weak references between
//! lines. Grounded in pyLemma's `line.Line`, with the weak `weakref.ref`
//! support set replaced by proof-local `(index, generation)` pairs per
//! spec §9's design note ("implement as `(proof-id, line-index)` rather than
//! a raw pointer... resolve lazily; dangling = index no longer exists").

use crate::nd::rule::RuleRef;
use crate::nd::term::Term;

/// A reference to another line within the same proof. Resolving it through
/// `Proof::resolve` is how dangling/forward references are detected: the
/// generation must still match the slot's current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRef {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

/// One line of a proof: a sentence, the rule that justifies it (absent for
/// a blank line), and the supports it cites.
///
/// The only mutator is [`Line::edit`] (spec §9: "wrap mutation in a single
/// edit method that always invalidates the number; do not expose direct
/// field writes").
#[derive(Debug, Clone)]
pub struct Line {
    pub(crate) sentence: Option<Term>,
    pub(crate) rule: Option<RuleRef>,
    pub(crate) supports: Vec<LineRef>,
    number: Option<usize>,
}

impl Line {
    pub(crate) fn new(sentence: Option<Term>, rule: Option<RuleRef>, supports: Vec<LineRef>) -> Self {
        Line { sentence, rule, supports, number: None }
    }

    /// Replace this line's sentence, rule, and supports in one step. Always
    /// clears the assigned number, per the invariant in spec §3.
    pub fn edit(&mut self, sentence: Option<Term>, rule: Option<RuleRef>, supports: Vec<LineRef>) {
        self.sentence = sentence;
        self.rule = rule;
        self.supports = supports;
        self.number = None;
    }

    pub fn sentence(&self) -> Option<&Term> {
        self.sentence.as_ref()
    }

    pub fn rule(&self) -> Option<&RuleRef> {
        self.rule.as_ref()
    }

    pub fn supports(&self) -> &[LineRef] {
        &self.supports
    }

    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: Option<usize>) {
        self.number = number;
    }
}
