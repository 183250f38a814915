//! The term algebra: literals, variables, wffs, compounds, and contextual
//! operators, plus the factory that interns them (§4.1).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A node shared by every `Compound` term: the operator (itself a `Term`,
/// so rules can be stated over a variable or wff operator) and its ordered
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompoundData {
    pub op: Term,
    pub args: Vec<Term>,
}

/// A node shared by every `ContextualOperator` term: the hole placeholder
/// and the body pattern the hole is matched against a position of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextualData {
    pub hole: Term,
    pub body: Term,
}

/// A sentence in the object language. See spec §3.
///
/// `Compound` and `ContextualOperator` wrap their payload in `Rc` so that
/// cloning a `Term` (which happens constantly while matching and
/// substituting) is O(1) regardless of subterm size. `Serialize`/
/// `Deserialize` (via serde's `rc` feature) let a front end dump a term to
/// JSON without the core depending on any particular printer (spec §1
/// treats printers as an external collaborator; SPEC_FULL.md §2 keeps
/// `serde` for exactly this, the way the teacher keeps it for its memory
/// snapshot export).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Literal(Rc<str>),
    Variable(Rc<str>),
    Wff(Rc<str>),
    Compound(Rc<CompoundData>),
    ContextualOperator(Rc<ContextualData>),
}

impl Term {
    /// The main operator of this term. Atomic terms are their own operator.
    pub fn op(&self) -> Term {
        match self {
            Term::Compound(data) => data.op.clone(),
            _ => self.clone(),
        }
    }

    /// The ordered arguments of this term. Atomic terms have none.
    pub fn args(&self) -> &[Term] {
        match self {
            Term::Compound(data) => &data.args,
            _ => &[],
        }
    }

    pub fn arity(&self) -> usize {
        self.args().len()
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Term::Literal(_) | Term::Variable(_) | Term::Wff(_))
    }

    /// True if `t` equals this term or occurs anywhere beneath it.
    pub fn contains(&self, t: &Term) -> bool {
        if self == t {
            return true;
        }
        match self {
            Term::Compound(data) => data.op.contains(t) || data.args.iter().any(|a| a.contains(t)),
            Term::ContextualOperator(data) => data.hole.contains(t) || data.body.contains(t),
            _ => false,
        }
    }

    /// The set of all sub-terms, including `self`. Mirrors pyLemma's
    /// `Sentence.subSentences`, which walks `self[1:]` (arguments only) and
    /// never descends into the operator position — so a `Compound`'s `op`
    /// and a `ContextualOperator`'s `hole` are never themselves reported as
    /// sub-sentences, only what's nested beneath the arguments/body. This
    /// matters beyond cosmetics: `matcher::map_into`'s contextual-operator
    /// case (§4.2 case 6) enumerates candidate hole-fillers by iterating
    /// `target.sub_sentences()`, so including operator literals there would
    /// produce spurious matches against them.
    pub fn sub_sentences(&self) -> Vec<Term> {
        let mut out = Vec::new();
        self.collect_sub_sentences(&mut out);
        out
    }

    fn collect_sub_sentences(&self, out: &mut Vec<Term>) {
        if out.contains(self) {
            return;
        }
        out.push(self.clone());
        match self {
            Term::Compound(data) => {
                for a in &data.args {
                    a.collect_sub_sentences(out);
                }
            }
            Term::ContextualOperator(data) => {
                data.body.collect_sub_sentences(out);
            }
            _ => {}
        }
    }

    /// A copy of this term with every Literal replaced by a Variable of the
    /// same name. Used to promote a verified proof's assumptions into
    /// reusable rule parameters (§4.6).
    pub fn generalize(&self) -> Term {
        match self {
            Term::Literal(name) => Term::Variable(name.clone()),
            Term::Variable(_) | Term::Wff(_) => self.clone(),
            Term::Compound(data) => Term::Compound(Rc::new(CompoundData {
                op: data.op.generalize(),
                args: data.args.iter().map(Term::generalize).collect(),
            })),
            Term::ContextualOperator(data) => Term::ContextualOperator(Rc::new(ContextualData {
                hole: data.hole.generalize(),
                body: data.body.generalize(),
            })),
        }
    }

    /// Fold-with-rebuild: `f` is invoked on every sub-term pre-order and the
    /// tree is rebuilt from the transformed nodes.
    pub fn apply_function<D>(&self, f: &mut impl FnMut(&Term, &mut D) -> Term, data: &mut D) -> Term {
        let replaced = f(self, data);
        match replaced {
            Term::Compound(ref d) => Term::Compound(Rc::new(CompoundData {
                op: d.op.apply_function(f, data),
                args: d.args.iter().map(|a| a.apply_function(f, data)).collect(),
            })),
            Term::ContextualOperator(ref d) => Term::ContextualOperator(Rc::new(ContextualData {
                hole: d.hole.apply_function(f, data),
                body: d.body.apply_function(f, data),
            })),
            other => other,
        }
    }

    /// `a <= b` iff some substitution maps `a` onto `b` (subsumption, §4.1).
    pub fn le(&self, other: &Term) -> bool {
        !crate::nd::matcher::map_into(self, other, true).is_empty()
    }

    /// Strict subsumption: `a <= b` and `b` does not subsume `a`.
    pub fn lt(&self, other: &Term) -> bool {
        self.le(other) && crate::nd::matcher::map_into(other, self, true).is_empty()
    }
}

/// pyLemma's `Sentence` carries a full `__lt__`/`__le__`/`__gt__`/`__ge__`
/// family on top of `mapInto`-based subsumption (SPEC_FULL.md §3); `Term::le`
/// and `Term::lt` are the two spec.md calls out directly, and this impl
/// completes the ordering from them rather than duplicating matcher calls.
impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Term) -> Option<std::cmp::Ordering> {
        if self == other {
            Some(std::cmp::Ordering::Equal)
        } else if self.lt(other) {
            Some(std::cmp::Ordering::Less)
        } else if other.lt(self) {
            Some(std::cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

impl fmt::Display for Term {
    /// Minimal prefix-form printer, used for debugging and error messages.
    /// Real output formatting (infix/English/LaTeX/compressed) is an
    /// external collaborator per spec §1/§6.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Literal(name) => write!(f, "{name}"),
            Term::Variable(name) => write!(f, "?{name}"),
            Term::Wff(name) => write!(f, "@{name}"),
            Term::Compound(data) => {
                write!(f, "{}(", data.op)?;
                for (i, a) in data.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Term::ContextualOperator(data) => write!(f, "{}[{}]", data.hole, data.body),
        }
    }
}

/// Interning factory for terms (§4.1: "Construction goes through a factory
/// that memoises by (kind, op, args) so that structural equality reduces to
/// identity"). `Term`'s `PartialEq`/`Hash` are already fully structural, so
/// the factory is an optimization (shared `Rc` nodes, cheap clones) rather
/// than a correctness requirement; see §5 of spec.md on protecting the cache
/// if used from multiple threads.
#[derive(Default)]
pub struct TermFactory {
    literals: RefCell<HashMap<Rc<str>, Term>>,
    variables: RefCell<HashMap<Rc<str>, Term>>,
    wffs: RefCell<HashMap<Rc<str>, Term>>,
    compounds: RefCell<HashMap<(Term, Vec<Term>), Term>>,
    contextual: RefCell<HashMap<(Term, Term), Term>>,
}

impl TermFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(&self, name: &str) -> Term {
        Self::intern_atom(&self.literals, name, Term::Literal)
    }

    pub fn variable(&self, name: &str) -> Term {
        Self::intern_atom(&self.variables, name, Term::Variable)
    }

    pub fn wff(&self, name: &str) -> Term {
        Self::intern_atom(&self.wffs, name, Term::Wff)
    }

    fn intern_atom(
        cache: &RefCell<HashMap<Rc<str>, Term>>,
        name: &str,
        ctor: impl Fn(Rc<str>) -> Term,
    ) -> Term {
        if let Some(t) = cache.borrow().get(name) {
            return t.clone();
        }
        let rc: Rc<str> = Rc::from(name);
        let t = ctor(rc.clone());
        cache.borrow_mut().insert(rc, t.clone());
        t
    }

    pub fn compound(&self, op: Term, args: Vec<Term>) -> Term {
        let key = (op.clone(), args.clone());
        if let Some(t) = self.compounds.borrow().get(&key) {
            return t.clone();
        }
        let t = Term::Compound(Rc::new(CompoundData { op, args }));
        self.compounds.borrow_mut().insert(key, t.clone());
        t
    }

    pub fn contextual_operator(&self, hole: Term, body: Term) -> Term {
        let key = (hole.clone(), body.clone());
        if let Some(t) = self.contextual.borrow().get(&key) {
            return t.clone();
        }
        let t = Term::ContextualOperator(Rc::new(ContextualData { hole, body }));
        self.contextual.borrow_mut().insert(key, t.clone());
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fac() -> TermFactory {
        TermFactory::new()
    }

    #[test]
    fn literal_equal_by_name() {
        let f = fac();
        assert_eq!(f.literal("a"), f.literal("a"));
        assert_ne!(f.literal("a"), f.literal("b"));
    }

    #[test]
    fn compound_arity_and_op() {
        let f = fac();
        let and = f.literal("and");
        let a = f.literal("a");
        let b = f.literal("b");
        let sen = f.compound(and.clone(), vec![a.clone(), b.clone()]);
        assert_eq!(sen.arity(), 2);
        assert_eq!(sen.op(), and);
        assert_eq!(sen.args(), &[a, b]);
    }

    #[test]
    fn contains_checks_subterms() {
        let f = fac();
        let and = f.literal("and");
        let a = f.literal("a");
        let b = f.literal("b");
        let sen = f.compound(and, vec![a.clone(), b]);
        assert!(sen.contains(&a));
        assert!(!sen.contains(&f.literal("c")));
    }

    #[test]
    fn generalize_replaces_literals_only() {
        let f = fac();
        let and = f.literal("and");
        let a = f.literal("a");
        let x = f.variable("x");
        let sen = f.compound(and.clone(), vec![a, x.clone()]);
        let gen = sen.generalize();
        assert_eq!(gen.op(), f.variable("and"));
        assert_eq!(gen.args()[0], f.variable("a"));
        assert_eq!(gen.args()[1], x);
    }

    #[test]
    fn generalize_is_idempotent() {
        let f = fac();
        let sen = f.compound(f.literal("p"), vec![f.literal("a")]);
        assert_eq!(sen.generalize().generalize(), sen.generalize());
    }

    #[test]
    fn term_round_trips_through_json() {
        let f = fac();
        let sen = f.compound(f.literal("if"), vec![f.wff("P"), f.variable("x")]);
        let json = serde_json::to_string(&sen).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(sen, back);
    }

    #[test]
    fn sub_sentences_includes_self_and_children() {
        let f = fac();
        let a = f.literal("a");
        let b = f.literal("b");
        let sen = f.compound(f.literal("and"), vec![a.clone(), b.clone()]);
        let subs = sen.sub_sentences();
        assert!(subs.contains(&sen));
        assert!(subs.contains(&a));
        assert!(subs.contains(&b));
    }

    #[test]
    fn sub_sentences_never_descends_into_the_operator_position() {
        let f = fac();
        let and = f.literal("and");
        let a = f.literal("a");
        let sen = f.compound(and.clone(), vec![a]);
        let subs = sen.sub_sentences();
        assert!(!subs.contains(&and));

        let hole = f.variable("x");
        let body = f.literal("body");
        let ctxop = f.contextual_operator(hole.clone(), body.clone());
        let ctxop_subs = ctxop.sub_sentences();
        assert!(!ctxop_subs.contains(&hole));
        assert!(ctxop_subs.contains(&body));
    }

    #[test]
    fn partial_ord_places_a_wff_below_any_literal_it_subsumes() {
        // Wff <= anything (§4.1), so in this "more general is smaller"
        // ordering a Wff sits below the concrete literal it matches.
        let f = fac();
        let p = f.wff("P");
        let a = f.literal("a");
        assert!(p < a);
        assert!(a > p);
        assert_eq!(p.partial_cmp(&p), Some(std::cmp::Ordering::Equal));
    }

    #[test]
    fn partial_ord_is_none_for_incomparable_literals() {
        let f = fac();
        assert_eq!(f.literal("a").partial_cmp(&f.literal("b")), None);
    }
}
