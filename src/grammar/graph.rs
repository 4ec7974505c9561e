//! Compilation of rule alternatives into a static decision graph.
//!
//!     Each rule compiles to a small state machine: epsilon edges for
//!     structure, atom edges that consume one terminal, call edges that
//!     invoke another rule, and predicate edges that gate a path. A state
//!     with more than one outgoing edge is a decision point; by construction
//!     decision states carry only epsilon edges, and every other state has
//!     exactly one edge (or is the rule's stop state).
//!
//!     Branch order is declaration order. Star loops emit the enter-body
//!     branch before the exit branch, which makes repetition greedy when the
//!     lookahead cannot separate the two.

use super::symbols::{DecisionId, PredicateId, RuleId, Sym};
use crate::token::TokenType;

/// Index of a state in the compiled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct StateId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionLabel {
    Epsilon,
    /// Consume one terminal of this type.
    Atom(TokenType),
    /// Invoke a rule; the target is the return state.
    Call(RuleId),
    /// Viable only if the predicate evaluates true.
    Pred(PredicateId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Transition {
    pub label: TransitionLabel,
    pub target: StateId,
}

#[derive(Debug)]
pub(crate) struct State {
    /// Rule this state belongs to.
    pub rule: RuleId,
    /// Outgoing edges, in declaration order.
    pub transitions: Vec<Transition>,
    /// Set when this state is a decision point.
    pub decision: Option<DecisionId>,
    /// Stop state of its rule: reaching it returns to the caller.
    pub is_stop: bool,
}

#[derive(Debug)]
pub(crate) struct DecisionGraph {
    pub states: Vec<State>,
    pub rule_entries: Vec<StateId>,
    pub rule_stops: Vec<StateId>,
    /// Decision id -> state holding the branches.
    pub decisions: Vec<StateId>,
}

impl DecisionGraph {
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.0 as usize]
    }

    pub fn rule_entry(&self, rule: RuleId) -> StateId {
        self.rule_entries[rule.0 as usize]
    }

    pub fn rule_stop(&self, rule: RuleId) -> StateId {
        self.rule_stops[rule.0 as usize]
    }

    pub fn decision_state(&self, decision: DecisionId) -> StateId {
        self.decisions[decision.0 as usize]
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }
}

pub(crate) struct GraphCompiler {
    states: Vec<State>,
    rule_entries: Vec<StateId>,
    rule_stops: Vec<StateId>,
    decisions: Vec<StateId>,
}

impl GraphCompiler {
    pub fn compile(rule_alts: &[Vec<Vec<Sym>>]) -> DecisionGraph {
        let mut c = GraphCompiler {
            states: Vec::new(),
            rule_entries: Vec::new(),
            rule_stops: Vec::new(),
            decisions: Vec::new(),
        };
        // Entry and stop states first, so call edges can reference any rule.
        for rule_idx in 0..rule_alts.len() {
            let rule = RuleId(rule_idx as u16);
            let entry = c.new_state(rule);
            let stop = c.new_state(rule);
            c.states[stop.0 as usize].is_stop = true;
            c.rule_entries.push(entry);
            c.rule_stops.push(stop);
        }
        for (rule_idx, alts) in rule_alts.iter().enumerate() {
            let rule = RuleId(rule_idx as u16);
            let entry = c.rule_entries[rule_idx];
            let stop = c.rule_stops[rule_idx];
            if alts.len() == 1 {
                let end = c.compile_seq(rule, entry, &alts[0]);
                c.add(end, TransitionLabel::Epsilon, stop);
            } else {
                c.mark_decision(entry);
                for alt in alts {
                    let start = c.new_state(rule);
                    c.add(entry, TransitionLabel::Epsilon, start);
                    let end = c.compile_seq(rule, start, alt);
                    c.add(end, TransitionLabel::Epsilon, stop);
                }
            }
        }
        DecisionGraph {
            states: c.states,
            rule_entries: c.rule_entries,
            rule_stops: c.rule_stops,
            decisions: c.decisions,
        }
    }

    fn new_state(&mut self, rule: RuleId) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(State {
            rule,
            transitions: Vec::new(),
            decision: None,
            is_stop: false,
        });
        id
    }

    fn add(&mut self, from: StateId, label: TransitionLabel, target: StateId) {
        self.states[from.0 as usize]
            .transitions
            .push(Transition { label, target });
    }

    fn mark_decision(&mut self, state: StateId) {
        let id = DecisionId(self.decisions.len() as u16);
        self.states[state.0 as usize].decision = Some(id);
        self.decisions.push(state);
    }

    fn compile_seq(&mut self, rule: RuleId, from: StateId, syms: &[Sym]) -> StateId {
        let mut cur = from;
        for sym in syms {
            cur = self.compile_sym(rule, cur, sym);
        }
        cur
    }

    fn compile_sym(&mut self, rule: RuleId, from: StateId, sym: &Sym) -> StateId {
        match sym {
            Sym::Token(ty) => {
                let next = self.new_state(rule);
                self.add(from, TransitionLabel::Atom(*ty), next);
                next
            }
            Sym::Rule(callee) => {
                let next = self.new_state(rule);
                self.add(from, TransitionLabel::Call(*callee), next);
                next
            }
            Sym::Pred(pred) => {
                let next = self.new_state(rule);
                self.add(from, TransitionLabel::Pred(*pred), next);
                next
            }
            Sym::Choice(branches) => {
                if branches.len() == 1 {
                    return self.compile_seq(rule, from, &branches[0]);
                }
                let dec = self.new_state(rule);
                self.add(from, TransitionLabel::Epsilon, dec);
                self.mark_decision(dec);
                let end = self.new_state(rule);
                for branch in branches {
                    let start = self.new_state(rule);
                    self.add(dec, TransitionLabel::Epsilon, start);
                    let branch_end = self.compile_seq(rule, start, branch);
                    self.add(branch_end, TransitionLabel::Epsilon, end);
                }
                end
            }
            Sym::Star(body) => {
                let dec = self.new_state(rule);
                self.add(from, TransitionLabel::Epsilon, dec);
                self.mark_decision(dec);
                let end = self.new_state(rule);
                // Enter branch first: repetition is greedy on ties.
                let body_start = self.new_state(rule);
                self.add(dec, TransitionLabel::Epsilon, body_start);
                let body_end = self.compile_seq(rule, body_start, body);
                self.add(body_end, TransitionLabel::Epsilon, dec);
                self.add(dec, TransitionLabel::Epsilon, end);
                end
            }
            Sym::Opt(body) => {
                let dec = self.new_state(rule);
                self.add(from, TransitionLabel::Epsilon, dec);
                self.mark_decision(dec);
                let end = self.new_state(rule);
                let body_start = self.new_state(rule);
                self.add(dec, TransitionLabel::Epsilon, body_start);
                let body_end = self.compile_seq(rule, body_start, body);
                self.add(body_end, TransitionLabel::Epsilon, end);
                self.add(dec, TransitionLabel::Epsilon, end);
                end
            }
        }
    }
}
