//! Precomputed decision tables over the compiled graph.
//!
//!     A fixpoint pass derives, for every state, the set of terminals
//!     reachable without consuming input (FIRST), whether the state can reach
//!     its rule's stop without consuming (nullable), and whether a predicate
//!     gate is reachable before the next terminal. A second fixpoint derives
//!     per-rule FOLLOW sets from call sites; EOF is added to every rule's
//!     FOLLOW since any rule may serve as a parse entry point.
//!
//!     The decision table keeps only the unambiguous entries: a lookahead
//!     token maps to a branch when exactly one branch of a predicate-free
//!     decision can start with it. Everything else falls through to the
//!     bounded simulation at parse time.

use super::graph::{DecisionGraph, TransitionLabel};
use super::symbols::DecisionId;
use crate::token::TokenType;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug)]
pub(crate) struct DecisionTables {
    /// FIRST set per state.
    pub state_first: Vec<BTreeSet<TokenType>>,
    /// Can this state reach its rule's stop without consuming a token?
    pub state_nullable: Vec<bool>,
    /// FOLLOW set per rule (always contains EOF).
    pub rule_follow: Vec<BTreeSet<TokenType>>,
    /// Unambiguous fast-path entries.
    pub unique: HashMap<(DecisionId, TokenType), u16>,
    /// Per decision: sorted union of the branches' viable-start sets, for
    /// expected-set diagnostics.
    pub expected: Vec<Vec<TokenType>>,
    /// Per decision: a predicate gate participates in some branch.
    pub predicated: Vec<bool>,
}

impl DecisionTables {
    pub fn lookup(&self, decision: DecisionId, token: TokenType) -> Option<u16> {
        self.unique.get(&(decision, token)).copied()
    }

    pub fn expected_at(&self, decision: DecisionId) -> &[TokenType] {
        &self.expected[decision.0 as usize]
    }
}

pub(crate) fn compute(graph: &DecisionGraph) -> DecisionTables {
    let n = graph.states.len();
    let rules = graph.rule_entries.len();

    let mut first: Vec<BTreeSet<TokenType>> = vec![BTreeSet::new(); n];
    let mut nullable = vec![false; n];
    let mut predicated = vec![false; n];

    // Joint fixpoint for FIRST / nullable / predicate-reachability.
    loop {
        let mut changed = false;
        for idx in (0..n).rev() {
            let state = &graph.states[idx];
            let mut f = first[idx].clone();
            let mut nul = nullable[idx];
            let mut pred = predicated[idx];
            if state.is_stop {
                nul = true;
            }
            for t in &state.transitions {
                let target = t.target.0 as usize;
                match t.label {
                    TransitionLabel::Atom(ty) => {
                        f.insert(ty);
                    }
                    TransitionLabel::Epsilon | TransitionLabel::Pred(_) => {
                        f.extend(first[target].iter().copied());
                        nul |= nullable[target];
                        pred |= predicated[target];
                        if matches!(t.label, TransitionLabel::Pred(_)) {
                            pred = true;
                        }
                    }
                    TransitionLabel::Call(callee) => {
                        let entry = graph.rule_entry(callee).0 as usize;
                        f.extend(first[entry].iter().copied());
                        pred |= predicated[entry];
                        if nullable[entry] {
                            f.extend(first[target].iter().copied());
                            nul |= nullable[target];
                            pred |= predicated[target];
                        }
                    }
                }
            }
            if f.len() != first[idx].len() || nul != nullable[idx] || pred != predicated[idx] {
                first[idx] = f;
                nullable[idx] = nul;
                predicated[idx] = pred;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // FOLLOW per rule from call sites; EOF everywhere (any rule can be a
    // start rule).
    let mut follow: Vec<BTreeSet<TokenType>> = vec![BTreeSet::new(); rules];
    for set in follow.iter_mut() {
        set.insert(TokenType::EOF);
    }
    loop {
        let mut changed = false;
        for state in &graph.states {
            for t in &state.transitions {
                if let TransitionLabel::Call(callee) = t.label {
                    let target = t.target.0 as usize;
                    let caller = state.rule.0 as usize;
                    let callee = callee.0 as usize;
                    let before = follow[callee].len();
                    let addition: Vec<TokenType> = first[target].iter().copied().collect();
                    follow[callee].extend(addition);
                    if nullable[target] {
                        let caller_follow: Vec<TokenType> =
                            follow[caller].iter().copied().collect();
                        follow[callee].extend(caller_follow);
                    }
                    if follow[callee].len() != before {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Per-decision tables.
    let mut unique = HashMap::new();
    let mut expected = Vec::with_capacity(graph.decision_count());
    let mut decision_predicated = Vec::with_capacity(graph.decision_count());
    for d in 0..graph.decision_count() {
        let decision = DecisionId(d as u16);
        let state = graph.state(graph.decision_state(decision));
        let rule = state.rule.0 as usize;

        let mut branch_sets: Vec<BTreeSet<TokenType>> = Vec::new();
        let mut any_pred = false;
        for t in &state.transitions {
            let target = t.target.0 as usize;
            let mut set = first[target].clone();
            if nullable[target] {
                set.extend(follow[rule].iter().copied());
            }
            any_pred |= predicated[target];
            branch_sets.push(set);
        }

        let mut union: BTreeSet<TokenType> = BTreeSet::new();
        for set in &branch_sets {
            union.extend(set.iter().copied());
        }
        if !any_pred {
            for ty in &union {
                let holders: Vec<usize> = branch_sets
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.contains(ty))
                    .map(|(i, _)| i)
                    .collect();
                if holders.len() == 1 {
                    unique.insert((decision, *ty), holders[0] as u16);
                }
            }
        }
        expected.push(union.into_iter().collect());
        decision_predicated.push(any_pred);
    }

    DecisionTables {
        state_first: first,
        state_nullable: nullable,
        rule_follow: follow,
        unique,
        expected,
        predicated: decision_predicated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::graph::GraphCompiler;
    use crate::grammar::symbols::{RuleId, Sym};

    const A: TokenType = TokenType(2);
    const B: TokenType = TokenType(3);
    const C: TokenType = TokenType(4);

    #[test]
    fn test_disjoint_alts_get_unique_entries() {
        // r := A | B
        let graph =
            GraphCompiler::compile(&[vec![vec![Sym::Token(A)], vec![Sym::Token(B)]]]);
        let tables = compute(&graph);
        assert_eq!(tables.lookup(DecisionId(0), A), Some(0));
        assert_eq!(tables.lookup(DecisionId(0), B), Some(1));
        assert_eq!(tables.lookup(DecisionId(0), C), None);
    }

    #[test]
    fn test_star_exit_resolves_through_follow() {
        // expr := term (A term)* ; term := B
        let term = RuleId(1);
        let graph = GraphCompiler::compile(&[
            vec![vec![
                Sym::Rule(term),
                Sym::Star(vec![Sym::Token(A), Sym::Rule(term)]),
            ]],
            vec![vec![Sym::Token(B)]],
        ]);
        let tables = compute(&graph);
        // Loop decision: A enters the body, EOF (from FOLLOW) exits.
        assert_eq!(tables.lookup(DecisionId(0), A), Some(0));
        assert_eq!(tables.lookup(DecisionId(0), TokenType::EOF), Some(1));
    }

    #[test]
    fn test_common_prefix_stays_ambiguous() {
        // r := A B | A C
        let graph = GraphCompiler::compile(&[vec![
            vec![Sym::Token(A), Sym::Token(B)],
            vec![Sym::Token(A), Sym::Token(C)],
        ]]);
        let tables = compute(&graph);
        assert_eq!(
            tables.lookup(DecisionId(0), A),
            None,
            "shared first token must fall through to simulation"
        );
        assert_eq!(tables.expected_at(DecisionId(0)), &[A]);
    }

    #[test]
    fn test_predicated_decision_has_no_fast_path() {
        use crate::grammar::symbols::PredicateId;
        // r := {pred}? A | B
        let graph = GraphCompiler::compile(&[vec![
            vec![Sym::Pred(PredicateId(0)), Sym::Token(A)],
            vec![Sym::Token(B)],
        ]]);
        let tables = compute(&graph);
        assert!(tables.predicated[0]);
        assert_eq!(tables.lookup(DecisionId(0), A), None);
        assert_eq!(tables.lookup(DecisionId(0), B), None);
    }

    #[test]
    fn test_nullable_rule_propagates_first_of_continuation() {
        // r := opt A ; opt := B?
        let opt = RuleId(1);
        let graph = GraphCompiler::compile(&[
            vec![vec![Sym::Rule(opt), Sym::Token(A)]],
            vec![vec![Sym::Opt(vec![Sym::Token(B)])]],
        ]);
        let tables = compute(&graph);
        let entry = graph.rule_entry(RuleId(0)).0 as usize;
        assert!(tables.state_first[entry].contains(&A));
        assert!(tables.state_first[entry].contains(&B));
    }
}
