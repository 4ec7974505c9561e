//! Bounded lookahead simulation for decisions the static table cannot
//! resolve.
//!
//!     Simulation speculatively walks candidate branches over buffered
//!     lookahead without consuming input or building tree nodes. A
//!     configuration is a graph position, the branch it argues for, and a
//!     snapshot of the parser's return stack, so a candidate can run through
//!     rule calls and returns exactly as the committed parse would.
//!
//!     Each round closes configurations over epsilon, call and predicate
//!     edges, then advances the survivors over the next lookahead token.
//!     Configurations that complete the outermost stacked rule survive only
//!     the EOF token. The walk ends when one branch remains, when all die,
//!     or when a budget runs out, in which case the first-declared surviving
//!     branch wins and the outcome is flagged ambiguous.

use crate::diagnostics::EngineError;
use crate::grammar::graph::{StateId, TransitionLabel};
use crate::grammar::{DecisionId, Grammar};
use crate::parsing::predicates::PredicateEvaluator;
use crate::parsing::stream::TokenStream;
use crate::token::TokenType;
use std::collections::{HashMap, HashSet};

/// One speculative thread of the walk. `state == None` means the
/// configuration has returned out of every stacked rule.
#[derive(Clone, PartialEq, Eq, Hash)]
struct SimConfig {
    state: Option<StateId>,
    branch: u16,
    stack: Vec<StateId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SimOutcome {
    Chosen {
        branch: u16,
        /// Lookahead tokens inspected before committing.
        lookahead_used: usize,
        /// A predicate gate influenced the outcome; such results are never
        /// cached.
        used_predicate: bool,
        /// A budget expired with more than one viable branch.
        ambiguous: bool,
    },
    NoViable,
}

pub(crate) fn simulate(
    grammar: &Grammar,
    decision: DecisionId,
    return_stack: &[StateId],
    stream: &mut TokenStream<'_>,
    predicates: &mut PredicateEvaluator,
    max_lookahead: usize,
    max_sim_steps: usize,
) -> Result<SimOutcome, EngineError> {
    let graph = grammar.graph();
    let decision_state = graph.state(graph.decision_state(decision));

    let mut configs: Vec<SimConfig> = decision_state
        .transitions
        .iter()
        .enumerate()
        .map(|(branch, t)| SimConfig {
            state: Some(t.target),
            branch: branch as u16,
            stack: return_stack.to_vec(),
        })
        .collect();

    let base_cursor = stream.index();
    let mut depth = 0usize;
    let mut steps = 0usize;
    let mut used_predicate = false;

    loop {
        // Closure: rest every configuration at a terminal edge or at
        // completion.
        let mut resting: Vec<SimConfig> = Vec::new();
        let mut seen: HashSet<SimConfig> = HashSet::new();
        let mut work = std::mem::take(&mut configs);
        while let Some(config) = work.pop() {
            if !seen.insert(config.clone()) {
                continue;
            }
            steps += 1;
            if steps > max_sim_steps {
                // The budget bounds every expansion, including closure
                // rounds that would otherwise grow without consuming input.
                // Commit to the first-declared branch still alive.
                let mut branches: Vec<u16> = vec![config.branch];
                branches.extend(resting.iter().map(|c| c.branch));
                branches.extend(work.iter().map(|c| c.branch));
                branches.sort_unstable();
                branches.dedup();
                return Ok(SimOutcome::Chosen {
                    branch: branches[0],
                    lookahead_used: depth,
                    used_predicate,
                    ambiguous: branches.len() > 1,
                });
            }
            let state_id = match config.state {
                Some(id) => id,
                None => {
                    resting.push(config);
                    continue;
                }
            };
            let state = graph.state(state_id);
            if state.is_stop {
                let mut next = config.clone();
                match next.stack.pop() {
                    Some(ret) => next.state = Some(ret),
                    None => next.state = None,
                }
                work.push(next);
                continue;
            }
            for t in &state.transitions {
                match t.label {
                    TransitionLabel::Atom(_) => {
                        resting.push(config.clone());
                    }
                    TransitionLabel::Epsilon => {
                        let mut next = config.clone();
                        next.state = Some(t.target);
                        work.push(next);
                    }
                    TransitionLabel::Call(callee) => {
                        let mut next = config.clone();
                        next.stack.push(t.target);
                        next.state = Some(graph.rule_entry(callee));
                        work.push(next);
                    }
                    TransitionLabel::Pred(pred) => {
                        used_predicate = true;
                        if predicates.eval(grammar, pred, stream, base_cursor + depth)? {
                            let mut next = config.clone();
                            next.state = Some(t.target);
                            work.push(next);
                        }
                    }
                }
            }
        }
        configs = resting;
        configs.dedup();

        if configs.is_empty() {
            return Ok(SimOutcome::NoViable);
        }
        let mut branches: Vec<u16> = configs.iter().map(|c| c.branch).collect();
        branches.sort_unstable();
        branches.dedup();
        if branches.len() == 1 {
            return Ok(SimOutcome::Chosen {
                branch: branches[0],
                lookahead_used: depth,
                used_predicate,
                ambiguous: false,
            });
        }
        if depth >= max_lookahead || steps >= max_sim_steps {
            return Ok(SimOutcome::Chosen {
                branch: branches[0],
                lookahead_used: depth,
                used_predicate,
                ambiguous: true,
            });
        }

        // Advance over the next lookahead token.
        let ty = stream.la(depth + 1)?;
        depth += 1;
        let mut moved = Vec::new();
        for config in configs.drain(..) {
            match config.state {
                None => {
                    // Fully returned: only the real end of input keeps this
                    // candidate alive.
                    if ty == TokenType::EOF {
                        moved.push(config);
                    }
                }
                Some(state_id) => {
                    for t in &graph.state(state_id).transitions {
                        if let TransitionLabel::Atom(atom) = t.label {
                            if atom == ty {
                                let mut next = config.clone();
                                next.state = Some(t.target);
                                moved.push(next);
                            }
                        }
                    }
                }
            }
        }
        configs = moved;
        if configs.is_empty() {
            return Ok(SimOutcome::NoViable);
        }
    }
}

/// Per-parse memo of simulation verdicts, keyed by the decision point and
/// the exact lookahead token types the simulation inspected. Entries are
/// recorded only for predicate-free outcomes.
pub(crate) struct DecisionCache {
    entries: HashMap<DecisionId, Vec<(Vec<TokenType>, u16)>>,
}

impl DecisionCache {
    pub fn new() -> Self {
        DecisionCache {
            entries: HashMap::new(),
        }
    }

    pub fn lookup(
        &self,
        decision: DecisionId,
        stream: &mut TokenStream<'_>,
    ) -> Result<Option<u16>, EngineError> {
        let Some(candidates) = self.entries.get(&decision) else {
            return Ok(None);
        };
        'candidate: for (signature, branch) in candidates {
            for (k, expected) in signature.iter().enumerate() {
                if stream.la(k + 1)? != *expected {
                    continue 'candidate;
                }
            }
            return Ok(Some(*branch));
        }
        Ok(None)
    }

    pub fn record(
        &mut self,
        decision: DecisionId,
        stream: &mut TokenStream<'_>,
        lookahead_used: usize,
        branch: u16,
    ) -> Result<(), EngineError> {
        let mut signature = Vec::with_capacity(lookahead_used);
        for k in 1..=lookahead_used {
            signature.push(stream.la(k)?);
        }
        self.entries
            .entry(decision)
            .or_default()
            .push((signature, branch));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Sym, DEFAULT_MODE};
    use crate::lexing::LexerEngine;
    use crate::parsing::predicates::PredicateContext;

    fn run(
        grammar: &Grammar,
        source: &str,
        decision: DecisionId,
        max_lookahead: usize,
    ) -> SimOutcome {
        let mut stream = TokenStream::new(LexerEngine::new(grammar, source));
        let mut predicates = PredicateEvaluator::new(max_lookahead + 1);
        simulate(
            grammar,
            decision,
            &[],
            &mut stream,
            &mut predicates,
            max_lookahead,
            10_000,
        )
        .expect("no lexical fatal expected")
    }

    fn prefix_grammar() -> Grammar {
        // r := A B | A C
        let mut g = GrammarBuilder::new("Prefix");
        let a = g.token("A");
        let b = g.token("B");
        let c = g.token("C");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        g.lex_rule(DEFAULT_MODE, "C", c, "c").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a), Sym::Token(b)]);
        g.alt(r, vec![Sym::Token(a), Sym::Token(c)]);
        g.build().unwrap()
    }

    #[test]
    fn test_common_prefix_resolved_by_second_token() {
        let g = prefix_grammar();
        let outcome = run(&g, "ac", DecisionId(0), 8);
        assert_eq!(
            outcome,
            SimOutcome::Chosen {
                branch: 1,
                lookahead_used: 2,
                used_predicate: false,
                ambiguous: false,
            }
        );
    }

    #[test]
    fn test_no_viable_branch_reported() {
        let g = prefix_grammar();
        let outcome = run(&g, "c", DecisionId(0), 8);
        assert_eq!(outcome, SimOutcome::NoViable);
    }

    #[test]
    fn test_budget_exhaustion_picks_first_declared_and_flags_ambiguity() {
        let g = prefix_grammar();
        // One lookahead token cannot separate the branches.
        let outcome = run(&g, "ab", DecisionId(0), 1);
        match outcome {
            SimOutcome::Chosen {
                branch, ambiguous, ..
            } => {
                assert_eq!(branch, 0, "first-declared branch wins under budget");
                assert!(ambiguous);
            }
            other => panic!("expected a chosen branch, got {:?}", other),
        }
    }

    #[test]
    fn test_false_predicate_eliminates_gated_branch() {
        fn never(_: &PredicateContext<'_>) -> bool {
            false
        }
        // r := {never}? A B | A C : the gate kills branch 0 during the first
        // closure, so the decision commits to branch 1 without consuming
        // any lookahead. The predicate taint is reported so the verdict is
        // never cached.
        let mut g = GrammarBuilder::new("Gated");
        let a = g.token("A");
        let b = g.token("B");
        let c = g.token("C");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        g.lex_rule(DEFAULT_MODE, "C", c, "c").unwrap();
        let pred = g.predicate("never", never);
        let r = g.rule("r");
        g.alt(r, vec![Sym::Pred(pred), Sym::Token(a), Sym::Token(b)]);
        g.alt(r, vec![Sym::Token(a), Sym::Token(c)]);
        let g = g.build().unwrap();

        let outcome = run(&g, "ab", DecisionId(0), 8);
        assert_eq!(
            outcome,
            SimOutcome::Chosen {
                branch: 1,
                lookahead_used: 0,
                used_predicate: true,
                ambiguous: false,
            }
        );

        // The committed parse of "ab" then walks branch 1 and repairs the
        // mismatched second token through normal recovery.
        let outcome = crate::parsing::parser::Parser::new(&g)
            .parse("ab", r)
            .unwrap();
        assert!(
            !outcome.diagnostics.is_empty(),
            "the mismatch surfaces as a recovered diagnostic"
        );

        // With "ac" the ungated branch parses through cleanly.
        let outcome = run(&g, "ac", DecisionId(0), 8);
        assert_eq!(
            outcome,
            SimOutcome::Chosen {
                branch: 1,
                lookahead_used: 0,
                used_predicate: true,
                ambiguous: false,
            }
        );
    }

    #[test]
    fn test_step_budget_bounds_closure_expansion() {
        // With a one-step budget the walk must bail out mid-closure and
        // commit to the first-declared live branch instead of expanding on.
        let g = prefix_grammar();
        let mut stream = TokenStream::new(LexerEngine::new(&g, "ac"));
        let mut predicates = PredicateEvaluator::new(8);
        let outcome = simulate(&g, DecisionId(0), &[], &mut stream, &mut predicates, 8, 1)
            .expect("no lexical fatal expected");
        match outcome {
            SimOutcome::Chosen {
                branch, ambiguous, ..
            } => {
                assert_eq!(branch, 0, "first-declared branch wins under budget");
                assert!(ambiguous);
            }
            other => panic!("expected a chosen branch, got {:?}", other),
        }
    }

    #[test]
    fn test_completed_configuration_survives_only_eof() {
        // r := A | A B : with input "a", branch 0 completes and only EOF
        // keeps it alive, so the decision resolves to branch 0.
        let mut g = GrammarBuilder::new("Tail");
        let a = g.token("A");
        let b = g.token("B");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a)]);
        g.alt(r, vec![Sym::Token(a), Sym::Token(b)]);
        let g = g.build().unwrap();

        let outcome = run(&g, "a", DecisionId(0), 8);
        match outcome {
            SimOutcome::Chosen {
                branch, ambiguous, ..
            } => {
                assert_eq!(branch, 0);
                assert!(!ambiguous);
            }
            other => panic!("expected a chosen branch, got {:?}", other),
        }
        // With "ab" the longer branch is the survivor.
        let outcome = run(&g, "ab", DecisionId(0), 8);
        assert!(matches!(outcome, SimOutcome::Chosen { branch: 1, .. }));
    }

    #[test]
    fn test_cache_round_trip() {
        let g = prefix_grammar();
        let mut stream = TokenStream::new(LexerEngine::new(&g, "ac"));
        let mut cache = DecisionCache::new();
        assert_eq!(cache.lookup(DecisionId(0), &mut stream).unwrap(), None);
        cache.record(DecisionId(0), &mut stream, 2, 1).unwrap();
        assert_eq!(cache.lookup(DecisionId(0), &mut stream).unwrap(), Some(1));
        // A different lookahead shape misses.
        let mut other = TokenStream::new(LexerEngine::new(&g, "ab"));
        assert_eq!(cache.lookup(DecisionId(0), &mut other).unwrap(), None);
    }
}
