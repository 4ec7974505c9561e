//! The committed predictive parser.
//!
//!     One parse is one iterative walk over the decision graph with an
//!     explicit return stack; recursion depth never tracks grammar nesting.
//!     At each decision point the parser tries, in order: the static
//!     decision table on one token of lookahead, the per-parse cache of
//!     earlier simulation verdicts, and finally the bounded simulation
//!     itself. Predicate-tainted verdicts are never cached.
//!
//!     Recovery keeps the walk going: a mismatched terminal is repaired by
//!     deleting the offender (when the token after it matches) or by
//!     inserting the expected token as an error leaf; a dead decision point
//!     resynchronizes to a token that can continue some stacked rule. Every
//!     repair appends exactly one diagnostic.

use crate::diagnostics::{Diagnostic, DiagnosticKind, EngineError};
use crate::grammar::graph::{StateId, TransitionLabel};
use crate::grammar::{DecisionId, Grammar, RuleId};
use crate::lexing::LexerEngine;
use crate::parsing::predicates::PredicateEvaluator;
use crate::parsing::recovery::{recovery_set, resync, ProgressTracker};
use crate::parsing::simulation::{simulate, DecisionCache, SimOutcome};
use crate::parsing::stream::TokenStream;
use crate::token::TokenType;
use crate::tree::{ParseTree, TreeBuilder};

/// Tunables for decision resolution. The defaults suit ordinary grammars;
/// lookahead-hungry ones can raise the budgets.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Lookahead tokens a simulation may inspect before it must commit.
    pub max_lookahead: usize,
    /// Configuration expansions a simulation may perform before it must
    /// commit.
    pub max_sim_steps: usize,
    /// Emit an [`DiagnosticKind::Ambiguity`] diagnostic when a budget forces
    /// a first-declared commit.
    pub report_ambiguities: bool,
    /// Reuse simulation verdicts for repeated (decision, lookahead) shapes
    /// within one parse.
    pub enable_decision_cache: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_lookahead: 8,
            max_sim_steps: 10_000,
            report_ambiguities: false,
            enable_decision_cache: true,
        }
    }
}

/// Result of a parse: a tree is always produced, and every recovered error
/// is listed in source order.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: ParseTree,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Predictive parser over one grammar. Cheap to construct; all heavy tables
/// live in the [`Grammar`].
pub struct Parser<'g> {
    grammar: &'g Grammar,
    config: ParserConfig,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Parser {
            grammar,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse `source` starting at `start`. Recoverable errors land in the
    /// outcome's diagnostics; only internal-consistency violations abort.
    pub fn parse(&self, source: &str, start: RuleId) -> Result<ParseOutcome, EngineError> {
        let stream = TokenStream::new(LexerEngine::new(self.grammar, source));
        ParseRun::new(self.grammar, &self.config, stream).run(start)
    }
}

/// Mutable state of one parse.
struct ParseRun<'g> {
    grammar: &'g Grammar,
    config: &'g ParserConfig,
    stream: TokenStream<'g>,
    predicates: PredicateEvaluator,
    cache: DecisionCache,
    progress: ProgressTracker,
    builder: TreeBuilder,
    diagnostics: Vec<Diagnostic>,
    return_stack: Vec<StateId>,
}

/// What the decision layer told the committed walk to do.
enum Resolution {
    Branch(u16),
    NoViable,
}

impl<'g> ParseRun<'g> {
    fn new(grammar: &'g Grammar, config: &'g ParserConfig, stream: TokenStream<'g>) -> Self {
        ParseRun {
            grammar,
            config,
            stream,
            predicates: PredicateEvaluator::new(config.max_lookahead + 1),
            cache: DecisionCache::new(),
            progress: ProgressTracker::new(),
            builder: TreeBuilder::new(),
            diagnostics: Vec::new(),
            return_stack: Vec::new(),
        }
    }

    fn run(mut self, start: RuleId) -> Result<ParseOutcome, EngineError> {
        let graph = self.grammar.graph();
        let start_offset = self.stream.lt(1)?.start;
        self.builder.open_rule(start, start_offset);
        let mut state = graph.rule_entry(start);

        loop {
            let st = graph.state(state);
            if st.is_stop {
                match self.return_stack.pop() {
                    Some(ret) => {
                        self.builder.close_rule();
                        state = ret;
                    }
                    // Start rule finished; the root stays open for trailing
                    // input handling.
                    None => break,
                }
                continue;
            }
            if let Some(decision) = st.decision {
                match self.resolve(decision)? {
                    Resolution::Branch(branch) => {
                        state = st.transitions[branch as usize].target;
                    }
                    Resolution::NoViable => {
                        state = self.recover_no_viable(state, decision)?;
                    }
                }
                continue;
            }
            let t = st.transitions[0];
            match t.label {
                TransitionLabel::Epsilon => state = t.target,
                TransitionLabel::Atom(expected) => {
                    self.match_terminal(expected, st.rule)?;
                    state = t.target;
                }
                TransitionLabel::Call(callee) => {
                    self.return_stack.push(t.target);
                    let at = self.stream.lt(1)?.start;
                    self.builder.open_rule(callee, at);
                    state = graph.rule_entry(callee);
                }
                TransitionLabel::Pred(pred) => {
                    let cursor = self.stream.index();
                    if self
                        .predicates
                        .eval(self.grammar, pred, &mut self.stream, cursor)?
                    {
                        state = t.target;
                    } else {
                        let offender = self.stream.lt(1)?.clone();
                        self.diagnostics.push(Diagnostic::at_token(
                            DiagnosticKind::FailedPredicate,
                            &offender,
                            Some(self.grammar.rule_name(st.rule).to_string()),
                            Vec::new(),
                            format!(
                                "predicate '{}' failed",
                                self.grammar.predicate_name(pred)
                            ),
                        ));
                        state = self.abandon_rule(st.rule);
                    }
                }
            }
        }

        // Trailing input after the start rule: one diagnostic, every extra
        // token kept as an error leaf under the root.
        if !self.stream.lt(1)?.is_eof() {
            let offender = self.stream.lt(1)?.clone();
            self.diagnostics.push(Diagnostic::at_token(
                DiagnosticKind::UnexpectedToken,
                &offender,
                Some(self.grammar.rule_name(start).to_string()),
                vec!["EOF".to_string()],
                format!("extraneous input {:?} after a complete parse", offender.text),
            ));
            while !self.stream.lt(1)?.is_eof() {
                let global = self.stream.consume()?;
                let token = self.stream.get(global).cloned().expect("consumed token");
                self.builder.add_error_token(global, &token);
            }
        }
        self.builder.close_rule();

        self.stream.fill_to_eof()?;
        let mut diagnostics = self.stream.take_lexer_diagnostics();
        diagnostics.append(&mut self.diagnostics);
        diagnostics.sort_by_key(|d| d.offset);

        let tree = self.builder.finish(self.stream.into_tokens());
        Ok(ParseOutcome { tree, diagnostics })
    }

    /// Table first, then cache, then bounded simulation.
    fn resolve(&mut self, decision: DecisionId) -> Result<Resolution, EngineError> {
        let tables = self.grammar.tables();
        let la = self.stream.la(1)?;
        if let Some(branch) = tables.lookup(decision, la) {
            return Ok(Resolution::Branch(branch));
        }
        let cacheable = self.config.enable_decision_cache && !tables.predicated[decision.0 as usize];
        if cacheable {
            if let Some(branch) = self.cache.lookup(decision, &mut self.stream)? {
                return Ok(Resolution::Branch(branch));
            }
        }
        let outcome = simulate(
            self.grammar,
            decision,
            &self.return_stack,
            &mut self.stream,
            &mut self.predicates,
            self.config.max_lookahead,
            self.config.max_sim_steps,
        )?;
        match outcome {
            SimOutcome::Chosen {
                branch,
                lookahead_used,
                used_predicate,
                ambiguous,
            } => {
                if ambiguous && self.config.report_ambiguities {
                    let at = self.stream.lt(1)?.clone();
                    let graph = self.grammar.graph();
                    let rule = graph.state(graph.decision_state(decision)).rule;
                    self.diagnostics.push(Diagnostic::at_token(
                        DiagnosticKind::Ambiguity,
                        &at,
                        Some(self.grammar.rule_name(rule).to_string()),
                        Vec::new(),
                        "lookahead budget exhausted; committing to the first viable alternative"
                            .to_string(),
                    ));
                }
                if cacheable && !used_predicate && !ambiguous {
                    self.cache
                        .record(decision, &mut self.stream, lookahead_used, branch)?;
                }
                Ok(Resolution::Branch(branch))
            }
            SimOutcome::NoViable => Ok(Resolution::NoViable),
        }
    }

    /// Match one terminal, repairing a mismatch by single-token deletion or
    /// insertion.
    fn match_terminal(&mut self, expected: TokenType, rule: RuleId) -> Result<(), EngineError> {
        if self.stream.la(1)? == expected {
            let global = self.stream.consume()?;
            let token = self.stream.get(global).cloned().expect("consumed token");
            self.builder.add_token(global, &token);
            return Ok(());
        }
        let offender = self.stream.lt(1)?.clone();
        let expected_name = self.grammar.token_name(expected).to_string();
        if self.stream.la(2)? == expected {
            // Deletion: skip the offender, then take the expected token.
            self.diagnostics.push(Diagnostic::at_token(
                DiagnosticKind::UnexpectedToken,
                &offender,
                Some(self.grammar.rule_name(rule).to_string()),
                vec![expected_name],
                format!("unexpected {:?}, skipping it", offender.text),
            ));
            let global = self.stream.consume()?;
            self.builder.add_error_token(global, &offender);
            let global = self.stream.consume()?;
            let token = self.stream.get(global).cloned().expect("consumed token");
            self.builder.add_token(global, &token);
        } else {
            // Insertion: report the gap and continue without consuming.
            self.diagnostics.push(Diagnostic::at_token(
                DiagnosticKind::MissingToken,
                &offender,
                Some(self.grammar.rule_name(rule).to_string()),
                vec![expected_name.clone()],
                format!("missing {} before this point", expected_name),
            ));
            self.builder.add_missing_token(expected, offender.start);
        }
        Ok(())
    }

    /// A dead decision point: report, resynchronize, then either retry the
    /// decision or abandon the enclosing rule.
    fn recover_no_viable(
        &mut self,
        decision_state: StateId,
        decision: DecisionId,
    ) -> Result<StateId, EngineError> {
        let graph = self.grammar.graph();
        let rule = graph.state(decision_state).rule;
        let expected_types = self.grammar.tables().expected_at(decision).to_vec();
        let offender = self.stream.lt(1)?.clone();
        self.diagnostics.push(Diagnostic::at_token(
            DiagnosticKind::NoViableAlternative,
            &offender,
            Some(self.grammar.rule_name(rule).to_string()),
            self.grammar.token_names_of(&expected_types),
            format!(
                "no viable alternative in '{}'",
                self.grammar.rule_name(rule)
            ),
        ));

        // Two recovery rounds at the same position must not loop forever:
        // force one token of progress before resynchronizing.
        if self.progress.stuck_at(self.stream.index()) && !offender.is_eof() {
            let global = self.stream.consume()?;
            self.builder.add_error_token(global, &offender);
        }

        let mut set = recovery_set(self.grammar, &self.return_stack);
        set.extend(expected_types.iter().copied());
        for global in resync(&mut self.stream, &set)? {
            let token = self.stream.get(global).cloned().expect("discarded token");
            self.builder.add_error_token(global, &token);
        }

        if expected_types.contains(&self.stream.la(1)?) {
            return Ok(decision_state);
        }
        Ok(self.abandon_rule(rule))
    }

    /// Jump to the rule's stop state; the main loop closes the node and
    /// returns to the caller.
    fn abandon_rule(&mut self, rule: RuleId) -> StateId {
        self.grammar.graph().rule_stop(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Sym, DEFAULT_MODE};

    fn list_grammar() -> Grammar {
        // list := ITEM (COMMA ITEM)*
        let mut g = GrammarBuilder::new("List");
        let item = g.token("ITEM");
        let comma = g.token("COMMA");
        let ws = g.token("WS");
        g.lex_rule(DEFAULT_MODE, "ITEM", item, "[a-z]+").unwrap();
        g.lex_rule(DEFAULT_MODE, "COMMA", comma, ",").unwrap();
        g.hidden_rule(DEFAULT_MODE, "WS", ws, " +").unwrap();
        let list = g.rule("list");
        g.alt(
            list,
            vec![
                Sym::Token(item),
                Sym::Star(vec![Sym::Token(comma), Sym::Token(item)]),
            ],
        );
        g.build().unwrap()
    }

    #[test]
    fn test_clean_input_yields_no_diagnostics() {
        let g = list_grammar();
        let outcome = Parser::new(&g)
            .parse("a, b, c", g.rule_id("list").unwrap())
            .unwrap();
        assert!(outcome.is_clean(), "diagnostics: {:?}", outcome.diagnostics);
        assert_eq!(outcome.tree.to_sexpr(&g), "(list a , b , c)");
    }

    #[test]
    fn test_missing_separator_is_inserted_with_one_diagnostic() {
        // pair := ITEM COMMA ITEM, with the comma absent from the input.
        let mut g = GrammarBuilder::new("Pair");
        let item = g.token("ITEM");
        let comma = g.token("COMMA");
        let ws = g.token("WS");
        g.lex_rule(DEFAULT_MODE, "ITEM", item, "[a-z]+").unwrap();
        g.lex_rule(DEFAULT_MODE, "COMMA", comma, ",").unwrap();
        g.hidden_rule(DEFAULT_MODE, "WS", ws, " +").unwrap();
        let pair = g.rule("pair");
        g.alt(pair, vec![Sym::Token(item), Sym::Token(comma), Sym::Token(item)]);
        let g = g.build().unwrap();

        let outcome = Parser::new(&g)
            .parse("a b", g.rule_id("pair").unwrap())
            .unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingToken);
        assert_eq!(outcome.tree.to_sexpr(&g), "(pair a (error missing:COMMA) b)");
    }

    #[test]
    fn test_doubled_comma_is_deleted_with_one_diagnostic() {
        let g = list_grammar();
        let outcome = Parser::new(&g)
            .parse("a,, b", g.rule_id("list").unwrap())
            .unwrap();
        // The second comma is where an ITEM was expected, and the token
        // after it fits, so deletion repairs it.
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::UnexpectedToken);
        assert!(outcome.tree.to_sexpr(&g).contains("b"));
    }

    #[test]
    fn test_trailing_input_reports_one_diagnostic() {
        let mut g = GrammarBuilder::new("One");
        let a = g.token("A");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a)]);
        let g = g.build().unwrap();
        let outcome = Parser::new(&g).parse("aaa", g.rule_id("r").unwrap()).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::UnexpectedToken
        );
        // Extra tokens are preserved as error leaves under the root.
        let root = outcome.tree.root();
        assert_eq!(outcome.tree.node(root).children.len(), 3);
    }

    #[test]
    fn test_parse_always_terminates_on_garbage() {
        let g = list_grammar();
        let outcome = Parser::new(&g)
            .parse(",,,,", g.rule_id("list").unwrap())
            .unwrap();
        assert!(!outcome.diagnostics.is_empty());
    }
}
