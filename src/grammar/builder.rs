//! Builder for immutable grammar packages.
//!
//!     A grammar package bundles everything a parse session consumes:
//!     lexical modes with their ordered rule sets, parser rules over the
//!     [`Sym`](super::symbols::Sym) algebra, and named semantic predicates.
//!     `build()` validates the declarations, compiles the decision graph and
//!     tables once, and returns a [`Grammar`] that is never mutated again,
//!     so it can be shared by reference across parses and threads.

use super::graph::{DecisionGraph, GraphCompiler, TransitionLabel};
use super::symbols::{LexAction, LexRule, Mode, ModeId, PredicateId, RuleId, Sym};
use super::tables::DecisionTables;
use super::{Grammar, PredicateDef};
use crate::parsing::predicates::PredicateFn;
use crate::token::{Channel, TokenType};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Errors detected while declaring or building a grammar package.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarError {
    /// The rule's pattern is not a valid regex.
    InvalidPattern { rule: String, message: String },
    /// The rule's pattern can match the empty string, which would stall the
    /// lexer.
    EmptyMatch { rule: String },
    /// A parser rule was declared but given no alternatives.
    EmptyRule(String),
    /// A mode has no lexical rules.
    EmptyMode(String),
    /// A symbol references a token type that was never registered.
    UnknownToken { rule: String, id: u16 },
    /// A symbol references a rule that was never declared.
    UnknownRule { rule: String, id: u16 },
    /// A symbol references a predicate that was never registered.
    UnknownPredicate { rule: String, id: u16 },
    /// A lexical action references a mode that was never declared.
    UnknownMode { rule: String, id: u16 },
    /// A rule can reach itself again without consuming a token, so both
    /// prediction and the committed walk would diverge on it.
    LeftRecursive { rule: String },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::InvalidPattern { rule, message } => {
                write!(f, "lexical rule '{}': invalid pattern: {}", rule, message)
            }
            GrammarError::EmptyMatch { rule } => write!(
                f,
                "lexical rule '{}': pattern matches the empty string",
                rule
            ),
            GrammarError::EmptyRule(name) => {
                write!(f, "parser rule '{}' has no alternatives", name)
            }
            GrammarError::EmptyMode(name) => write!(f, "mode '{}' has no lexical rules", name),
            GrammarError::UnknownToken { rule, id } => {
                write!(f, "rule '{}' references unknown token type {}", rule, id)
            }
            GrammarError::UnknownRule { rule, id } => {
                write!(f, "rule '{}' references unknown rule {}", rule, id)
            }
            GrammarError::UnknownPredicate { rule, id } => {
                write!(f, "rule '{}' references unknown predicate {}", rule, id)
            }
            GrammarError::UnknownMode { rule, id } => {
                write!(f, "lexical rule '{}' references unknown mode {}", rule, id)
            }
            GrammarError::LeftRecursive { rule } => {
                write!(f, "parser rule '{}' is left-recursive", rule)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

struct RuleSpec {
    name: String,
    alts: Vec<Vec<Sym>>,
}

/// Declarative construction of a [`Grammar`].
pub struct GrammarBuilder {
    name: String,
    token_names: Vec<String>,
    modes: Vec<Mode>,
    rules: Vec<RuleSpec>,
    predicates: Vec<PredicateDef>,
}

impl GrammarBuilder {
    /// Start a grammar; the default mode and the reserved `EOF`/`ERROR`
    /// token types are registered up front.
    pub fn new(name: &str) -> Self {
        GrammarBuilder {
            name: name.to_string(),
            token_names: vec!["EOF".to_string(), "ERROR".to_string()],
            modes: vec![Mode {
                name: "DEFAULT".to_string(),
                rules: Vec::new(),
            }],
            rules: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Register a token type and return its id.
    pub fn token(&mut self, name: &str) -> TokenType {
        let id = self.token_names.len() as u16;
        self.token_names.push(name.to_string());
        TokenType(id)
    }

    /// Declare an additional lexical mode.
    pub fn mode(&mut self, name: &str) -> ModeId {
        let id = self.modes.len() as u16;
        self.modes.push(Mode {
            name: name.to_string(),
            rules: Vec::new(),
        });
        ModeId(id)
    }

    /// Append a default-channel lexical rule to a mode. Rule order within a
    /// mode is declaration order, which breaks maximal-munch ties.
    pub fn lex_rule(
        &mut self,
        mode: ModeId,
        name: &str,
        ty: TokenType,
        pattern: &str,
    ) -> Result<(), GrammarError> {
        self.lex_rule_full(mode, name, ty, pattern, Channel::Default, None)
    }

    /// Append a hidden-channel lexical rule (whitespace, comments).
    pub fn hidden_rule(
        &mut self,
        mode: ModeId,
        name: &str,
        ty: TokenType,
        pattern: &str,
    ) -> Result<(), GrammarError> {
        self.lex_rule_full(mode, name, ty, pattern, Channel::Hidden, None)
    }

    /// Append a lexical rule with an explicit channel and optional mode
    /// action.
    pub fn lex_rule_full(
        &mut self,
        mode: ModeId,
        name: &str,
        ty: TokenType,
        pattern: &str,
        channel: Channel,
        action: Option<LexAction>,
    ) -> Result<(), GrammarError> {
        let anchored = format!(r"\A(?:{})", pattern);
        let regex = Regex::new(&anchored).map_err(|e| GrammarError::InvalidPattern {
            rule: name.to_string(),
            message: e.to_string(),
        })?;
        if regex.is_match("") {
            return Err(GrammarError::EmptyMatch {
                rule: name.to_string(),
            });
        }
        if let Some(LexAction::PushMode(target)) = action {
            if target.0 as usize >= self.modes.len() {
                return Err(GrammarError::UnknownMode {
                    rule: name.to_string(),
                    id: target.0,
                });
            }
        }
        let mode_idx = mode.0 as usize;
        if mode_idx >= self.modes.len() {
            return Err(GrammarError::UnknownMode {
                rule: name.to_string(),
                id: mode.0,
            });
        }
        self.modes[mode_idx].rules.push(LexRule {
            name: name.to_string(),
            ty,
            regex,
            channel,
            action,
        });
        Ok(())
    }

    /// Declare a parser rule; alternatives are added with [`alt`](Self::alt).
    pub fn rule(&mut self, name: &str) -> RuleId {
        let id = self.rules.len() as u16;
        self.rules.push(RuleSpec {
            name: name.to_string(),
            alts: Vec::new(),
        });
        RuleId(id)
    }

    /// Append one alternative to a rule, in declaration order.
    pub fn alt(&mut self, rule: RuleId, syms: Vec<Sym>) {
        self.rules[rule.0 as usize].alts.push(syms);
    }

    /// Register a named semantic predicate.
    pub fn predicate(&mut self, name: &str, func: PredicateFn) -> PredicateId {
        let id = self.predicates.len() as u16;
        self.predicates.push(PredicateDef {
            name: name.to_string(),
            func,
        });
        PredicateId(id)
    }

    /// Validate the declarations and compile the immutable grammar package.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        for mode in &self.modes {
            if mode.rules.is_empty() {
                return Err(GrammarError::EmptyMode(mode.name.clone()));
            }
        }
        for spec in &self.rules {
            if spec.alts.is_empty() {
                return Err(GrammarError::EmptyRule(spec.name.clone()));
            }
            for alt in &spec.alts {
                self.check_syms(&spec.name, alt)?;
            }
        }

        let rule_alts: Vec<Vec<Vec<Sym>>> =
            self.rules.iter().map(|r| r.alts.clone()).collect();
        let graph = GraphCompiler::compile(&rule_alts);
        let tables = super::tables::compute(&graph);
        if let Some(rule) = find_left_recursion(&graph, &tables, self.rules.len()) {
            return Err(GrammarError::LeftRecursive {
                rule: self.rules[rule].name.clone(),
            });
        }

        Ok(Grammar {
            name: self.name,
            token_names: self.token_names,
            modes: self.modes,
            rule_names: self.rules.into_iter().map(|r| r.name).collect(),
            predicates: self.predicates,
            graph,
            tables,
        })
    }

    fn check_syms(&self, rule: &str, syms: &[Sym]) -> Result<(), GrammarError> {
        for sym in syms {
            match sym {
                Sym::Token(ty) => {
                    if ty.0 as usize >= self.token_names.len() {
                        return Err(GrammarError::UnknownToken {
                            rule: rule.to_string(),
                            id: ty.0,
                        });
                    }
                }
                Sym::Rule(r) => {
                    if r.0 as usize >= self.rules.len() {
                        return Err(GrammarError::UnknownRule {
                            rule: rule.to_string(),
                            id: r.0,
                        });
                    }
                }
                Sym::Pred(p) => {
                    if p.0 as usize >= self.predicates.len() {
                        return Err(GrammarError::UnknownPredicate {
                            rule: rule.to_string(),
                            id: p.0,
                        });
                    }
                }
                Sym::Choice(branches) => {
                    for branch in branches {
                        self.check_syms(rule, branch)?;
                    }
                }
                Sym::Star(body) | Sym::Opt(body) => self.check_syms(rule, body)?,
            }
        }
        Ok(())
    }
}

/// Rules callable at `rule`'s left edge, i.e. before the first terminal.
/// A call edge is skippable when the callee is nullable, which catches
/// recursion hidden behind optional prefixes.
fn left_callees(graph: &DecisionGraph, tables: &DecisionTables, rule: usize) -> BTreeSet<usize> {
    let mut callees = BTreeSet::new();
    let mut visited = HashSet::new();
    let mut work = vec![graph.rule_entry(RuleId(rule as u16))];
    while let Some(id) = work.pop() {
        if !visited.insert(id) {
            continue;
        }
        for t in &graph.state(id).transitions {
            match t.label {
                TransitionLabel::Atom(_) => {}
                TransitionLabel::Epsilon | TransitionLabel::Pred(_) => work.push(t.target),
                TransitionLabel::Call(callee) => {
                    callees.insert(callee.0 as usize);
                    if tables.state_nullable[graph.rule_entry(callee).0 as usize] {
                        work.push(t.target);
                    }
                }
            }
        }
    }
    callees
}

/// Returns the first rule that sits on a left-edge call cycle, if any.
fn find_left_recursion(
    graph: &DecisionGraph,
    tables: &DecisionTables,
    rule_count: usize,
) -> Option<usize> {
    let mut left: Vec<BTreeSet<usize>> = (0..rule_count)
        .map(|r| left_callees(graph, tables, r))
        .collect();
    loop {
        let mut changed = false;
        for r in 0..rule_count {
            let direct: Vec<usize> = left[r].iter().copied().collect();
            for s in direct {
                let indirect: Vec<usize> = left[s].iter().copied().collect();
                let before = left[r].len();
                left[r].extend(indirect);
                if left[r].len() != before {
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    (0..rule_count).find(|r| left[*r].contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::symbols::DEFAULT_MODE;

    #[test]
    fn test_empty_pattern_is_rejected() {
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        let err = g.lex_rule(DEFAULT_MODE, "A", a, "x*").unwrap_err();
        assert!(matches!(err, GrammarError::EmptyMatch { .. }));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        let err = g.lex_rule(DEFAULT_MODE, "A", a, "[unclosed").unwrap_err();
        assert!(matches!(err, GrammarError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rule_without_alternatives_is_rejected() {
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.rule("empty");
        let err = g.build().unwrap_err();
        assert_eq!(err, GrammarError::EmptyRule("empty".to_string()));
    }

    #[test]
    fn test_out_of_range_symbol_is_rejected() {
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(TokenType(99))]);
        let err = g.build().unwrap_err();
        assert!(matches!(err, GrammarError::UnknownToken { .. }));
    }

    #[test]
    fn test_direct_left_recursion_is_rejected() {
        // r := r A | B would loop in prediction without consuming input.
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        let b = g.token("B");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Rule(r), Sym::Token(a)]);
        g.alt(r, vec![Sym::Token(b)]);
        let err = g.build().unwrap_err();
        assert_eq!(
            err,
            GrammarError::LeftRecursive {
                rule: "r".to_string()
            }
        );
    }

    #[test]
    fn test_left_recursion_behind_nullable_prefix_is_rejected() {
        // r := opt r A with opt := B? : the prefix can match nothing, so r
        // is still reachable from its own left edge.
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        let b = g.token("B");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        let r = g.rule("r");
        let opt = g.rule("opt");
        g.alt(r, vec![Sym::Rule(opt), Sym::Rule(r), Sym::Token(a)]);
        g.alt(opt, vec![Sym::Opt(vec![Sym::Token(b)])]);
        let err = g.build().unwrap_err();
        assert_eq!(
            err,
            GrammarError::LeftRecursive {
                rule: "r".to_string()
            }
        );
    }

    #[test]
    fn test_right_recursion_is_accepted() {
        // r := A r | B consumes a token before recursing.
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        let b = g.token("B");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        g.lex_rule(DEFAULT_MODE, "B", b, "b").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a), Sym::Rule(r)]);
        g.alt(r, vec![Sym::Token(b)]);
        assert!(g.build().is_ok());
    }

    #[test]
    fn test_build_produces_shared_names() {
        let mut g = GrammarBuilder::new("T");
        let a = g.token("A");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a)]);
        let grammar = g.build().unwrap();
        assert_eq!(grammar.token_name(a), "A");
        assert_eq!(grammar.token_name(TokenType::EOF), "EOF");
        assert_eq!(grammar.rule_name(r), "r");
    }
}
