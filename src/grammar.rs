//! The grammar package: process-wide static tables consumed by every parse.
//!
//!     A [`Grammar`] is loaded once (lexical modes, parser rules compiled to
//!     a decision graph, precomputed decision tables, and registered
//!     semantic predicates) and then only ever read. It is `Send + Sync`
//!     and shared by reference across concurrent parse sessions without
//!     locking.
//!
//!     Grammar authoring lives outside this engine; the
//!     [`GrammarBuilder`](builder::GrammarBuilder) is the loading interface
//!     a generated or hand-assembled grammar package drives once at
//!     initialization.

pub mod builder;
pub(crate) mod graph;
pub mod symbols;
pub(crate) mod tables;

pub use builder::{GrammarBuilder, GrammarError};
pub use symbols::{DecisionId, LexAction, LexRule, Mode, ModeId, PredicateId, RuleId, Sym, DEFAULT_MODE};

use crate::parsing::predicates::PredicateFn;
use crate::token::TokenType;

#[derive(Debug)]
pub(crate) struct PredicateDef {
    pub name: String,
    pub func: PredicateFn,
}

/// Immutable grammar package; see the module docs.
#[derive(Debug)]
pub struct Grammar {
    pub(crate) name: String,
    pub(crate) token_names: Vec<String>,
    pub(crate) modes: Vec<Mode>,
    pub(crate) rule_names: Vec<String>,
    pub(crate) predicates: Vec<PredicateDef>,
    pub(crate) graph: graph::DecisionGraph,
    pub(crate) tables: tables::DecisionTables,
}

impl Grammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token_count(&self) -> usize {
        self.token_names.len()
    }

    /// Display name of a token type ("EOF" and "ERROR" for the reserved
    /// ids).
    pub fn token_name(&self, ty: TokenType) -> &str {
        self.token_names
            .get(ty.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    pub fn rule_count(&self) -> usize {
        self.rule_names.len()
    }

    pub fn rule_name(&self, rule: RuleId) -> &str {
        self.rule_names
            .get(rule.0 as usize)
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    /// Look a rule up by name, for callers that keep only the grammar.
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_names
            .iter()
            .position(|n| n == name)
            .map(|i| RuleId(i as u16))
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn mode_name(&self, mode: ModeId) -> &str {
        self.modes
            .get(mode.0 as usize)
            .map(|m| m.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn predicate_name(&self, pred: PredicateId) -> &str {
        self.predicates
            .get(pred.0 as usize)
            .map(|p| p.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub(crate) fn mode(&self, mode: ModeId) -> &Mode {
        &self.modes[mode.0 as usize]
    }

    pub(crate) fn graph(&self) -> &graph::DecisionGraph {
        &self.graph
    }

    pub(crate) fn tables(&self) -> &tables::DecisionTables {
        &self.tables
    }

    pub(crate) fn predicate_fn(&self, pred: PredicateId) -> PredicateFn {
        self.predicates[pred.0 as usize].func
    }

    /// Token-type names for a list of ids, for diagnostics.
    pub(crate) fn token_names_of(&self, types: &[TokenType]) -> Vec<String> {
        types.iter().map(|t| self.token_name(*t).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Grammar {
        let mut g = GrammarBuilder::new("Tiny");
        let a = g.token("A");
        g.lex_rule(DEFAULT_MODE, "A", a, "a").unwrap();
        let r = g.rule("r");
        g.alt(r, vec![Sym::Token(a)]);
        g.build().unwrap()
    }

    #[test]
    fn test_grammar_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Grammar>();
    }

    #[test]
    fn test_grammar_debug_output_names_the_package() {
        // `Result<Grammar, _>::unwrap_err` and friends need this in tests.
        let rendered = format!("{:?}", tiny());
        assert!(rendered.contains("Tiny"));
    }

    #[test]
    fn test_rule_lookup_by_name() {
        let g = tiny();
        assert_eq!(g.rule_id("r"), Some(RuleId(0)));
        assert_eq!(g.rule_id("missing"), None);
    }
}
