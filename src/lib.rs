//! lexparse: a lexical-analysis and predictive-parsing engine.
//!
//!     A [`Grammar`] is assembled once through the
//!     [`GrammarBuilder`](grammar::GrammarBuilder): lexical rules grouped
//!     into modes, parser rules compiled into a decision graph with
//!     precomputed prediction tables, and named semantic predicates. The
//!     grammar is then shared immutably across any number of parses.
//!
//!     Lexing is pull-based and context-sensitive through a mode stack;
//!     parsing is a single committed walk that resolves decision points
//!     through a one-token table, a per-parse cache, and a bounded
//!     simulation, in that order. Both layers recover from errors locally
//!     and report them as structured [`Diagnostic`]s; a parse always yields
//!     a tree.
//!
//!     ```
//!     use lexparse::{parse, testing::ARITH};
//!
//!     let start = ARITH.rule_id("expr").unwrap();
//!     let outcome = parse(&ARITH, "a + b", start).unwrap();
//!     assert!(outcome.is_clean());
//!     assert_eq!(outcome.tree.to_sexpr(&ARITH), "(expr (term a) + (term b))");
//!     ```

pub mod chars;
pub mod diagnostics;
pub mod grammar;
pub mod lexing;
pub mod parsing;
pub mod testing;
pub mod token;
pub mod tree;

pub use diagnostics::{diagnostics_to_json, Diagnostic, DiagnosticKind, EngineError};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, RuleId};
pub use parsing::{ParseOutcome, Parser, ParserConfig, PredicateContext, PredicateFn};
pub use token::{detokenize, Channel, Token, TokenType};
pub use tree::walker::{walk, ParseListener};
pub use tree::{NodeId, NodeKind, ParseTree, Span};

use lexing::LexerEngine;

/// Result of standalone tokenization: the full token sequence (hidden
/// channel included, EOF last) and any lexical diagnostics.
#[derive(Debug)]
pub struct LexOutcome {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LexOutcome {
    /// Tokens outside the default channel (whitespace, comments, error
    /// tokens).
    pub fn hidden_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.channel != Channel::Default)
    }
}

/// Tokenize `source` to completion.
pub fn tokenize(grammar: &Grammar, source: &str) -> Result<LexOutcome, EngineError> {
    let mut lexer = LexerEngine::new(grammar, source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let eof = token.is_eof();
        tokens.push(token);
        if eof {
            break;
        }
    }
    Ok(LexOutcome {
        tokens,
        diagnostics: lexer.take_diagnostics(),
    })
}

/// Parse `source` starting at `start` with default settings.
pub fn parse(grammar: &Grammar, source: &str, start: RuleId) -> Result<ParseOutcome, EngineError> {
    Parser::new(grammar).parse(source, start)
}

/// Parse, then walk the finished tree with `listener`.
pub fn parse_with_listener<L: ParseListener>(
    grammar: &Grammar,
    source: &str,
    start: RuleId,
    listener: &mut L,
) -> Result<ParseOutcome, EngineError> {
    let outcome = parse(grammar, source, start)?;
    walk(&outcome.tree, listener);
    Ok(outcome)
}
