//! Semantic predicate evaluation.
//!
//!     Predicates are named, pure boolean functions over already-consumed
//!     parse context: they may look back at consumed tokens and peek at
//!     buffered lookahead, but they never consume input or mutate parser
//!     state. Results are memoized per (predicate, cursor) within a parse so
//!     the bounded simulation and the committed parse observe identical
//!     outcomes in identical relative order.

use crate::diagnostics::EngineError;
use crate::grammar::{Grammar, PredicateId};
use crate::parsing::stream::TokenStream;
use crate::token::Token;
use std::collections::HashMap;

/// Signature of a registered semantic predicate.
pub type PredicateFn = fn(&PredicateContext<'_>) -> bool;

/// Read-only window a predicate sees: the buffered token sequence and the
/// default-view cursor at the evaluation point.
pub struct PredicateContext<'a> {
    tokens: &'a [Token],
    view: &'a [usize],
    cursor: usize,
}

impl<'a> PredicateContext<'a> {
    /// Lookahead on the default view; `k >= 1`. `None` past the buffered
    /// window.
    pub fn lt(&self, k: usize) -> Option<&Token> {
        debug_assert!(k >= 1, "lookahead is 1-based");
        self.view
            .get(self.cursor + k - 1)
            .or_else(|| self.view.last())
            .and_then(|&i| self.tokens.get(i))
            .filter(|t| self.cursor + k - 1 < self.view.len() || t.is_eof())
    }

    /// Look back `k` default-view tokens before the cursor; `k >= 1`.
    pub fn lb(&self, k: usize) -> Option<&Token> {
        debug_assert!(k >= 1, "look-back is 1-based");
        if k > self.cursor {
            return None;
        }
        self.view
            .get(self.cursor - k)
            .and_then(|&i| self.tokens.get(i))
    }

    /// Default-view cursor position at the evaluation point.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Full buffered token sequence (hidden tokens included), for textual
    /// checks such as adjacency.
    pub fn tokens(&self) -> &[Token] {
        self.tokens
    }
}

/// Evaluates registered predicates with per-parse memoization.
pub(crate) struct PredicateEvaluator {
    memo: HashMap<(PredicateId, usize), bool>,
    /// Default-view tokens buffered ahead of the cursor before evaluating,
    /// so predicates peeking forward see a stable window.
    window: usize,
}

impl PredicateEvaluator {
    pub fn new(window: usize) -> Self {
        PredicateEvaluator {
            memo: HashMap::new(),
            window,
        }
    }

    pub fn eval(
        &mut self,
        grammar: &Grammar,
        pred: PredicateId,
        stream: &mut TokenStream<'_>,
        cursor: usize,
    ) -> Result<bool, EngineError> {
        if let Some(&cached) = self.memo.get(&(pred, cursor)) {
            return Ok(cached);
        }
        stream.fill_view(cursor + self.window)?;
        let ctx = PredicateContext {
            tokens: stream.tokens(),
            view: stream.view_indices(),
            cursor,
        };
        let result = (grammar.predicate_fn(pred))(&ctx);
        self.memo.insert((pred, cursor), result);
        Ok(result)
    }
}
