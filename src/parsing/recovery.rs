//! Error recovery support: resynchronization sets and progress tracking.
//!
//!     When the parser cannot repair a mismatch locally it synchronizes: it
//!     discards tokens until one could continue some rule on the current
//!     call stack. The recovery set is the union of the FIRST sets of every
//!     stacked return state, chaining through nullable continuations, with
//!     EOF always included so resynchronization terminates.
//!
//!     The progress tracker guards against livelock: two recovery rounds at
//!     the same input position force the parser to discard one token before
//!     continuing.

use crate::diagnostics::EngineError;
use crate::grammar::graph::StateId;
use crate::grammar::Grammar;
use crate::parsing::stream::TokenStream;
use crate::token::TokenType;
use std::collections::BTreeSet;

/// Tokens that could continue any rule currently on the stack.
pub(crate) fn recovery_set(grammar: &Grammar, return_stack: &[StateId]) -> BTreeSet<TokenType> {
    let tables = grammar.tables();
    let graph = grammar.graph();
    let mut set = BTreeSet::new();
    set.insert(TokenType::EOF);
    for &ret in return_stack.iter().rev() {
        let idx = ret.0 as usize;
        set.extend(tables.state_first[idx].iter().copied());
        if !tables.state_nullable[idx] {
            break;
        }
        // A nullable continuation lets the enclosing rule finish here too.
        set.extend(tables.rule_follow[graph.state(ret).rule.0 as usize].iter().copied());
    }
    set
}

/// Discard tokens until the lookahead is in `set`. Returns the global
/// indices of the discarded tokens. EOF membership guarantees termination.
pub(crate) fn resync(
    stream: &mut TokenStream<'_>,
    set: &BTreeSet<TokenType>,
) -> Result<Vec<usize>, EngineError> {
    let mut discarded = Vec::new();
    while !set.contains(&stream.la(1)?) {
        discarded.push(stream.consume()?);
    }
    Ok(discarded)
}

/// Detects recovery rounds that fail to advance the input.
pub(crate) struct ProgressTracker {
    last_error_index: Option<usize>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        ProgressTracker {
            last_error_index: None,
        }
    }

    /// Record a recovery round at view position `index`. Returns true when a
    /// previous round already happened at the same position, meaning the
    /// caller must force one token of progress.
    pub fn stuck_at(&mut self, index: usize) -> bool {
        let stuck = self.last_error_index == Some(index);
        self.last_error_index = Some(index);
        stuck
    }
}
