//! Lazily-filled, seekable token buffer between lexer and parser.
//!
//!     The stream pulls tokens from the lexer on demand and retains the full
//!     sequence, so any previously visited index can be revisited in O(1).
//!     The parser operates on the default-channel view; hidden-channel
//!     tokens (whitespace, comments, lexer error tokens) stay in the
//!     underlying buffer for tooling.
//!
//!     Marks are plain view positions: with the whole history retained,
//!     speculative consumption is just `mark`/`seek` bookkeeping.

use crate::diagnostics::{Diagnostic, EngineError};
use crate::lexing::LexerEngine;
use crate::token::{Channel, Token, TokenType};

pub struct TokenStream<'g> {
    lexer: LexerEngine<'g>,
    /// Full token sequence pulled so far, hidden tokens included.
    tokens: Vec<Token>,
    /// Indices into `tokens` of default-channel tokens (EOF included).
    view: Vec<usize>,
    /// Cursor into `view`.
    pos: usize,
    /// EOF has been buffered; the lexer will not be pulled again.
    done: bool,
}

impl<'g> TokenStream<'g> {
    pub fn new(lexer: LexerEngine<'g>) -> Self {
        TokenStream {
            lexer,
            tokens: Vec::new(),
            view: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    /// Ensure the default view holds a token at `view_idx` (or EOF is
    /// buffered).
    pub fn fill_view(&mut self, view_idx: usize) -> Result<(), EngineError> {
        while !self.done && self.view.len() <= view_idx {
            let token = self.lexer.next_token()?;
            if token.is_eof() {
                self.done = true;
            }
            let global = self.tokens.len();
            if token.channel == Channel::Default {
                self.view.push(global);
            }
            self.tokens.push(token);
        }
        Ok(())
    }

    /// Pull everything up to and including the EOF token.
    pub fn fill_to_eof(&mut self) -> Result<(), EngineError> {
        while !self.done {
            self.fill_view(self.view.len())?;
        }
        Ok(())
    }

    /// Lookahead on the default view; `k >= 1`, clamped to the EOF token.
    pub fn lt(&mut self, k: usize) -> Result<&Token, EngineError> {
        debug_assert!(k >= 1, "lookahead is 1-based");
        let target = self.pos + k - 1;
        self.fill_view(target)?;
        let idx = if target < self.view.len() {
            self.view[target]
        } else {
            *self.view.last().expect("EOF is always in the default view")
        };
        Ok(&self.tokens[idx])
    }

    /// Type of the `k`-th lookahead token.
    pub fn la(&mut self, k: usize) -> Result<TokenType, EngineError> {
        Ok(self.lt(k)?.ty)
    }

    /// Consume the current default-view token, returning its global index.
    /// At EOF the cursor stays put.
    pub fn consume(&mut self) -> Result<usize, EngineError> {
        let (global, eof) = {
            let token = self.lt(1)?;
            (token.index, token.is_eof())
        };
        if !eof {
            self.pos += 1;
        }
        Ok(global)
    }

    /// Cursor position in the default view.
    pub fn index(&self) -> usize {
        self.pos
    }

    /// Global index (into the full sequence) of the next default token.
    pub fn next_global_index(&mut self) -> Result<usize, EngineError> {
        Ok(self.lt(1)?.index)
    }

    /// Save the cursor for speculative consumption.
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Release a mark. The buffer retains full history, so this is
    /// bookkeeping only; rewinding is an explicit [`seek`](Self::seek).
    pub fn release(&mut self, _mark: usize) {}

    /// Rewind (or advance) the cursor to a previously visited view index.
    pub fn seek(&mut self, view_idx: usize) {
        debug_assert!(
            view_idx <= self.view.len(),
            "seek beyond the filled portion of the stream"
        );
        self.pos = view_idx.min(self.view.len());
    }

    /// Full token sequence buffered so far (hidden tokens included).
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Default-channel view indices buffered so far.
    pub(crate) fn view_indices(&self) -> &[usize] {
        &self.view
    }

    pub fn get(&self, global_idx: usize) -> Option<&Token> {
        self.tokens.get(global_idx)
    }

    pub(crate) fn take_lexer_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.lexer.take_diagnostics()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}
