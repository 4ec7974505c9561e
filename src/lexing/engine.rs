//! The mode-stack lexer.
//!
//!     Tokenization is driven by whichever mode sits on top of the stack:
//!     every rule of that mode runs its anchored automaton against the
//!     remaining input, the longest match wins, and equal lengths fall back
//!     to declaration order, deterministically for any input.
//!
//!     Rule actions mutate the mode stack (push on entering a sub-language
//!     such as an interpolation expression, pop on leaving it) and the
//!     rule's channel tags the produced token. When no rule matches, the
//!     lexer emits a one-character error token on the hidden channel,
//!     records one diagnostic, and advances. Recovery is local and the
//!     stream never stalls.
//!
//!     Two situations violate engine preconditions and are fatal rather
//!     than recoverable: popping the bottom (default) mode, and reaching end
//!     of input while a pushed mode is still active.

use crate::chars::CharacterStream;
use crate::diagnostics::{Diagnostic, EngineError};
use crate::grammar::{Grammar, LexAction, ModeId, DEFAULT_MODE};
use crate::token::{Channel, Token, TokenType};

/// Pull-based tokenizer over one input.
pub struct LexerEngine<'g> {
    grammar: &'g Grammar,
    chars: CharacterStream,
    mode_stack: Vec<ModeId>,
    next_index: usize,
    diagnostics: Vec<Diagnostic>,
    eof_emitted: bool,
}

impl<'g> LexerEngine<'g> {
    pub fn new(grammar: &'g Grammar, source: &str) -> Self {
        LexerEngine {
            grammar,
            chars: CharacterStream::new(source),
            mode_stack: vec![DEFAULT_MODE],
            next_index: 0,
            diagnostics: Vec::new(),
            eof_emitted: false,
        }
    }

    /// Current depth of the mode stack (1 = only the default mode).
    pub fn mode_depth(&self) -> usize {
        self.mode_stack.len()
    }

    /// Drain the lexical diagnostics recorded so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Produce the next token. After the EOF token has been emitted, further
    /// calls keep returning EOF tokens.
    pub fn next_token(&mut self) -> Result<Token, EngineError> {
        if self.chars.is_at_end() {
            return self.emit_eof();
        }
        let start = self.chars.byte_index();
        let line = self.chars.line();
        let column = self.chars.column();

        match self.longest_match() {
            Some((rule_idx, len)) => {
                let mode = *self.mode_stack.last().expect("mode stack is never empty");
                self.advance_bytes(len);
                let stop = self.chars.byte_index();
                let rule = &self.grammar.mode(mode).rules[rule_idx];
                let token = Token {
                    ty: rule.ty,
                    channel: rule.channel,
                    text: self.chars.slice(start, stop).to_string(),
                    start,
                    stop,
                    line,
                    column,
                    index: self.next_index,
                };
                self.next_index += 1;
                match rule.action {
                    Some(LexAction::PushMode(target)) => self.mode_stack.push(target),
                    Some(LexAction::PopMode) => {
                        if self.mode_stack.len() == 1 {
                            return Err(EngineError::consistency(
                                line,
                                column,
                                start,
                                format!("lexical rule '{}' pops the default mode", rule.name),
                            ));
                        }
                        self.mode_stack.pop();
                    }
                    None => {}
                }
                Ok(token)
            }
            None => {
                // Local recovery: one error token, one diagnostic, one
                // character of progress.
                let offending = self.chars.peek(0).expect("not at end");
                self.diagnostics
                    .push(Diagnostic::lexical(line, column, start, offending));
                self.chars.consume();
                let stop = self.chars.byte_index();
                let token = Token {
                    ty: TokenType::ERROR,
                    channel: Channel::Hidden,
                    text: self.chars.slice(start, stop).to_string(),
                    start,
                    stop,
                    line,
                    column,
                    index: self.next_index,
                };
                self.next_index += 1;
                Ok(token)
            }
        }
    }

    fn emit_eof(&mut self) -> Result<Token, EngineError> {
        if self.mode_stack.len() > 1 && !self.eof_emitted {
            let mode = *self.mode_stack.last().expect("non-empty");
            return Err(EngineError::consistency(
                self.chars.line(),
                self.chars.column(),
                self.chars.byte_index(),
                format!(
                    "end of input reached with mode '{}' still active",
                    self.grammar.mode_name(mode)
                ),
            ));
        }
        let token = Token {
            ty: TokenType::EOF,
            channel: Channel::Default,
            text: String::new(),
            start: self.chars.byte_index(),
            stop: self.chars.byte_index(),
            line: self.chars.line(),
            column: self.chars.column(),
            index: self.next_index,
        };
        if !self.eof_emitted {
            self.eof_emitted = true;
            self.next_index += 1;
        }
        Ok(token)
    }

    /// Evaluate every rule of the active mode at the cursor. Longest match
    /// wins; a strict `>` comparison keeps the first-declared rule on ties.
    fn longest_match(&self) -> Option<(usize, usize)> {
        let mode = *self.mode_stack.last().expect("mode stack is never empty");
        let rest = self.chars.rest();
        let mut best: Option<(usize, usize)> = None;
        for (idx, rule) in self.grammar.mode(mode).rules.iter().enumerate() {
            if let Some(m) = rule.regex.find(rest) {
                let len = m.end();
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((idx, len));
                }
            }
        }
        best
    }

    fn advance_bytes(&mut self, len: usize) {
        let target = self.chars.byte_index() + len;
        while self.chars.byte_index() < target {
            self.chars.consume();
        }
    }
}
