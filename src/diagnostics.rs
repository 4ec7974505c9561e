//! Structured diagnostics and the fatal error type.
//!
//!     Recoverable problems never abort a parse. Both the lexer and the
//!     parser append one [`Diagnostic`] per recovery event and keep going, so
//!     a single pass over the input accumulates every lexical and syntactic
//!     error. The final list is ordered by source offset.
//!
//!     [`EngineError`] is the one fatal case: an internal-consistency
//!     violation of the mode stack (a pop with no matching push, or end of
//!     input reached while a non-default mode is still active). It aborts
//!     the current parse and is returned as `Err` instead of a diagnostic.

use crate::token::Token;
use serde::Serialize;
use std::fmt;

/// Classification of a recovered error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// No lexical rule of the active mode matched the current character.
    Lexical,
    /// A token outside the expected set was skipped (single-token deletion).
    UnexpectedToken,
    /// An expected token was virtually inserted (single-token insertion).
    MissingToken,
    /// No alternative at a decision point was viable for the input.
    NoViableAlternative,
    /// A semantic predicate eliminated the committed path.
    FailedPredicate,
    /// The lookahead/step budget ran out with several alternatives still
    /// viable; the first-declared one was chosen.
    Ambiguity,
}

/// One recovered error: position, enclosing rule, expected set, offender.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line of the offending position.
    pub line: u32,
    /// 1-based column of the offending position.
    pub column: u32,
    /// Byte offset of the offending position.
    pub offset: usize,
    /// Name of the enclosing parser rule, when known.
    pub rule: Option<String>,
    /// Names of the token types that would have been accepted.
    pub expected: Vec<String>,
    /// Text of the offending token or character, when there is one.
    pub offending: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn lexical(line: u32, column: u32, offset: usize, offending: char) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Lexical,
            line,
            column,
            offset,
            rule: None,
            expected: Vec::new(),
            offending: Some(offending.to_string()),
            message: format!("no lexical rule matches {:?}", offending),
        }
    }

    pub(crate) fn at_token(
        kind: DiagnosticKind,
        token: &Token,
        rule: Option<String>,
        expected: Vec<String>,
        message: String,
    ) -> Self {
        Diagnostic {
            kind,
            line: token.line,
            column: token.column,
            offset: token.start,
            rule,
            expected,
            offending: if token.is_eof() {
                None
            } else {
                Some(token.text.clone())
            },
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)?;
        if let Some(rule) = &self.rule {
            write!(f, " (in rule '{}')", rule)?;
        }
        if !self.expected.is_empty() {
            write!(f, ", expected one of [{}]", self.expected.join(", "))?;
        }
        Ok(())
    }
}

/// Render a diagnostics list as a JSON value for tooling output.
pub fn diagnostics_to_json(diagnostics: &[Diagnostic]) -> serde_json::Value {
    serde_json::to_value(diagnostics).unwrap_or(serde_json::Value::Null)
}

/// Fatal engine error: the parse cannot continue.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Mode-stack underflow/overflow or end of input inside a non-default
    /// mode. Carries the position at which the violation was detected.
    InternalConsistency {
        line: u32,
        column: u32,
        offset: usize,
        message: String,
    },
}

impl EngineError {
    pub(crate) fn consistency(line: u32, column: u32, offset: usize, message: String) -> Self {
        EngineError::InternalConsistency {
            line,
            column,
            offset,
            message,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InternalConsistency {
                line,
                column,
                message,
                ..
            } => write!(f, "{}:{}: internal consistency error: {}", line, column, message),
        }
    }
}

impl std::error::Error for EngineError {}
