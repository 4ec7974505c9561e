//! Identifier newtypes and the rule algebra the builder accepts.

use crate::token::{Channel, TokenType};
use regex::Regex;
use serde::Serialize;

/// Index of a lexical mode; mode `0` is always the default mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModeId(pub u16);

/// The always-present bottom-of-stack mode.
pub const DEFAULT_MODE: ModeId = ModeId(0);

/// Index of a parser rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub u16);

/// Index of a registered semantic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PredicateId(pub u16);

/// Index of a decision point in the compiled grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DecisionId(pub u16);

/// Mode-stack side effect attached to a lexical rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexAction {
    /// Push the given mode; its rules become the active set.
    PushMode(ModeId),
    /// Pop the current mode. Popping the default mode is fatal.
    PopMode,
}

/// One lexical rule: an anchored automaton plus the token it produces.
#[derive(Debug)]
pub struct LexRule {
    pub name: String,
    pub ty: TokenType,
    /// Anchored at the cursor; longest match wins, declaration order ties.
    pub(crate) regex: Regex,
    pub channel: Channel,
    pub action: Option<LexAction>,
}

/// A named lexical mode: the ordered rule set active while it is on top of
/// the mode stack.
#[derive(Debug)]
pub struct Mode {
    pub name: String,
    pub rules: Vec<LexRule>,
}

/// A grammar symbol within an alternative.
///
/// `Choice`, `Star` and `Opt` become anonymous decision points when the
/// grammar is compiled; `Star` loops are greedy (the enter-body branch is
/// declared before the exit branch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sym {
    /// Match one terminal of the given type.
    Token(TokenType),
    /// Invoke another rule.
    Rule(RuleId),
    /// Ordered alternation between sub-sequences.
    Choice(Vec<Vec<Sym>>),
    /// Zero or more repetitions of a sub-sequence.
    Star(Vec<Sym>),
    /// Zero or one occurrence of a sub-sequence.
    Opt(Vec<Sym>),
    /// Gate: the path is viable only while the predicate holds.
    Pred(PredicateId),
}
