//! Lexical analysis: the mode-stack tokenizer.
//!
//!     The lexer is pull-based: the token stream asks it for one token at a
//!     time. It is context-sensitive through its mode stack, where string
//!     bodies, interpolation expressions and other sub-languages each bring
//!     their own rule set. See [`engine::LexerEngine`].

pub mod engine;

pub use engine::LexerEngine;
