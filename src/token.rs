//! Core token types shared across the lexer, the token stream, and tooling.
//!
//!     Tokens carry everything downstream consumers need without reaching back
//!     into the source: the grammar-assigned type id, the channel tag, the
//!     matched text, byte offsets, line/column of the first character, and a
//!     running index over the full sequence (hidden tokens included).
//!
//! Channels
//!
//!     The channel tag controls visibility. The parser's default view only
//!     sees `Channel::Default` tokens; whitespace and comments typically ride
//!     `Channel::Hidden` and stay retrievable for tooling (comment
//!     extraction, exact-text reassembly). Custom channels are open-ended
//!     classification tags for grammar-specific needs.

use serde::Serialize;

/// A grammar-assigned token type id.
///
/// Ids `0` and `1` are reserved for [`TokenType::EOF`] and
/// [`TokenType::ERROR`]; grammar-defined types start at
/// [`TokenType::FIRST_FREE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenType(pub u16);

impl TokenType {
    /// Synthesized at end of input, always on the default channel.
    pub const EOF: TokenType = TokenType(0);
    /// Emitted when no lexical rule matches (one character, hidden channel).
    pub const ERROR: TokenType = TokenType(1);
    /// First id available to grammar-defined token types.
    pub const FIRST_FREE: u16 = 2;
}

/// Visibility classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    /// Visible to the parser.
    Default,
    /// Retained in the sequence but filtered from the parser's view.
    Hidden,
    /// Grammar-specific channel, also filtered from the parser's view.
    Custom(u8),
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Grammar-assigned type id.
    pub ty: TokenType,
    /// Channel this token was assigned to by the matching lexical rule.
    pub channel: Channel,
    /// Matched source text (empty for the EOF token).
    pub text: String,
    /// Byte offset of the first matched character.
    pub start: usize,
    /// Byte offset one past the last matched character.
    pub stop: usize,
    /// 1-based line of the first matched character.
    pub line: u32,
    /// 1-based column of the first matched character.
    pub column: u32,
    /// Monotonically increasing index over the full token sequence.
    pub index: usize,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.ty == TokenType::EOF
    }

    pub fn is_error(&self) -> bool {
        self.ty == TokenType::ERROR
    }

    /// True when `other` starts exactly where this token ends, with no
    /// intervening characters.
    pub fn is_adjacent_to(&self, other: &Token) -> bool {
        self.stop == other.start
    }
}

/// Reassemble source text by concatenating token texts in sequence order.
///
/// On a zero-diagnostic lex the result is byte-identical to the (BOM-stripped)
/// input, because hidden tokens and error tokens keep their matched text.
pub fn detokenize(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&token.text);
    }
    out
}
