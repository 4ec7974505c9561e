//! Character stream with bounded lookahead, nested marks, and position
//! tracking.
//!
//!     The stream decodes the input once into a character buffer and keeps a
//!     byte cursor in sync with the character cursor so the lexer can hand
//!     the remaining input to its regex automata without re-scanning.
//!
//!     A UTF-8 byte-order marker at offset zero is stripped before buffering;
//!     offsets reported by the stream are relative to the stripped text.
//!
//! Marks
//!
//!     Marks follow stack discipline: they may nest, and rewinding or
//!     releasing an outer mark invalidates every inner mark created after
//!     it. The cursor only ever moves backwards through an explicit rewind
//!     to a live mark.

/// Handle for a saved stream position. Obtained from
/// [`CharacterStream::mark`]; consumed by `rewind` or `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Debug, Clone, Copy)]
struct MarkState {
    id: usize,
    pos: usize,
    byte_pos: usize,
    line: u32,
    column: u32,
}

/// Cursor over an immutable character buffer.
#[derive(Debug)]
pub struct CharacterStream {
    source: String,
    chars: Vec<char>,
    pos: usize,
    byte_pos: usize,
    line: u32,
    column: u32,
    marks: Vec<MarkState>,
    next_mark_id: usize,
}

impl CharacterStream {
    /// Build a stream over `source`, stripping a leading BOM if present.
    pub fn new(source: &str) -> Self {
        let stripped = source.strip_prefix('\u{FEFF}').unwrap_or(source);
        CharacterStream {
            source: stripped.to_string(),
            chars: stripped.chars().collect(),
            pos: 0,
            byte_pos: 0,
            line: 1,
            column: 1,
            marks: Vec::new(),
            next_mark_id: 0,
        }
    }

    /// Look `k` characters ahead without consuming; `k = 0` is the current
    /// character. Returns `None` past end of input.
    pub fn peek(&self, k: usize) -> Option<char> {
        self.chars.get(self.pos + k).copied()
    }

    /// Consume and return the current character, advancing line/column
    /// tracking. Returns `None` at end of input.
    pub fn consume(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Current character index (not bytes).
    pub fn index(&self) -> usize {
        self.pos
    }

    /// Current byte offset into the (BOM-stripped) source.
    pub fn byte_index(&self) -> usize {
        self.byte_pos
    }

    /// 1-based line of the current position.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the current position.
    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// The not-yet-consumed remainder of the source text.
    pub fn rest(&self) -> &str {
        &self.source[self.byte_pos..]
    }

    /// Slice of the source between two byte offsets.
    pub fn slice(&self, start: usize, stop: usize) -> &str {
        &self.source[start..stop]
    }

    /// Save the current position. Marks nest.
    pub fn mark(&mut self) -> Mark {
        let id = self.next_mark_id;
        self.next_mark_id += 1;
        self.marks.push(MarkState {
            id,
            pos: self.pos,
            byte_pos: self.byte_pos,
            line: self.line,
            column: self.column,
        });
        Mark(id)
    }

    /// Rewind to a live mark, consuming it. Inner marks created after it are
    /// invalidated. Rewinding a mark that is no longer live is a no-op.
    pub fn rewind(&mut self, mark: Mark) {
        if let Some(i) = self.marks.iter().rposition(|m| m.id == mark.0) {
            let state = self.marks[i];
            self.marks.truncate(i);
            self.pos = state.pos;
            self.byte_pos = state.byte_pos;
            self.line = state.line;
            self.column = state.column;
        }
    }

    /// Drop a live mark without moving the cursor. Inner marks created after
    /// it are invalidated too.
    pub fn release(&mut self, mark: Mark) {
        if let Some(i) = self.marks.iter().rposition(|m| m.id == mark.0) {
            self.marks.truncate(i);
        }
    }
}
