//! Source positions, spans, and the spanned-error wrapper shared by all
//! diagnostics.

use std::fmt::{Display, Formatter, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
            end: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A secondary message anchored to its own span, attached to a primary error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNote {
    pub message: String,
    pub span: Span,
}

impl ErrorNote {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// An error kind paired with its primary source span and optional notes.
///
/// Every user-facing diagnostic is a `SpannedError` over some kind enum, so
/// formatting, note handling, and stable identifiers work uniformly across
/// subsystems.
#[derive(Debug, Clone)]
pub struct SpannedError<K> {
    pub kind: K,
    pub span: Span,
    pub notes: Vec<ErrorNote>,
}

impl<K> SpannedError<K> {
    pub fn new(kind: K, span: Span) -> Self {
        Self {
            kind,
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: ErrorNote) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = ErrorNote>) -> Self {
        self.notes.extend(notes);
        self
    }
}

impl<K: Display> Display for SpannedError<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "({}) {}", self.span.start, self.kind)?;
        for note in &self.notes {
            write!(f, "\n  note ({}): {}", note.span.start, note.message)?;
        }
        Ok(())
    }
}

impl<K: Display + std::fmt::Debug> std::error::Error for SpannedError<K> {}
