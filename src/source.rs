//! Source-text boundary.
//!
//! The pipeline only needs a named compilation unit with line-level
//! access; whether the bytes came from a file, a string, or a bundled
//! resource is the caller's business.

use std::fmt;
use std::rc::Rc;

/// A position inside a compilation unit. Tokens and AST nodes carry one
/// of these and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub source: Rc<str>,
}

impl Position {
    pub fn new(line: u32, column: u32, source: Rc<str>) -> Self {
        Self {
            line,
            column,
            source,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.column)
    }
}

impl serde::Serialize for Position {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Position", 3)?;
        state.serialize_field("line", &self.line)?;
        state.serialize_field("column", &self.column)?;
        state.serialize_field("source", self.source.as_ref())?;
        state.end()
    }
}

/// A named compilation unit plus the line table derived from it.
#[derive(Debug, Clone)]
pub struct SourceText {
    name: Rc<str>,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceText {
    pub fn new(name: impl AsRef<str>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            name: Rc::from(name.as_ref()),
            text,
            line_starts,
        }
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Character at a byte offset, if the offset lands on a boundary.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.text.get(offset..).and_then(|rest| rest.chars().next())
    }

    /// The 1-based line `number`, without its trailing newline.
    pub fn line(&self, number: usize) -> Option<&str> {
        let start = *self.line_starts.get(number.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(number)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        self.text.get(start..end)
    }

    pub fn position(&self, line: u32, column: u32) -> Position {
        Position::new(line, column, self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_table_covers_final_unterminated_line() {
        let source = SourceText::new("snippet", "first\nsecond\nthird");
        assert_eq!(source.line_count(), 3);
        assert_eq!(source.line(1), Some("first"));
        assert_eq!(source.line(3), Some("third"));
        assert_eq!(source.line(4), None);
    }

    #[test]
    fn char_at_respects_boundaries() {
        let source = SourceText::new("snippet", "ab\nc");
        assert_eq!(source.char_at(0), Some('a'));
        assert_eq!(source.char_at(2), Some('\n'));
        assert_eq!(source.char_at(4), None);
    }
}
