//! Logical source positions.

/// A position in the input: byte offset plus 1-based line and column.
///
/// Columns count characters, not bytes. `\r\n`, `\n` and `\r` each end one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseCursor {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseCursor {
    /// The beginning of any input.
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// The position `len` bytes further into `source`.
    ///
    /// `len` must land on a character boundary of `source`.
    pub fn advance(self, source: &str, len: usize) -> Self {
        let end = self.offset + len;
        let mut next = self;
        let mut after_cr = source[..self.offset].ends_with('\r');
        for c in source[self.offset..end].chars() {
            match c {
                '\n' if after_cr => {}
                '\n' | '\r' => {
                    next.line += 1;
                    next.column = 1;
                }
                _ => next.column += 1,
            }
            after_cr = c == '\r';
        }
        next.offset = end;
        next
    }

    /// Input not yet consumed.
    pub fn remaining<'s>(&self, source: &'s str) -> &'s str {
        &source[self.offset..]
    }

    /// Whether the cursor sits at the end of `source`.
    pub fn at_end(&self, source: &str) -> bool {
        self.offset >= source.len()
    }
}

impl Default for ParseCursor {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(source: &str, offset: usize) -> (usize, usize) {
        let cursor = ParseCursor::start().advance(source, offset);
        (cursor.line, cursor.column)
    }

    #[test]
    fn counts_characters_not_bytes() {
        let source = "héllo";
        assert_eq!(at(source, "hé".len()), (1, 3));
    }

    #[test]
    fn every_line_ending_counts_once() {
        let source = "a\nb\r\nc\rd";
        assert_eq!(at(source, 2), (2, 1));
        assert_eq!(at(source, 4), (3, 1));
        assert_eq!(at(source, 5), (3, 1));
        assert_eq!(at(source, 7), (4, 1));
        assert_eq!(at(source, 8), (4, 2));
    }

    #[test]
    fn split_crlf_is_one_break() {
        let source = "x\r\ny";
        let mid = ParseCursor::start().advance(source, 2);
        let end = mid.advance(source, 1);
        assert_eq!((mid.line, mid.column), (2, 1));
        assert_eq!((end.line, end.column), (2, 1));
        assert_eq!(end.remaining(source), "y");
    }
}
