use std::fmt;
use std::ops::Range;

//===========================================================================//

/// A span of byte offsets within a single line of a source file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SrcSpan {
    start: usize,
    end: usize,
}

impl SrcSpan {
    /// Constructs a span from the given the byte range.
    pub fn from_byte_range(range: Range<usize>) -> SrcSpan {
        assert!(range.start <= range.end);
        SrcSpan { start: range.start, end: range.end }
    }

    /// Returns the byte range represented by this span.
    pub fn byte_range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub(crate) fn end_span(&self) -> SrcSpan {
        SrcSpan { start: self.end, end: self.end }
    }
}

//===========================================================================//

/// A specialized `Result` type for parsing operations.
pub type ParseResult<V> = Result<V, ParseError>;

//===========================================================================//

/// An error encountered while parsing a line of a symbol file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    /// The line number within the file.  The file starts on line 1.
    pub line: usize,
    /// The location within the line where the error occurred.
    pub span: SrcSpan,
    /// The error message to report to the user.
    pub message: String,
}

impl ParseError {
    /// Constructs a parse error with the given location and message.
    pub fn new(line: usize, span: SrcSpan, message: String) -> ParseError {
        ParseError { line, span, message }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "line {}:{}: {}", self.line, self.span.start, self.message)
    }
}

//===========================================================================//
