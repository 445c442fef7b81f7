//! Facilities for parsing symbol files.

mod lex;
mod sym;
mod types;

pub use lex::{Token, TokenLexer, TokenValue};
pub use sym::{SymbolAst, parse_symbol_line};
pub use types::{ParseError, ParseResult, SrcSpan};

//===========================================================================//
