use super::types::SrcSpan;
use logos::{self, Logos};
use num_bigint::BigInt;

//===========================================================================//

fn digits_callback(
    lexer: &mut logos::Lexer<TokenKind>,
    radix: u32,
) -> Option<BigInt> {
    // Skip the `$` or `#` prefix.
    BigInt::parse_bytes(&lexer.slice()[1..], radix)
}

#[derive(Debug, Eq, Logos, PartialEq)]
#[logos(skip r"[ \t\r]+")] // whitespace
#[logos(skip r";[^\n]*")] // comments
#[logos(source = [u8])]
enum TokenKind {
    #[regex(r"\$[0-9A-Fa-f]+", |lex| digits_callback(lex, 16))]
    #[regex(r"#[0-9]+", |lex| digits_callback(lex, 10))]
    IntLiteral(BigInt),
    #[regex(r"[_.A-Za-z0-9]+")]
    Word,
}

//===========================================================================//

/// The contents of a single lexical token.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TokenValue {
    /// A run of label characters.  Depending on position this is either a
    /// label or a bare hexadecimal value, as written by DASM.
    Word(String),
    /// A `$`-prefixed hexadecimal or `#`-prefixed decimal literal.
    IntLiteral(BigInt),
}

impl TokenValue {
    /// Returns the human-readable name for this kind of token.
    pub fn name(&self) -> &str {
        match &self {
            TokenValue::Word(_) => "word",
            TokenValue::IntLiteral(_) => "int literal",
        }
    }
}

//===========================================================================//

/// A single lexical token, including location information.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// The location of the token within its line.
    pub span: SrcSpan,
    /// The contents of the token.
    pub value: TokenValue,
}

//===========================================================================//

/// A lexer for tokenizing one line of a symbol file.  The iterator yields
/// `Err` with the span of the offending text for characters that can't
/// start a token.
pub struct TokenLexer<'a> {
    lexer: logos::Lexer<'a, TokenKind>,
}

impl<'a> TokenLexer<'a> {
    /// Constructs a new lexer in its initial state.
    pub fn new(input: &'a str) -> TokenLexer<'a> {
        TokenLexer { lexer: TokenKind::lexer(input.as_bytes()) }
    }
}

impl Iterator for TokenLexer<'_> {
    type Item = Result<Token, SrcSpan>;

    fn next(&mut self) -> Option<Result<Token, SrcSpan>> {
        let kind = self.lexer.next()?;
        let span = SrcSpan::from_byte_range(self.lexer.span());
        Some(match kind {
            Ok(TokenKind::IntLiteral(int)) => {
                Ok(Token { span, value: TokenValue::IntLiteral(int) })
            }
            Ok(TokenKind::Word) => {
                let word = String::from_utf8_lossy(self.lexer.slice());
                Ok(Token { span, value: TokenValue::Word(word.into_owned()) })
            }
            Err(()) => Err(span),
        })
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Token, TokenLexer, TokenValue};
    use crate::parse::SrcSpan;
    use num_bigint::BigInt;

    fn token(start: usize, end: usize, value: TokenValue) -> Token {
        Token { span: SrcSpan::from_byte_range(start..end), value }
    }

    fn word(string: &str) -> TokenValue {
        TokenValue::Word(string.to_string())
    }

    fn read_all(input: &str) -> Vec<Token> {
        TokenLexer::new(input).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn empty_input() {
        assert_eq!(read_all(""), vec![]);
        assert_eq!(read_all("  \t\r"), vec![]);
    }

    #[test]
    fn comment() {
        assert_eq!(read_all(";;; Hello, world!"), vec![]);
    }

    #[test]
    fn dasm_symbol_line() {
        assert_eq!(
            read_all("Start                    f000"),
            vec![token(0, 5, word("Start")), token(25, 29, word("f000"))]
        );
    }

    #[test]
    fn prefixed_literals() {
        assert_eq!(
            read_all("$f00d #255"),
            vec![
                token(0, 5, TokenValue::IntLiteral(BigInt::from(0xf00d))),
                token(6, 10, TokenValue::IntLiteral(BigInt::from(255))),
            ]
        );
    }

    #[test]
    fn invalid_token() {
        let mut lexer = TokenLexer::new("VSYNC 0000 (R )");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_ok());
        assert_eq!(lexer.next(), Some(Err(SrcSpan::from_byte_range(11..12))));
    }
}

//===========================================================================//
