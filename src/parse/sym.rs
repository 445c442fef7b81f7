//! Facilities for parsing DASM-style symbol files.

use super::lex::{Token, TokenLexer, TokenValue};
use super::types::{ParseError, ParseResult, SrcSpan};
use chumsky::{self, Parser};
use num_bigint::BigInt;

//===========================================================================//

/// The error type used for `chumsky::Parser`s in this crate.
pub(crate) type PError<'a> =
    chumsky::extra::Err<chumsky::error::Rich<'a, Token>>;

//===========================================================================//

/// A single label definition from a symbol file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolAst {
    /// The location of the label within its line.
    pub span: SrcSpan,
    /// The label text.
    pub label: String,
    /// The address the label refers to.
    pub address: u16,
}

impl SymbolAst {
    fn parser<'a>() -> impl Parser<
        'a,
        &'a [Token],
        ((String, SrcSpan), (BigInt, SrcSpan)),
        PError<'a>,
    > + Clone {
        chumsky::prelude::group((label(), value()))
            .then_ignore(chumsky::prelude::any().repeated())
    }
}

fn label<'a>()
-> impl Parser<'a, &'a [Token], (String, SrcSpan), PError<'a>> + Clone {
    chumsky::prelude::any()
        .try_map(|token: Token, span| match token.value {
            TokenValue::Word(word)
                if !word.starts_with(|chr: char| chr.is_ascii_digit()) =>
            {
                Ok((word, token.span))
            }
            _ => Err(chumsky::error::Rich::custom(span, "")),
        })
        .labelled("label")
}

fn value<'a>()
-> impl Parser<'a, &'a [Token], (BigInt, SrcSpan), PError<'a>> + Clone {
    chumsky::prelude::any()
        .try_map(|token: Token, span| {
            let value = match token.value {
                TokenValue::IntLiteral(int) => Some(int),
                TokenValue::Word(word) => {
                    BigInt::parse_bytes(word.as_bytes(), 16)
                }
            };
            match value {
                Some(value) => Ok((value, token.span)),
                None => Err(chumsky::error::Rich::custom(span, "")),
            }
        })
        .labelled("address")
}

//===========================================================================//

/// Parses one line of a symbol file.  Each line holds a label followed by
/// its address, either as bare hexadecimal (as DASM writes it), `$`-prefixed
/// hexadecimal, or `#`-prefixed decimal.  Anything after the address is
/// ignored.  Returns `None` for blank lines.
pub fn parse_symbol_line(
    line_number: usize,
    line: &str,
) -> ParseResult<Option<SymbolAst>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut invalid: Option<SrcSpan> = None;
    for result in TokenLexer::new(line) {
        match result {
            Ok(token) => tokens.push(token),
            Err(span) => {
                invalid = Some(span);
                break;
            }
        }
    }
    if tokens.is_empty() {
        return match invalid {
            None => Ok(None),
            Some(span) => Err(ParseError::new(
                line_number,
                span,
                format!(
                    "invalid character: {}",
                    line.as_bytes()[span.byte_range()].escape_ascii()
                ),
            )),
        };
    }
    let result = SymbolAst::parser().parse(tokens.as_slice()).into_result();
    let ((label, span), (value, value_span)) = result.map_err(|errors| {
        let (span, message) = match errors.first() {
            Some(error) => {
                let index = error.span().start;
                let span = if index < tokens.len() {
                    tokens[index].span
                } else {
                    tokens[tokens.len() - 1].span.end_span()
                };
                (span, format!("{error:?}"))
            }
            None => (tokens[0].span, "parse error".to_string()),
        };
        ParseError::new(line_number, span, message)
    })?;
    let address = u16::try_from(&value).map_err(|_| {
        ParseError::new(
            line_number,
            value_span,
            format!("address {value:#x} is out of range"),
        )
    })?;
    Ok(Some(SymbolAst { span, label, address }))
}

//===========================================================================//


//===========================================================================//
