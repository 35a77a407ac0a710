use std::fmt::{self, Display, Formatter};
use std::iter::Peekable;
use std::str::CharIndices;

use num_bigint::BigInt;

use crate::error::{Result, RpalError};
use crate::tree::unescape;

pub const KEYWORDS: &[&str] = &[
    "let", "in", "fn", "where", "aug", "or", "not", "gr", "ge", "ls", "le", "eq", "ne", "true",
    "false", "nil", "dummy", "within", "and", "rec",
];

const OPERATOR_CHARS: &str = "+-*<>&.@/:=~|$#!%^_[]{}\"?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(&'static str),
    Identifier(String),
    Integer(BigInt),
    Str(String),
    Operator(String),
    Punctuation(char),
    End,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

impl Token {
    /// The keyword, operator or punctuation text, if the token is one.
    pub fn symbol(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Keyword(k) => Some(k),
            TokenKind::Operator(op) => Some(op),
            TokenKind::Punctuation(p) => Some(match p {
                '(' => "(",
                ')' => ")",
                ';' => ";",
                _ => ",",
            }),
            _ => None,
        }
    }

    pub fn is(&self, text: &str) -> bool {
        self.symbol() == Some(text)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "keyword `{k}`"),
            TokenKind::Identifier(name) => write!(f, "identifier `{name}`"),
            TokenKind::Integer(value) => write!(f, "integer {value}"),
            TokenKind::Str(value) => write!(f, "string {value:?}"),
            TokenKind::Operator(op) => write!(f, "operator `{op}`"),
            TokenKind::Punctuation(p) => write!(f, "`{p}`"),
            TokenKind::End => f.write_str("end of input"),
        }
    }
}

/// Splits source text into tokens, dropping whitespace and `//` comments.
/// The returned list always ends with a `TokenKind::End` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let kind = if c.is_whitespace() {
            chars.next();
            continue;
        } else if source[offset..].starts_with("//") {
            scan(source, offset, &mut chars, |c| c != '\n');
            continue;
        } else if c.is_ascii_alphabetic() {
            let word = scan(source, offset, &mut chars, |c| {
                c.is_ascii_alphanumeric() || c == '_'
            });
            match KEYWORDS.iter().find(|k| **k == word) {
                Some(keyword) => TokenKind::Keyword(*keyword),
                None => TokenKind::Identifier(word.to_string()),
            }
        } else if c.is_ascii_digit() {
            let digits = scan(source, offset, &mut chars, |c| c.is_ascii_digit());
            let value = digits.parse().map_err(|_| RpalError::BadLiteral {
                offset,
                message: format!("invalid integer `{digits}`"),
            })?;
            TokenKind::Integer(value)
        } else if c == '\'' {
            TokenKind::Str(lex_string(source, offset, &mut chars)?)
        } else if "();,".contains(c) {
            chars.next();
            TokenKind::Punctuation(c)
        } else if OPERATOR_CHARS.contains(c) {
            let op = scan(source, offset, &mut chars, |c| OPERATOR_CHARS.contains(c));
            TokenKind::Operator(op.to_string())
        } else {
            return Err(RpalError::Lex { offset, found: c });
        };
        tokens.push(Token { kind, offset });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset: source.len(),
    });
    Ok(tokens)
}

type Chars<'s> = Peekable<CharIndices<'s>>;

/// Consumes characters from `start` while `pred` holds.
fn scan<'s>(
    source: &'s str,
    start: usize,
    chars: &mut Chars<'s>,
    pred: impl Fn(char) -> bool,
) -> &'s str {
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        end = i + c.len_utf8();
        chars.next();
    }
    &source[start..end]
}

fn lex_string(source: &str, offset: usize, chars: &mut Chars) -> Result<String> {
    // opening quote
    chars.next();
    let mut escaped = false;
    for (i, c) in chars.by_ref() {
        match c {
            '\\' if !escaped => escaped = true,
            '\'' if !escaped => {
                return unescape(&source[offset + 1..i])
                    .map_err(|message| RpalError::BadLiteral { offset, message });
            }
            _ => escaped = false,
        }
    }
    Err(RpalError::BadLiteral {
        offset,
        message: "unterminated string".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn splits_a_let_expression() {
        assert_eq!(
            kinds("let x = 3 in x+4 // trailing"),
            vec![
                TokenKind::Keyword("let"),
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("=".into()),
                TokenKind::Integer(3.into()),
                TokenKind::Keyword("in"),
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("+".into()),
                TokenKind::Integer(4.into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn operator_runs_and_punctuation() {
        assert_eq!(
            kinds("f(a,b)->x|y ** 2"),
            vec![
                TokenKind::Identifier("f".into()),
                TokenKind::Punctuation('('),
                TokenKind::Identifier("a".into()),
                TokenKind::Punctuation(','),
                TokenKind::Identifier("b".into()),
                TokenKind::Punctuation(')'),
                TokenKind::Operator("->".into()),
                TokenKind::Identifier("x".into()),
                TokenKind::Operator("|".into()),
                TokenKind::Identifier("y".into()),
                TokenKind::Operator("**".into()),
                TokenKind::Integer(2.into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn strings_are_unescaped() {
        assert_eq!(
            kinds(r"'it\'s' 'a\nb'"),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\nb".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn identifiers_keep_keyword_prefixes() {
        assert_eq!(
            kinds("letter in_x"),
            vec![
                TokenKind::Identifier("letter".into()),
                TokenKind::Identifier("in_x".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn reports_offsets() {
        assert_eq!(tokenize("x + `"), Err(RpalError::Lex { offset: 4, found: '`' }));
        assert!(matches!(
            tokenize("'open"),
            Err(RpalError::BadLiteral { offset: 0, .. })
        ));
        let tokens = tokenize("ab  cd").unwrap();
        assert_eq!(tokens[1].offset, 4);
    }
}
