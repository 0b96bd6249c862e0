//! Tokenizer for the expression grammar.

use crate::error::ExprErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    /// `^` or `**`.
    Caret,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token start in the input.
    pub offset: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ExprErrorKind> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                TokenKind::Caret
            }
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'^' => TokenKind::Caret,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'0'..=b'9' | b'.' => {
                let end = scan_number(bytes, i);
                let text = &input[i..end];
                let value: f64 = text.parse().map_err(|_| ExprErrorKind::Syntax {
                    offset: start,
                    message: format!("invalid number `{text}`"),
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset: start,
                });
                i = end;
                continue;
            }
            c if c == b'_' || c.is_ascii_alphabetic() => {
                let mut end = i + 1;
                while end < bytes.len() && (bytes[end] == b'_' || bytes[end].is_ascii_alphanumeric()) {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(input[i..end].to_string()),
                    offset: start,
                });
                i = end;
                continue;
            }
            _ => {
                let ch = input[i..].chars().next().unwrap_or('?');
                return Err(ExprErrorKind::Syntax {
                    offset: start,
                    message: format!("unexpected character `{ch}`"),
                });
            }
        };
        tokens.push(Token { kind, offset: start });
        i += 1;
    }

    Ok(tokens)
}

/// Scan `digits [. digits] [(e|E) [+-] digits]` starting at `i`.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scientific_notation_and_double_star() {
        assert_eq!(
            kinds("1.5e-3**x"),
            vec![
                TokenKind::Number(1.5e-3),
                TokenKind::Caret,
                TokenKind::Ident("x".to_string())
            ]
        );
    }

    #[test]
    fn identifiers_with_digits_and_underscores() {
        assert_eq!(
            kinds("pl_rade2 * Earth_radius"),
            vec![
                TokenKind::Ident("pl_rade2".to_string()),
                TokenKind::Star,
                TokenKind::Ident("Earth_radius".to_string())
            ]
        );
    }

    #[test]
    fn rejects_unknown_characters_with_offset() {
        let err = tokenize("x + $y").unwrap_err();
        assert_eq!(
            err,
            ExprErrorKind::Syntax {
                offset: 4,
                message: "unexpected character `$`".to_string()
            }
        );
    }

    #[test]
    fn lone_dot_is_invalid_number() {
        assert!(matches!(tokenize("x + ."), Err(ExprErrorKind::Syntax { offset: 4, .. })));
    }
}
