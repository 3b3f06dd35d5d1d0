//! Tokenizer for binding expressions.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Str(s) => format!("{s:?}"),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Punct(p) => (*p).to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

// Longest first, so "===" wins over "==" and "=".
const PUNCTUATION: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "{", "}", "(", ")", "[", "]", ",", ":",
    ";", ".", "?", "=", "!", "<", ">", "+", "-", "*", "/", "%",
];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '/' && chars.get(i + 1).map(|&(_, n)| n) == Some('/') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|&(_, n)| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                i += 1;
                if i < chars.len() && matches!(chars[i].1, '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedChar { ch: c, offset })?;
            tokens.push(Token {
                kind: TokenKind::Number(number),
                offset,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            let mut closed = false;
            while i < chars.len() {
                let ch = chars[i].1;
                if ch == quote {
                    closed = true;
                    i += 1;
                    break;
                }
                if ch == '\\' && i + 1 < chars.len() {
                    i += 1;
                    text.push(match chars[i].1 {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                } else {
                    text.push(ch);
                }
                i += 1;
            }
            if !closed {
                return Err(ExprError::UnterminatedString { offset });
            }
            tokens.push(Token {
                kind: TokenKind::Str(text),
                offset,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i].1) {
                i += 1;
            }
            let name: String = chars[start..i].iter().map(|&(_, ch)| ch).collect();
            tokens.push(Token {
                kind: TokenKind::Ident(name),
                offset,
            });
            continue;
        }

        let rest = &source[offset..];
        match PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                tokens.push(Token {
                    kind: TokenKind::Punct(*p),
                    offset,
                });
                i += p.len();
            }
            None => return Err(ExprError::UnexpectedChar { ch: c, offset }),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_operators_longest_first() {
        assert_eq!(
            kinds("a===b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("==="),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_strings_with_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a,b""#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a,b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_numbers() {
        assert_eq!(
            kinds("1.5e2 .5"),
            vec![TokenKind::Number(150.0), TokenKind::Number(0.5), TokenKind::Eof]
        );
    }

    #[test]
    fn reports_unterminated_string() {
        assert_eq!(
            tokenize("'abc"),
            Err(ExprError::UnterminatedString { offset: 0 })
        );
    }

    #[test]
    fn reports_unexpected_character() {
        assert_eq!(
            tokenize("a # b"),
            Err(ExprError::UnexpectedChar { ch: '#', offset: 2 })
        );
    }
}
