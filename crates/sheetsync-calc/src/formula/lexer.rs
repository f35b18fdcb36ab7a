//! Formula tokenizer

use std::ops::Range;

use super::ParseError;

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    QuotedName(String),
    Op(BinaryOp),
    Bang,
    Colon,
    Comma,
    LParen,
    RParen,
}

/// A token and the byte span it came from
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    pub(crate) span: Range<usize>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

/// Split formula body (text after `=`) into tokens
pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '0'..='9' | '.' => {
                let end = number_end(src, start);
                let text = &src[start..end];
                let n = text
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ParseError::new(format!("invalid number '{text}'")))?;
                while chars.peek().is_some_and(|&(i, _)| i < end) {
                    chars.next();
                }
                tokens.push(Spanned { token: Token::Number(n), span: start..end });
                continue;
            }
            '"' => {
                chars.next();
                let (text, end) = quoted(&mut chars, '"', src.len())
                    .ok_or_else(|| ParseError::new("unterminated string"))?;
                tokens.push(Spanned { token: Token::Text(text), span: start..end });
                continue;
            }
            '\'' => {
                chars.next();
                let (text, end) = quoted(&mut chars, '\'', src.len())
                    .ok_or_else(|| ParseError::new("unterminated sheet name"))?;
                tokens.push(Spanned { token: Token::QuotedName(text), span: start..end });
                continue;
            }
            c if is_ident_start(c) => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if !is_ident_char(ch) {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push(Spanned {
                    token: Token::Ident(src[start..end].to_string()),
                    span: start..end,
                });
                continue;
            }
            '+' => Token::Op(BinaryOp::Add),
            '-' => Token::Op(BinaryOp::Sub),
            '*' => Token::Op(BinaryOp::Mul),
            '/' => Token::Op(BinaryOp::Div),
            '^' => Token::Op(BinaryOp::Pow),
            '&' => Token::Op(BinaryOp::Concat),
            '=' => Token::Op(BinaryOp::Eq),
            '!' => Token::Bang,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '<' | '>' => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                let (op, len) = match (c, next) {
                    ('<', Some('=')) => (BinaryOp::Le, 2),
                    ('<', Some('>')) => (BinaryOp::Ne, 2),
                    ('>', Some('=')) => (BinaryOp::Ge, 2),
                    ('<', _) => (BinaryOp::Lt, 1),
                    _ => (BinaryOp::Gt, 1),
                };
                if len == 2 {
                    chars.next();
                }
                tokens.push(Spanned { token: Token::Op(op), span: start..start + len });
                continue;
            }
            other => return Err(ParseError::new(format!("unexpected character '{other}'"))),
        };

        chars.next();
        tokens.push(Spanned { token, span: start..start + c.len_utf8() });
    }

    Ok(tokens)
}

fn number_end(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// Read a quoted run after the opening quote; a doubled quote is a literal quote
fn quoted(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    len: usize,
) -> Option<(String, usize)> {
    let mut text = String::new();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            if chars.peek().is_some_and(|&(_, n)| n == quote) {
                chars.next();
                text.push(quote);
                continue;
            }
            return Some((text, (i + 1).min(len)));
        }
        text.push(c);
    }
    None
}

/// Render a sheet name the way it must appear in a formula prefix
pub(crate) fn quote_sheet_name(name: &str) -> String {
    let bare = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && super::parser::parse_cell_token(name).is_none();
    if bare {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Rewrite every `old!` sheet prefix in a formula to `new!`
///
/// Returns `None` when the formula has no prefix naming `old` or does not
/// tokenize, in which case it should be left untouched.
pub(crate) fn rename_sheet_prefixes(formula: &str, old: &str, new: &str) -> Option<String> {
    let body = formula.strip_prefix('=')?;
    let tokens = tokenize(body).ok()?;

    let mut out = String::with_capacity(formula.len());
    out.push('=');
    let mut cursor = 0;
    let mut replaced = false;

    for pair in tokens.windows(2) {
        let name = match &pair[0].token {
            Token::Ident(name) | Token::QuotedName(name) => name,
            _ => continue,
        };
        if pair[1].token == Token::Bang && name.eq_ignore_ascii_case(old) {
            out.push_str(&body[cursor..pair[0].span.start]);
            out.push_str(&quote_sheet_name(new));
            cursor = pair[0].span.end;
            replaced = true;
        }
    }

    if !replaced {
        return None;
    }
    out.push_str(&body[cursor..]);
    Some(out)
}
