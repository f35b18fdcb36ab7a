//! Recursive-descent formula parser
//!
//! Precedence, loosest first: comparison, `&`, `+ -`, `* /`, `^`, unary sign.

use super::lexer::{tokenize, BinaryOp, Token};
use super::ParseError;
use crate::reference::{name_to_column, CellRef, RangeRef};

/// Deepest expression tree a formula may build
///
/// Every parenthesis, function call, sign and chained operator adds a level.
const MAX_NESTING: usize = 128;

/// Parsed formula expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    Cell {
        sheet: Option<String>,
        cell: CellRef,
    },
    Range {
        sheet: Option<String>,
        range: RangeRef,
    },
    Name(String),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Parse formula text, with or without the leading `=`
pub(crate) fn parse_formula(text: &str) -> Result<Expr, ParseError> {
    let body = text.strip_prefix('=').unwrap_or(text);
    let tokens: Vec<Token> = tokenize(body)?.into_iter().map(|s| s.token).collect();
    if tokens.is_empty() {
        return Err(ParseError::new("empty formula"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::new(format!("unexpected {token:?}"))),
    }
}

/// Parse a cell token such as `A1`, `$b$7` (case-insensitive, `$` allowed)
pub(crate) fn parse_cell_token(text: &str) -> Option<CellRef> {
    let stripped = text.strip_prefix('$').unwrap_or(text);
    let split = stripped.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = stripped.split_at(split);
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let column = name_to_column(&letters.to_ascii_uppercase())?;
    let row = digits.parse().ok()?;
    CellRef::new(row, column)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(format!(
                "formula nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek_op(&self, ops: &[BinaryOp]) -> Option<BinaryOp> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[BinaryOp],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut lhs = next(self)?;
        let entered = self.depth;
        while let Some(op) = self.peek_op(ops) {
            self.pos += 1;
            self.descend()?;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        self.depth = entered;
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        use BinaryOp::{Eq, Ge, Gt, Le, Lt, Ne};
        self.binary_level(&[Eq, Ne, Lt, Gt, Le, Ge], Self::concat)
    }

    fn concat(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinaryOp::Concat], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinaryOp::Add, BinaryOp::Sub], Self::term)
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinaryOp::Mul, BinaryOp::Div], Self::power)
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinaryOp::Pow], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let Some(sign) = self.peek_op(&[BinaryOp::Add, BinaryOp::Sub]) else {
            return self.primary();
        };
        self.pos += 1;
        self.descend()?;
        let inner = self.unary()?;
        self.depth -= 1;
        if sign == BinaryOp::Sub {
            Ok(Expr::Negate(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.comparison()?;
                self.depth -= 1;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(ParseError::new("missing ')'"))
                }
            }
            Some(Token::QuotedName(sheet)) => {
                if !self.eat(&Token::Bang) {
                    return Err(ParseError::new(format!("expected '!' after '{sheet}'")));
                }
                self.reference(Some(sheet))
            }
            Some(Token::Ident(ident)) => self.identifier(ident),
            Some(token) => Err(ParseError::new(format!("unexpected {token:?}"))),
            None => Err(ParseError::new("unexpected end of formula")),
        }
    }

    fn identifier(&mut self, ident: String) -> Result<Expr, ParseError> {
        if self.eat(&Token::LParen) {
            return self.call(ident.to_ascii_uppercase());
        }
        if self.eat(&Token::Bang) {
            return self.reference(Some(ident));
        }
        if parse_cell_token(&ident).is_some() {
            self.pos -= 1;
            return self.reference(None);
        }
        if ident.eq_ignore_ascii_case("TRUE") {
            return Ok(Expr::Boolean(true));
        }
        if ident.eq_ignore_ascii_case("FALSE") {
            return Ok(Expr::Boolean(false));
        }
        Ok(Expr::Name(ident))
    }

    fn reference(&mut self, sheet: Option<String>) -> Result<Expr, ParseError> {
        let start = match self.next() {
            Some(Token::Ident(text)) => parse_cell_token(&text)
                .ok_or_else(|| ParseError::new(format!("invalid cell reference '{text}'")))?,
            _ => return Err(ParseError::new("expected a cell reference")),
        };
        if !self.eat(&Token::Colon) {
            return Ok(Expr::Cell { sheet, cell: start });
        }
        let end = match self.next() {
            Some(Token::Ident(text)) => parse_cell_token(&text)
                .ok_or_else(|| ParseError::new(format!("invalid cell reference '{text}'")))?,
            _ => return Err(ParseError::new("expected a cell reference after ':'")),
        };
        Ok(Expr::Range {
            sheet,
            range: RangeRef::new(start, end),
        })
    }

    fn call(&mut self, name: String) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(Expr::Call(name, args));
        }
        self.descend()?;
        loop {
            args.push(self.comparison()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::RParen) {
                self.depth -= 1;
                return Ok(Expr::Call(name, args));
            }
            return Err(ParseError::new(format!("expected ',' or ')' in {name}")));
        }
    }
}
