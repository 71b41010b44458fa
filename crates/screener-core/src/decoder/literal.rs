//! Parser for a small subset of tuple/list literal syntax.
//!
//! Supports quoted strings (single or double quotes, backslash escapes,
//! adjacent-string concatenation), integers, floats, lists, tuples, `None`,
//! `True` and `False`. Nothing is evaluated; anything else is an error.

use std::fmt;
use thiserror::Error;

/// Maximum nesting of lists/tuples before the parser gives up.
const MAX_DEPTH: usize = 32;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
}

impl Literal {
    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::None => "None",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
        }
    }

    /// Elements of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_sequence() {
            Some(items) => write!(f, "{} of {}", self.kind(), items.len()),
            None => f.write_str(self.kind()),
        }
    }
}

/// A syntax error with its byte offset.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("at byte {pos}: {message}")]
pub struct LiteralError {
    pub pos: usize,
    pub message: String,
}

/// Parse one literal from the start of `src`.
///
/// Returns the value and the number of bytes consumed. Trailing text after
/// the literal is left untouched.
pub fn parse_prefix(src: &str) -> Result<(Literal, usize), LiteralError> {
    let mut parser = Parser { src, pos: 0 };
    let value = parser.value(0)?;
    Ok((value, parser.pos))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, LiteralError> {
        Err(LiteralError {
            pos: self.pos,
            message: message.into(),
        })
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.skip_ws();
        let value = match self.peek() {
            None => return self.error("unexpected end of input"),
            Some('"') | Some('\'') => self.strings()?,
            Some('[') => Literal::List(self.sequence('[', ']', depth)?.0),
            Some('(') => {
                let (items, trailing_comma) = self.sequence('(', ')', depth)?;
                // `(x)` is just a parenthesized value; `(x,)` is a tuple.
                if items.len() == 1 && !trailing_comma {
                    items.into_iter().next().unwrap_or(Literal::None)
                } else {
                    Literal::Tuple(items)
                }
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number()?,
            Some(c) if c.is_ascii_alphabetic() => self.keyword()?,
            Some(c) => return self.error(format!("unexpected character '{}'", c)),
        };
        self.skip_ws();
        Ok(value)
    }

    fn sequence(
        &mut self,
        open: char,
        close: char,
        depth: usize,
    ) -> Result<(Vec<Literal>, bool), LiteralError> {
        if depth >= MAX_DEPTH {
            return self.error("nesting too deep");
        }
        self.bump(); // open
        let mut items = Vec::new();
        let mut trailing_comma = false;

        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.bump();
                    return Ok((items, trailing_comma));
                }
                None => return self.error(format!("unclosed '{}'", open)),
                _ => {}
            }

            items.push(self.value(depth + 1)?);
            trailing_comma = false;

            match self.peek() {
                Some(',') => {
                    self.bump();
                    trailing_comma = true;
                }
                Some(c) if c == close => {}
                Some(c) => return self.error(format!("expected ',' or '{}', found '{}'", close, c)),
                None => return self.error(format!("unclosed '{}'", open)),
            }
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('"') | Some('\'')) {
                out.push_str(&self.string()?);
            } else {
                self.pos = save;
                return Ok(Literal::Str(out));
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = match self.bump() {
            Some(q) => q,
            None => return self.error("expected string"),
        };
        let mut out = String::new();

        loop {
            match self.bump() {
                None => return self.error("unterminated string"),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            None => return self.error("unterminated escape"),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {} // line continuation
            Some('x') => out.push(self.hex_escape(2)?),
            Some('u') => out.push(self.hex_escape(4)?),
            Some('U') => out.push(self.hex_escape(8)?),
            // Unknown escapes keep their backslash
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let start = self.pos;
        for _ in 0..digits {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return self.error("invalid hex escape"),
            }
        }
        u32::from_str_radix(&self.src[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .map_or_else(|| self.error("invalid code point"), Ok)
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }

        let mut is_float = false;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == '.' && !is_float {
                is_float = true;
            } else if (c == 'e' || c == 'E') && digits > 0 {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('-') | Some('+')) {
                    self.bump();
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }

        if digits == 0 {
            self.pos = start;
            return self.error("expected number");
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(Literal::Float)
                .or_else(|_| self.error(format!("invalid float '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Literal::Int)
                .or_else(|_| self.error(format!("invalid integer '{}'", text)))
        }
    }

    fn keyword(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            word => {
                let word = word.to_string();
                self.pos = start;
                self.error(format!("unexpected identifier '{}'", word))
            }
        }
    }
}
