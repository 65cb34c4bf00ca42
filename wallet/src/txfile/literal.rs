// SPDX-License-Identifier: CC0-1.0

//! Reader and writer for the ASCII literal notation used by the inputs and
//! outputs lines of transaction files.
//!
//! The notation is a small subset of Python's literal syntax: lists, dicts
//! with string keys, strings, integers, `True`, `False` and `None`. Strings
//! are written in pure ASCII with `\xNN`, `\uNNNN` and `\UNNNNNNNN` escapes.
//! Files from older releases wrap some values in a constructor call such as
//! `CoinAddr('1abc')`; the reader unwraps these.

use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Literal>),
    Dict(Vec<(String, Literal)>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{msg} at position {pos}")]
pub struct LiteralError {
    pub pos: usize,
    pub msg: String,
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Literal::None)
    }

    /// Parses one literal spanning the whole input.
    pub fn parse(s: &str) -> Result<Literal, LiteralError> {
        let mut p = Parser {
            chars: s.chars().collect(),
            pos: 0,
        };
        let value = p.value()?;
        p.skip_ws();
        if p.pos != p.chars.len() {
            return Err(p.err("unexpected trailing characters"));
        }
        Ok(value)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn err(&self, msg: &str) -> LiteralError {
        LiteralError {
            pos: self.pos,
            msg: msg.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.next() {
            Some(c) if c == want => Ok(()),
            _ => Err(self.err(&format!("expected '{}'", want))),
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.list(),
            Some('{') => self.dict(),
            Some('\'' | '"') => self.string().map(Literal::Str),
            Some(c) if c == '-' || c.is_ascii_digit() => self.int(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.ident(),
            Some(_) => Err(self.err("unexpected character")),
            None => Err(self.err("unexpected end of data")),
        }
    }

    /// Comma-separated items up to `close`, allowing a trailing comma.
    fn items<T>(
        &mut self,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<T, LiteralError>,
    ) -> Result<Vec<T>, LiteralError> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(out);
            }
            out.push(item(self)?);
            self.skip_ws();
            match self.next() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(out),
                _ => return Err(self.err(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn list(&mut self) -> Result<Literal, LiteralError> {
        self.expect('[')?;
        self.items(']', Parser::value).map(Literal::List)
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.expect('{')?;
        self.items('}', |p| {
            p.skip_ws();
            let key = match p.value()? {
                Literal::Str(k) => k,
                _ => return Err(p.err("dict keys must be strings")),
            };
            p.expect(':')?;
            Ok((key, p.value()?))
        })
        .map(Literal::Dict)
    }

    fn int(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let s: String = self.chars[start..self.pos].iter().collect();
        s.parse().map(Literal::Int).map_err(|_| LiteralError {
            pos: start,
            msg: format!("invalid integer '{}'", s),
        })
    }

    fn ident(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.skip_ws();
        if self.peek() == Some('(') {
            // Old-format value wrapped in a type constructor.
            self.pos += 1;
            let inner = self.value()?;
            self.expect(')')?;
            return Ok(inner);
        }
        match name.as_str() {
            "None" => Ok(Literal::None),
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            _ => Err(LiteralError {
                pos: start,
                msg: format!("unknown name '{}'", name),
            }),
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let start = self.pos;
        let mut n: u32 = 0;
        for _ in 0..digits {
            let d = self.next().and_then(|c| c.to_digit(16)).ok_or_else(|| self.err("truncated escape"))?;
            n = n * 16 + d;
        }
        char::from_u32(n).ok_or(LiteralError {
            pos: start,
            msg: format!("invalid code point {:#x}", n),
        })
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let quote = self.next().ok_or_else(|| self.err("unexpected end of data"))?;
        let mut out = String::new();
        loop {
            let c = self.next().ok_or_else(|| self.err("unterminated string"))?;
            match c {
                c if c == quote => return Ok(out),
                '\n' => return Err(self.err("newline in string")),
                '\\' => {
                    let e = self.next().ok_or_else(|| self.err("unterminated string"))?;
                    let decoded = match e {
                        '\\' | '\'' | '"' => e,
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        '0' => '\0',
                        'x' => self.hex_escape(2)?,
                        'u' => self.hex_escape(4)?,
                        'U' => self.hex_escape(8)?,
                        _ => return Err(self.err(&format!("unknown escape '\\{}'", e))),
                    };
                    out.push(decoded);
                }
                c => out.push(c),
            }
        }
    }
}

/// Writes `s` as a quoted ASCII string literal.
pub fn write_str(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_ascii() => f.write_char(c)?,
            c if (c as u32) < 0x100 => write!(f, "\\x{:02x}", c as u32)?,
            c if (c as u32) < 0x10000 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "\\U{:08x}", c as u32)?,
        }
    }
    f.write_char(quote)
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Str(s) => write_str(f, s),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Literal::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_str(f, k)?;
                    write!(f, ": {}", v)?;
                }
                f.write_str("}")
            }
        }
    }
}
