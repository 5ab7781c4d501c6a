//! Safe decoder for the textual data-literal encoding the matches endpoint
//! sometimes uses for nested maps (`{'3439844': {'1001': {'goals': '2'}}}`).
//!
//! Closed grammar, nothing is ever evaluated:
//!   value  := dict | list | tuple | string | number | True | False | None
//!   dict   := '{' [ key ':' value { ',' key ':' value } [','] ] '}'
//!   list   := '[' [ value { ',' value } [','] ] ']'
//!   tuple  := '(' [ value { ',' value } [','] ] ')'
//!
//! Dict keys must be scalars and are stringified. Tuples decode to arrays.
//! Anything else (names, calls, sets, byte strings, nan/inf) is rejected.

use serde_json::{Map, Number, Value};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character {found:?} at byte {pos}")]
    Unexpected { found: char, pos: usize },

    #[error("invalid number {text:?} at byte {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("invalid escape sequence at byte {pos}")]
    InvalidEscape { pos: usize },

    #[error("unsupported token {token:?} at byte {pos}")]
    Unsupported { token: String, pos: usize },

    #[error("nesting deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("trailing input at byte {pos}")]
    Trailing { pos: usize },
}

pub type Result<T> = std::result::Result<T, LiteralError>;

/// Decode one data literal into a JSON value. Whole input must be consumed.
pub fn parse_literal(text: &str) -> Result<Value> {
    let mut p = Parser::new(text);
    let value = p.value()?;
    p.skip_ws();
    match p.chars.peek() {
        None => Ok(value),
        Some(&(pos, _)) => Err(LiteralError::Trailing { pos }),
    }
}

struct Parser<'a> {
    src:   &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, chars: src.char_indices().peekable(), depth: 0 }
    }

    fn pos(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.src.len())
    }

    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Result<(usize, char)> {
        self.chars.next().ok_or(LiteralError::UnexpectedEnd)
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_ws();
        match self.bump()? {
            (_, c) if c == want => Ok(()),
            (pos, found) => Err(LiteralError::Unexpected { found, pos }),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        Ok(())
    }

    fn value(&mut self) -> Result<Value> {
        self.skip_ws();
        let (pos, c) = match self.chars.peek() {
            Some(&pc) => pc,
            None => return Err(LiteralError::UnexpectedEnd),
        };

        match c {
            '{' => self.dict(),
            '[' => self.sequence('[', ']').map(|(items, _)| Value::Array(items)),
            '(' => self.tuple(),
            '\'' | '"' => self.strings().map(Value::String),
            '0'..='9' | '-' | '+' | '.' => self.number(),
            c if c.is_alphabetic() || c == '_' => self.word(),
            found => Err(LiteralError::Unexpected { found, pos }),
        }
    }

    fn dict(&mut self) -> Result<Value> {
        self.enter()?;
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_ws();
            if self.peek_char() == Some('}') {
                self.chars.next();
                break;
            }

            let key_pos = self.pos();
            let key = self.value()?;
            self.skip_ws();
            match self.bump()? {
                (_, ':') => {}
                (_, ',') | (_, '}') => {
                    return Err(LiteralError::Unsupported { token: "set".into(), pos: key_pos });
                }
                (pos, found) => return Err(LiteralError::Unexpected { found, pos }),
            }

            let key = scalar_key(key, key_pos)?;
            let value = self.value()?;
            // Duplicate keys: last one wins, same as the literal's own semantics.
            map.insert(key, value);

            self.skip_ws();
            match self.bump()? {
                (_, ',') => continue,
                (_, '}') => break,
                (pos, found) => return Err(LiteralError::Unexpected { found, pos }),
            }
        }

        self.depth -= 1;
        Ok(Value::Object(map))
    }

    /// Returns the items and whether a trailing comma followed the last item.
    fn sequence(&mut self, open: char, close: char) -> Result<(Vec<Value>, bool)> {
        self.enter()?;
        self.expect(open)?;
        let mut items = Vec::new();
        let mut trailing_comma = false;

        loop {
            self.skip_ws();
            if self.peek_char() == Some(close) {
                self.chars.next();
                break;
            }

            items.push(self.value()?);
            trailing_comma = false;

            self.skip_ws();
            match self.bump()? {
                (_, ',') => trailing_comma = true,
                (_, c) if c == close => break,
                (pos, found) => return Err(LiteralError::Unexpected { found, pos }),
            }
        }

        self.depth -= 1;
        Ok((items, trailing_comma))
    }

    fn tuple(&mut self) -> Result<Value> {
        let (mut items, trailing_comma) = self.sequence('(', ')')?;
        // `(x)` is just a parenthesised value, `(x,)` is a one-tuple
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<String> {
        let mut out = self.string()?;
        loop {
            self.skip_ws();
            match self.peek_char() {
                Some('\'') | Some('"') => out.push_str(&self.string()?),
                _ => return Ok(out),
            }
        }
    }

    fn string(&mut self) -> Result<String> {
        let (_, quote) = self.bump()?;
        let mut out = String::new();

        loop {
            let (pos, c) = self.bump()?;
            match c {
                c if c == quote => return Ok(out),
                '\n' | '\r' => return Err(LiteralError::Unexpected { found: c, pos }),
                '\\' => self.escape(pos, &mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, start: usize, out: &mut String) -> Result<()> {
        let (_, c) = self.bump()?;
        match c {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"'  => out.push('"'),
            'n'  => out.push('\n'),
            'r'  => out.push('\r'),
            't'  => out.push('\t'),
            'a'  => out.push('\u{07}'),
            'b'  => out.push('\u{08}'),
            'f'  => out.push('\u{0c}'),
            'v'  => out.push('\u{0b}'),
            '\n' => {} // line continuation
            'x'  => out.push(self.hex_escape(start, 2)?),
            'u'  => out.push(self.hex_escape(start, 4)?),
            'U'  => out.push(self.hex_escape(start, 8)?),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek_char().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).ok_or(LiteralError::InvalidEscape { pos: start })?);
            }
            // Unknown escapes keep the backslash
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, start: usize, len: usize) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..len {
            let digit = self
                .chars
                .next()
                .and_then(|(_, d)| d.to_digit(16))
                .ok_or(LiteralError::InvalidEscape { pos: start })?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape { pos: start })
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos();
        let mut text = String::new();

        if let Some(sign @ ('-' | '+')) = self.peek_char() {
            text.push(sign);
            self.chars.next();
            self.skip_ws();
        }

        let mut prev = ' ';
        while let Some(c) = self.peek_char() {
            let exponent_sign = (c == '-' || c == '+') && (prev == 'e' || prev == 'E');
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                text.push(c);
                prev = c;
                self.chars.next();
            } else {
                break;
            }
        }

        let invalid = || LiteralError::InvalidNumber { text: text.clone(), pos: start };
        let digits: String = text.chars().filter(|&c| c != '_').collect();
        let body = digits.trim_start_matches(['-', '+']);
        if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            return Err(invalid());
        }
        // Hex/octal/binary and complex literals are outside the grammar
        if body.contains(['x', 'X', 'o', 'O', 'b', 'B', 'j', 'J']) {
            return Err(invalid());
        }

        if body.contains(['.', 'e', 'E']) {
            let f: f64 = digits.parse().map_err(|_| invalid())?;
            return Number::from_f64(f).map(Value::Number).ok_or_else(invalid);
        }

        if let Ok(i) = digits.parse::<i64>() {
            return Ok(Value::from(i));
        }
        if let Ok(u) = digits.trim_start_matches('+').parse::<u64>() {
            return Ok(Value::from(u));
        }
        Err(invalid())
    }

    fn word(&mut self) -> Result<Value> {
        let start = self.pos();
        let mut token = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                token.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        match token.as_str() {
            "True"  => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None"  => Ok(Value::Null),
            // u'' prefix is a no-op, b''/r''/f'' are not data
            "u" | "U" if matches!(self.peek_char(), Some('\'') | Some('"')) => {
                self.strings().map(Value::String)
            }
            _ => Err(LiteralError::Unsupported { token, pos: start }),
        }
    }
}

fn scalar_key(key: Value, pos: usize) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".into()),
        Value::Bool(false) => Ok("False".into()),
        Value::Null => Ok("None".into()),
        Value::Array(_) | Value::Object(_) => {
            Err(LiteralError::Unsupported { token: "unhashable key".into(), pos })
        }
    }
}
