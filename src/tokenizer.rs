//! Lexes PDF syntax from a byte slice into a stream of tokens. Each
//! primitive scan (`scan_name`, `scan_literal_string`, `scan_number_or_keyword`,
//! ...) is a hand-written byte-index loop over the input slice; the
//! token boundary itself (an explicit `Token` enum with a `next_token`
//! pull method) keeps lexing and parsing as separate stages rather than
//! one inlined grammar.

use crate::error::{ParseError, Result};
use crate::object::StringFormat;

pub const WHITESPACE: &[u8] = b"\0\t\n\x0c\r ";
pub const DELIMITERS: &[u8] = b"()<>[]{}/%";

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    WHITESPACE.contains(&b)
}

#[inline]
pub fn is_delimiter(b: u8) -> bool {
    DELIMITERS.contains(&b)
}

#[inline]
fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Vec<u8>),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Integer(i64),
    Real(f64),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    StreamKeyword,
    EndOfInput,
}

pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer { input, pos: 0 }
    }

    pub fn at(input: &'a [u8], pos: usize) -> Self {
        Tokenizer { input, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn source(&self) -> &'a [u8] {
        self.input
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(b) if is_whitespace(b)) {
                self.pos += 1;
            }
            if self.peek() == Some(b'%') {
                while let Some(b) = self.peek() {
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(Token::EndOfInput);
        };

        match b {
            b'/' => {
                self.pos += 1;
                Ok(Token::Name(self.scan_name()))
            }
            b'(' => self.scan_literal_string(start),
            b'<' => {
                if self.input.get(self.pos + 1) == Some(&b'<') {
                    self.pos += 2;
                    Ok(Token::DictStart)
                } else {
                    self.scan_hex_string(start)
                }
            }
            b'>' => {
                if self.input.get(self.pos + 1) == Some(&b'>') {
                    self.pos += 2;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::MalformedInput { offset: start, reason: "stray '>'".into() }.into())
                }
            }
            b'[' => {
                self.pos += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.pos += 1;
                Ok(Token::ArrayEnd)
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.scan_number_or_keyword(start),
            _ if is_regular(b) => self.scan_keyword(start),
            _ => Err(ParseError::MalformedInput { offset: start, reason: format!("unexpected byte 0x{b:02x}") }.into()),
        }
    }

    fn scan_name(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            if b == b'#' {
                if let (Some(h1), Some(h2)) =
                    (self.input.get(self.pos + 1).copied(), self.input.get(self.pos + 2).copied())
                {
                    if let (Some(n1), Some(n2)) = (hex_digit(h1), hex_digit(h2)) {
                        out.push(n1 * 16 + n2);
                        self.pos += 3;
                        continue;
                    }
                }
            }
            out.push(b);
            self.pos += 1;
        }
        out
    }

    fn scan_literal_string(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // consume '('
        let mut depth = 1usize;
        let mut out = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return Err(ParseError::MalformedInput { offset: start, reason: "unterminated literal string".into() }
                    .into());
            };
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(esc) = self.bump() else {
                        return Err(ParseError::MalformedInput {
                            offset: start,
                            reason: "unterminated escape".into(),
                        }
                        .into());
                    };
                    match esc {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'(' => out.push(b'('),
                        b')' => out.push(b')'),
                        b'\\' => out.push(b'\\'),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = (esc - b'0') as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + (d - b'0') as u32;
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xff) as u8);
                        }
                        other => out.push(other),
                    }
                }
                other => out.push(other),
            }
        }
        Ok(Token::String(out, StringFormat::Literal))
    }

    fn scan_hex_string(&mut self, start: usize) -> Result<Token> {
        self.pos += 1; // consume '<'
        let mut nibbles = Vec::new();
        loop {
            let Some(b) = self.bump() else {
                return Err(
                    ParseError::MalformedInput { offset: start, reason: "unterminated hex string".into() }.into()
                );
            };
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            match hex_digit(b) {
                Some(n) => nibbles.push(n),
                None => {
                    return Err(ParseError::MalformedInput {
                        offset: start,
                        reason: format!("invalid hex digit '{}'", b as char),
                    }
                    .into())
                }
            }
        }
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }
        let bytes = nibbles.chunks_exact(2).map(|c| c[0] * 16 + c[1]).collect();
        Ok(Token::String(bytes, StringFormat::Hexadecimal))
    }

    fn scan_number_or_keyword(&mut self, start: usize) -> Result<Token> {
        let text_start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut is_real = false;
        let mut has_digits = false;
        loop {
            match self.peek() {
                Some(b'0'..=b'9') => {
                    has_digits = true;
                    self.pos += 1;
                }
                Some(b'.') => {
                    is_real = true;
                    self.pos += 1;
                }
                Some(b) if is_regular(b) => {
                    // a non-numeric regular byte appeared: this wasn't a number at all
                    return self.scan_keyword(start);
                }
                _ => break,
            }
        }
        if !has_digits && !is_real {
            return self.scan_keyword(start);
        }
        let text = std::str::from_utf8(&self.input[text_start..self.pos])
            .map_err(|_| ParseError::MalformedInput { offset: start, reason: "non-UTF8 number".into() })?;
        if !is_real {
            match text.parse::<i64>() {
                Ok(i) => Ok(Token::Integer(i)),
                Err(_) => Ok(Token::Real(text.parse::<f64>().unwrap_or(0.0))),
            }
        } else {
            let normalized = if text.starts_with('.') {
                format!("0{text}")
            } else if text.starts_with("-.") {
                format!("-0{}", &text[1..])
            } else {
                text.to_string()
            };
            Ok(Token::Real(normalized.parse::<f64>().unwrap_or(0.0)))
        }
    }

    fn scan_keyword(&mut self, start: usize) -> Result<Token> {
        let text_start = start;
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == text_start {
            let b = self.bump().unwrap();
            return Err(ParseError::MalformedInput { offset: start, reason: format!("stray byte 0x{b:02x}") }.into());
        }
        let word = self.input[text_start..self.pos].to_vec();
        if word == b"stream" {
            Ok(Token::StreamKeyword)
        } else {
            Ok(Token::Keyword(word))
        }
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_literal_string_escapes() {
        let mut t = Tokenizer::new(b"(a\\(b\\)c\\101)");
        let tok = t.next_token().unwrap();
        assert_eq!(tok, Token::String(b"a(b)cA".to_vec(), StringFormat::Literal));
    }

    #[test]
    fn lexes_hex_string_with_odd_nibble() {
        let mut t = Tokenizer::new(b"<48656C6C6F2>");
        let tok = t.next_token().unwrap();
        assert_eq!(tok, Token::String(b"Hello ".to_vec(), StringFormat::Hexadecimal));
    }

    #[test]
    fn lexes_numbers() {
        let mut t = Tokenizer::new(b"12 -3.5 .25 +7");
        assert_eq!(t.next_token().unwrap(), Token::Integer(12));
        assert_eq!(t.next_token().unwrap(), Token::Real(-3.5));
        assert_eq!(t.next_token().unwrap(), Token::Real(0.25));
        assert_eq!(t.next_token().unwrap(), Token::Integer(7));
    }

    #[test]
    fn lexes_name_with_hex_escape() {
        let mut t = Tokenizer::new(b"/Name#20With#20Space");
        assert_eq!(t.next_token().unwrap(), Token::Name(b"Name With Space".to_vec()));
    }

    #[test]
    fn lexes_dict_and_array_delimiters() {
        let mut t = Tokenizer::new(b"<< [ ] >>");
        assert_eq!(t.next_token().unwrap(), Token::DictStart);
        assert_eq!(t.next_token().unwrap(), Token::ArrayStart);
        assert_eq!(t.next_token().unwrap(), Token::ArrayEnd);
        assert_eq!(t.next_token().unwrap(), Token::DictEnd);
    }

    #[test]
    fn skips_comments() {
        let mut t = Tokenizer::new(b"% a comment\n42");
        assert_eq!(t.next_token().unwrap(), Token::Integer(42));
    }

    #[test]
    fn unterminated_string_is_malformed() {
        let mut t = Tokenizer::new(b"(abc");
        assert!(t.next_token().is_err());
    }

    #[test]
    fn sign_falls_back_into_keyword_text() {
        let mut t = Tokenizer::new(b"-foo");
        assert_eq!(t.next_token().unwrap(), Token::Keyword(b"-foo".to_vec()));
    }
}
