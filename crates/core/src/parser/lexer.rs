//! PDF tokenizer.
//!
//! Turns raw bytes into [`Token`]s. Indirect references (`N G R`) are
//! recognized here with a two-token lookahead, so the parser never sees the
//! three parts separately.

use crate::codec::ascii85::hex_nibble;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFObjRef;
use crate::utils::name_from_bytes;
use std::collections::VecDeque;

/// Bare words that are not numbers, names or delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    True,
    False,
    Null,
    Obj,
    EndObj,
    Stream,
    EndStream,
    R,
    /// PostScript `def`, tolerated between dictionary entries.
    Def,
    /// Any other word: content operators, `xref`, `trailer`, ...
    Other(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"true" => Self::True,
            b"false" => Self::False,
            b"null" => Self::Null,
            b"obj" => Self::Obj,
            b"endobj" => Self::EndObj,
            b"stream" => Self::Stream,
            b"endstream" => Self::EndStream,
            b"R" => Self::R,
            b"def" => Self::Def,
            other => Self::Other(other.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::True => b"true",
            Self::False => b"false",
            Self::Null => b"null",
            Self::Obj => b"obj",
            Self::EndObj => b"endobj",
            Self::Stream => b"stream",
            Self::EndStream => b"endstream",
            Self::R => b"R",
            Self::Def => b"def",
            Self::Other(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    /// Name without the leading slash, `#xx` escapes decoded.
    Name(String),
    /// Literal `( )` or hex `< >` string.
    String { bytes: Vec<u8>, hex: bool },
    DictStart,
    DictEnd,
    ArrayStart,
    ArrayEnd,
    Ref(PDFObjRef),
    /// Comment text after `%`, without the line ending.
    Comment(Vec<u8>),
    Keyword(Keyword),
}

impl Token {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Real(n) => n.to_string(),
            Self::Name(n) => format!("/{n}"),
            Self::String { .. } => "string".into(),
            Self::DictStart => "<<".into(),
            Self::DictEnd => ">>".into(),
            Self::ArrayStart => "[".into(),
            Self::ArrayEnd => "]".into(),
            Self::Ref(r) => r.to_string(),
            Self::Comment(_) => "comment".into(),
            Self::Keyword(k) => String::from_utf8_lossy(k.as_bytes()).into_owned(),
        }
    }
}

pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

pub(crate) const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

const fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// A scanned token with its start and end offsets.
type Spanned = (usize, usize, Token);

pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
    /// End of the token most recently handed out.
    consumed: usize,
    /// Tokens scanned ahead while looking for `N G R`.
    pending: VecDeque<Spanned>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            consumed: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Offset just past the last token returned.
    pub fn tell(&self) -> usize {
        self.consumed
    }

    /// Jump to `pos`, dropping any lookahead.
    pub fn set_pos(&mut self, pos: usize) {
        let pos = pos.min(self.data.len());
        self.pos = pos;
        self.consumed = pos;
        self.pending.clear();
    }

    /// Next token and its start offset, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Result<(usize, Token)>> {
        let (start, end, token) = match self.pending.pop_front() {
            Some(spanned) => spanned,
            None => match self.scan()? {
                Ok(spanned) => spanned,
                Err(err) => return Some(Err(err)),
            },
        };

        if let Token::Integer(objid) = token
            && let Some(reference) = self.lookahead_reference(objid)
        {
            let (_, r_end, _) = self.pending.pop_front()?;
            self.pending.pop_front();
            self.consumed = r_end;
            return Some(Ok((start, Token::Ref(reference))));
        }

        self.consumed = end;
        Some(Ok((start, token)))
    }

    /// With an integer just read, check whether the next two tokens are
    /// `G R`. On success both are left at the front of the queue with `R`
    /// first, so the caller pops `R` for its end offset.
    fn lookahead_reference(&mut self, objid: i64) -> Option<PDFObjRef> {
        let objid = u32::try_from(objid).ok()?;
        if !self.fill_pending(1) {
            return None;
        }
        let Token::Integer(genno) = self.pending[0].2 else {
            return None;
        };
        let genno = u16::try_from(genno).ok()?;
        if !self.fill_pending(2) || self.pending[1].2 != Token::Keyword(Keyword::R) {
            return None;
        }
        self.pending.swap(0, 1);
        Some(PDFObjRef::new(objid, genno))
    }

    /// Scan until `count` tokens are queued. Scan errors are left for the
    /// regular path to report.
    fn fill_pending(&mut self, count: usize) -> bool {
        while self.pending.len() < count {
            let before = self.pos;
            match self.scan() {
                Some(Ok(spanned)) => self.pending.push_back(spanned),
                Some(Err(_)) => {
                    self.pos = before;
                    return false;
                }
                None => return false,
            }
        }
        true
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !is_whitespace(b) {
                return;
            }
            self.pos += 1;
        }
    }

    fn scan(&mut self) -> Option<Result<Spanned>> {
        self.skip_whitespace();
        let start = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'%' => Ok(self.scan_comment()),
            b'/' => Ok(self.scan_name()),
            b'(' => self.scan_literal_string(),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Ok(Token::DictStart)
            }
            b'<' => self.scan_hex_string(),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Ok(Token::DictEnd)
            }
            b'>' | b')' => {
                self.pos += 1;
                Err(PdfError::TokenError {
                    pos: start,
                    msg: format!("unexpected '{}'", b as char),
                })
            }
            b'[' => {
                self.pos += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.pos += 1;
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' => {
                self.pos += 1;
                Ok(Token::Keyword(Keyword::Other(vec![b])))
            }
            b'+' | b'-' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') => {
                self.scan_number()
            }
            b'.' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => self.scan_number(),
            c if c.is_ascii_digit() => self.scan_number(),
            _ => Ok(self.scan_keyword()),
        };

        Some(result.map(|token| (start, self.pos, token)))
    }

    fn scan_comment(&mut self) -> Token {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'\r' || b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        Token::Comment(self.data[start..self.pos].to_vec())
    }

    fn scan_name(&mut self) -> Token {
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let escaped = self
                    .peek()
                    .and_then(hex_nibble)
                    .zip(self.peek_at(1).and_then(hex_nibble));
                if let Some((high, low)) = escaped {
                    self.pos += 2;
                    name.push((high << 4) | low);
                }
                // an invalid escape drops the '#'
                continue;
            }
            name.push(b);
        }
        Token::Name(name_from_bytes(name))
    }

    fn scan_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;
        let invalid = || PdfError::TokenError {
            pos: start,
            msg: format!("invalid number: {text}"),
        };

        if !has_dot && let Ok(value) = text.parse::<i64>() {
            return Ok(Token::Integer(value));
        }
        // out-of-range integers degrade to reals
        let text = text.strip_suffix('.').unwrap_or(text);
        let text = if text.is_empty() || text == "-" || text == "+" { "0" } else { text };
        text.parse::<f64>().map(Token::Real).map_err(|_| invalid())
    }

    fn scan_literal_string(&mut self) -> Result<Token> {
        self.pos += 1;
        let mut bytes = Vec::new();
        let mut depth = 1usize;

        loop {
            let b = self.peek().ok_or(PdfError::UnexpectedEof)?;
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    bytes.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    bytes.push(b);
                }
                b'\\' => {
                    let escaped = self.peek().ok_or(PdfError::UnexpectedEof)?;
                    self.pos += 1;
                    match escaped {
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0c),
                        b'\r' => {
                            // line continuation
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        self.pos += 1;
                                        value = value * 8 + u32::from(d - b'0');
                                    }
                                    _ => break,
                                }
                            }
                            bytes.push((value & 0xFF) as u8);
                        }
                        // unknown escapes keep the character
                        other => bytes.push(other),
                    }
                }
                other => bytes.push(other),
            }
        }

        Ok(Token::String { bytes, hex: false })
    }

    fn scan_hex_string(&mut self) -> Result<Token> {
        self.pos += 1;
        let mut bytes = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let b = self.peek().ok_or(PdfError::UnexpectedEof)?;
            if b == b'>' {
                self.pos += 1;
                break;
            }
            if is_whitespace(b) {
                self.pos += 1;
                continue;
            }
            let nibble = hex_nibble(b).ok_or_else(|| PdfError::TokenError {
                pos: self.pos,
                msg: format!("invalid hex digit {:?}", b as char),
            })?;
            self.pos += 1;
            match pending.take() {
                Some(high) => bytes.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }

        if let Some(high) = pending {
            bytes.push(high << 4);
        }

        Ok(Token::String { bytes, hex: true })
    }

    fn scan_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
        }
        Token::Keyword(Keyword::from_bytes(&self.data[start..self.pos]))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<(usize, Token)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
