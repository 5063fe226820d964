//! PDF object parser - builds values from lexer tokens.
//!
//! Recursive descent over [`Lexer`] tokens. Closing delimiters and bare
//! operators travel through the parser as [`Item`] sentinels, so every
//! container can reject the ones it does not expect.

use crate::error::{PdfError, Result};
use crate::model::array::PDFArray;
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{IdAllocator, PDFObjRef, PDFObject, PDFValue};
use crate::model::stream::PDFStream;
use crate::model::string::PDFString;
use crate::parser::lexer::{Keyword, Lexer, Token, is_delimiter, is_whitespace};
use bytes::Bytes;
use tracing::{debug, warn};

const ENDSTREAM: &[u8] = b"endstream";

/// Deepest array/dictionary nesting accepted before parsing fails.
pub const MAX_NESTING_DEPTH: usize = 256;

/// One parsed unit: a value, or a token that only makes sense to a caller.
enum Item {
    Object(PDFObject),
    Operator(usize, Vec<u8>),
    DictEnd(usize),
    ArrayEnd(usize),
}

/// An object read from `N G obj ... endobj`.
#[derive(Debug)]
pub struct IndirectObject {
    pub reference: PDFObjRef,
    pub object: PDFObject,
}

pub struct PDFParser<'a> {
    lexer: Lexer<'a>,
    ids: &'a IdAllocator,
    pushback: Option<(usize, Token)>,
    /// Owner of the lexer's bytes, for zero-copy stream payloads.
    shared: Option<Bytes>,
    depth: usize,
}

impl<'a> PDFParser<'a> {
    pub fn new(data: &'a [u8], ids: &'a IdAllocator) -> Self {
        Self {
            lexer: Lexer::new(data),
            ids,
            pushback: None,
            shared: None,
            depth: 0,
        }
    }

    /// Parser whose stream payloads are slices of `data` instead of copies.
    pub fn with_shared(data: &'a Bytes, ids: &'a IdAllocator) -> Self {
        Self {
            lexer: Lexer::new(data),
            ids,
            pushback: None,
            shared: Some(data.clone()),
            depth: 0,
        }
    }

    pub fn tell(&self) -> usize {
        match &self.pushback {
            Some((pos, _)) => *pos,
            None => self.lexer.tell(),
        }
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pushback = None;
        self.lexer.set_pos(pos);
    }

    /// Next non-comment token.
    fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        if let Some(token) = self.pushback.take() {
            return Ok(Some(token));
        }
        loop {
            match self.lexer.next_token() {
                Some(Ok((_, Token::Comment(_)))) => continue,
                Some(Ok(token)) => return Ok(Some(token)),
                Some(Err(err)) => return Err(err),
                None => return Ok(None),
            }
        }
    }

    fn unread(&mut self, pos: usize, token: Token) {
        debug_assert!(self.pushback.is_none(), "pushback holds one token");
        self.pushback = Some((pos, token));
    }

    fn slice(&self, start: usize, end: usize) -> Bytes {
        match &self.shared {
            Some(shared) => shared.slice(start..end),
            None => Bytes::copy_from_slice(&self.lexer.data()[start..end]),
        }
    }

    fn item(&mut self, pos: usize, token: Token) -> Result<Item> {
        let ids = self.ids;
        let object = match token {
            Token::Integer(n) => ids.int(n),
            Token::Real(n) => ids.number(n),
            Token::Name(name) => ids.name(name),
            Token::String { bytes, hex } => ids.string(PDFString::from_bytes(bytes).with_hex(hex)),
            Token::Ref(reference) => ids.reference(reference),
            Token::DictStart => {
                self.descend(pos)?;
                let dict = self.read_dictionary();
                self.depth -= 1;
                ids.dict(dict?)
            }
            Token::ArrayStart => {
                self.descend(pos)?;
                let array = self.read_array();
                self.depth -= 1;
                ids.array(array?)
            }
            Token::DictEnd => return Ok(Item::DictEnd(pos)),
            Token::ArrayEnd => return Ok(Item::ArrayEnd(pos)),
            Token::Keyword(Keyword::True) => ids.boolean(true),
            Token::Keyword(Keyword::False) => ids.boolean(false),
            Token::Keyword(Keyword::Null) => ids.null(),
            Token::Keyword(keyword) => return Ok(Item::Operator(pos, keyword.as_bytes().to_vec())),
            Token::Comment(_) => {
                return Err(PdfError::SyntaxError(format!("comment in value position at {pos}")));
            }
        };
        Ok(Item::Object(object))
    }

    fn descend(&mut self, pos: usize) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(PdfError::SyntaxError(format!(
                "nesting deeper than {MAX_NESTING_DEPTH} at {pos}"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Next item inside a container, where end of input is an error.
    fn required_item(&mut self) -> Result<Item> {
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.item(pos, token)
    }

    /// Read one value. `None` at end of input.
    pub fn read_object(&mut self) -> Result<Option<PDFObject>> {
        let Some((pos, token)) = self.next_token()? else {
            return Ok(None);
        };
        match self.item(pos, token)? {
            Item::Object(object) => Ok(Some(object)),
            Item::DictEnd(pos) => Err(PdfError::SyntaxError(format!("unexpected '>>' at {pos}"))),
            Item::ArrayEnd(pos) => Err(PdfError::SyntaxError(format!("unexpected ']' at {pos}"))),
            Item::Operator(pos, op) => Err(PdfError::SyntaxError(format!(
                "unexpected operator '{}' at {pos}",
                String::from_utf8_lossy(&op)
            ))),
        }
    }

    /// Read dictionary entries up to `>>`; the opening `<<` is already consumed.
    pub fn read_dictionary(&mut self) -> Result<PDFDictionary> {
        let mut dict = PDFDictionary::new();
        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            let key = match token {
                Token::DictEnd => return Ok(dict),
                Token::Keyword(Keyword::Def) => continue,
                Token::Name(key) => key,
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "dictionary key must be a name, got '{}' at {pos}",
                        other.describe()
                    )));
                }
            };
            match self.required_item()? {
                Item::Object(value) => {
                    dict.put(key, value);
                }
                Item::DictEnd(pos) => {
                    return Err(PdfError::SyntaxError(format!(
                        "missing value for /{key} before '>>' at {pos}"
                    )));
                }
                Item::ArrayEnd(pos) => {
                    return Err(PdfError::SyntaxError(format!(
                        "unexpected ']' as value of /{key} at {pos}"
                    )));
                }
                Item::Operator(pos, op) => {
                    return Err(PdfError::SyntaxError(format!(
                        "unexpected operator '{}' as value of /{key} at {pos}",
                        String::from_utf8_lossy(&op)
                    )));
                }
            }
        }
    }

    /// Read array elements up to `]`; the opening `[` is already consumed.
    pub fn read_array(&mut self) -> Result<PDFArray> {
        let mut array = PDFArray::new();
        loop {
            match self.required_item()? {
                Item::Object(value) => array.add(value),
                Item::ArrayEnd(_) => return Ok(array),
                Item::DictEnd(pos) => {
                    return Err(PdfError::SyntaxError(format!("unexpected '>>' in array at {pos}")));
                }
                Item::Operator(pos, op) => {
                    return Err(PdfError::SyntaxError(format!(
                        "unexpected operator '{}' in array at {pos}",
                        String::from_utf8_lossy(&op)
                    )));
                }
            }
        }
    }

    /// Read one content-stream command.
    ///
    /// `operands` is cleared, then filled with the operands that precede
    /// the operator. Returns the operator, or `None` at end of input with
    /// any trailing operands left in `operands`. An inline image comes back
    /// as `BI` with a single stream operand.
    pub fn read_command(&mut self, operands: &mut Vec<PDFObject>) -> Result<Option<Vec<u8>>> {
        operands.clear();
        loop {
            let Some((pos, token)) = self.next_token()? else {
                return Ok(None);
            };
            match self.item(pos, token)? {
                Item::Object(value) => operands.push(value),
                Item::Operator(_, op) if op == b"BI" => {
                    operands.push(self.read_inline_image()?);
                    return Ok(Some(op));
                }
                Item::Operator(_, op) => return Ok(Some(op)),
                Item::DictEnd(pos) => {
                    return Err(PdfError::SyntaxError(format!("unexpected '>>' at {pos}")));
                }
                Item::ArrayEnd(pos) => {
                    return Err(PdfError::SyntaxError(format!("unexpected ']' at {pos}")));
                }
            }
        }
    }

    /// `BI` already read: parameters up to `ID`, raw bytes up to `EI`.
    fn read_inline_image(&mut self) -> Result<PDFObject> {
        let mut dict = PDFDictionary::new();
        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            let key = match token {
                Token::Keyword(Keyword::Other(op)) if op == b"ID" => break,
                Token::Name(key) => key,
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "inline image key must be a name, got '{}' at {pos}",
                        other.describe()
                    )));
                }
            };
            match self.required_item()? {
                Item::Object(value) => {
                    dict.put(key, value);
                }
                _ => {
                    return Err(PdfError::SyntaxError(format!(
                        "inline image parameter /{key} has no value"
                    )));
                }
            }
        }

        let data = self.lexer.data();
        let mut start = self.lexer.tell();
        if data.get(start).copied().is_some_and(is_whitespace) {
            start += 1;
        }
        let (end, resume) = find_inline_image_end(data, start).ok_or(PdfError::UnexpectedEof)?;
        let payload = self.slice(start, end);
        self.set_pos(resume);
        Ok(self.ids.stream(PDFStream::from_raw(dict, payload)))
    }

    /// Read `N G obj value [stream ... endstream] endobj`.
    ///
    /// An indirect `/Length` is resolved with `length_lookup`. When the
    /// length is missing or wrong the payload ends at the next `endstream`.
    pub fn read_indirect_object<F>(&mut self, mut length_lookup: F) -> Result<Option<IndirectObject>>
    where
        F: FnMut(PDFObjRef) -> Option<i64>,
    {
        let Some((pos, first)) = self.next_token()? else {
            return Ok(None);
        };
        let second = self.next_token()?.map(|(_, t)| t);
        let third = self.next_token()?.map(|(_, t)| t);
        let reference = match (first, second, third) {
            (Token::Integer(objid), Some(Token::Integer(genno)), Some(Token::Keyword(Keyword::Obj))) => {
                match (u32::try_from(objid), u16::try_from(genno)) {
                    (Ok(objid), Ok(genno)) => PDFObjRef::new(objid, genno),
                    _ => {
                        return Err(PdfError::SyntaxError(format!(
                            "object number {objid} {genno} out of range at {pos}"
                        )));
                    }
                }
            }
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected 'N G obj' at {pos}"
                )));
            }
        };

        let mut object = match self.required_item()? {
            Item::Object(object) => object,
            Item::Operator(_, op) if op == Keyword::EndObj.as_bytes() => {
                return Ok(Some(IndirectObject {
                    reference,
                    object: self.ids.null(),
                }));
            }
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "object {reference} has no value"
                )));
            }
        };

        let mut next = self.next_token()?;
        if let Some((_, Token::Keyword(Keyword::Stream))) = next {
            let dict = match object.into_value() {
                PDFValue::Dict(dict) => dict,
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "object {reference}: 'stream' after {}",
                        other.type_name()
                    )));
                }
            };
            let (payload, resume) = self.stream_payload(&dict, reference, &mut length_lookup)?;
            object = self.ids.stream(PDFStream::from_raw(dict, payload));
            self.set_pos(resume);
            next = self.next_token()?;
        }

        match next {
            Some((_, Token::Keyword(Keyword::EndObj))) => {}
            Some((pos, token)) => {
                warn!(%reference, pos, "missing endobj");
                self.unread(pos, token);
            }
            None => warn!(%reference, "missing endobj at end of input"),
        }

        Ok(Some(IndirectObject { reference, object }))
    }

    /// Payload bytes after the `stream` keyword and the offset just past
    /// `endstream`.
    fn stream_payload<F>(
        &self,
        dict: &PDFDictionary,
        reference: PDFObjRef,
        length_lookup: &mut F,
    ) -> Result<(Bytes, usize)>
    where
        F: FnMut(PDFObjRef) -> Option<i64>,
    {
        let data = self.lexer.data();
        let mut start = self.lexer.tell();
        if data[start..].starts_with(b"\r\n") {
            start += 2;
        } else if matches!(data.get(start), Some(b'\n' | b'\r')) {
            start += 1;
        }

        let declared = dict.get("Length").and_then(|length| match length.as_reference() {
            Some(r) => length_lookup(r),
            None => length.as_int(),
        });
        if let Some(length) = declared.and_then(|n| usize::try_from(n).ok())
            && let Some(end) = start.checked_add(length)
            && end <= data.len()
        {
            let after = skip_whitespace(data, end);
            if data[after..].starts_with(ENDSTREAM) {
                return Ok((self.slice(start, end), after + ENDSTREAM.len()));
            }
        }

        let found = data[start..]
            .windows(ENDSTREAM.len())
            .position(|w| w == ENDSTREAM)
            .ok_or(PdfError::UnexpectedEof)?;
        let mut end = start + found;
        if data[start..end].ends_with(b"\r\n") {
            end -= 2;
        } else if data[start..end].ends_with(b"\n") || data[start..end].ends_with(b"\r") {
            end -= 1;
        }
        debug!(%reference, ?declared, recovered = end - start, "stream /Length recovered by scanning");
        Ok((self.slice(start, end), start + found + ENDSTREAM.len()))
    }
}

fn skip_whitespace(data: &[u8], mut pos: usize) -> usize {
    while data.get(pos).copied().is_some_and(is_whitespace) {
        pos += 1;
    }
    pos
}

/// End of inline image data: whitespace, `EI`, then whitespace, a
/// delimiter or end of input. Returns the data end and the offset after `EI`.
fn find_inline_image_end(data: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut i = start;
    while i + 2 <= data.len() {
        if data[i..].starts_with(b"EI")
            && (i == start || is_whitespace(data[i - 1]))
            && data.get(i + 2).is_none_or(|&b| is_whitespace(b) || is_delimiter(b))
        {
            let end = if i > start { i - 1 } else { i };
            return Some((end, i + 2));
        }
        i += 1;
    }
    None
}

/// A content-stream operator with its operands.
#[derive(Debug)]
pub struct Operation {
    /// The operator (e.g., "BT", "Tf", "Tj")
    pub operator: Vec<u8>,
    pub operands: Vec<PDFObject>,
}

/// Iterator over the commands of a content stream.
pub struct ContentParser<'a> {
    parser: PDFParser<'a>,
    done: bool,
}

impl<'a> ContentParser<'a> {
    pub fn new(data: &'a [u8], ids: &'a IdAllocator) -> Self {
        Self {
            parser: PDFParser::new(data, ids),
            done: false,
        }
    }
}

impl Iterator for ContentParser<'_> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut operands = Vec::new();
        match self.parser.read_command(&mut operands) {
            Ok(Some(operator)) => Some(Ok(Operation { operator, operands })),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_image_end() {
        let data = b"ID \x00EI\x01 EI Q";
        // the first "EI" is followed by a data byte, the second by a space
        assert_eq!(find_inline_image_end(data, 3), Some((7, 10)));
    }

    #[test]
    fn test_pushback_restores_position() {
        let ids = IdAllocator::new();
        let mut parser = PDFParser::new(b"1 0 obj 5 2 0 obj 6 endobj", &ids);
        let first = parser.read_indirect_object(|_| None).unwrap().unwrap();
        assert_eq!(first.object.as_int(), Some(5));
        assert_eq!(parser.tell(), 10);
        let second = parser.read_indirect_object(|_| None).unwrap().unwrap();
        assert_eq!(second.reference, PDFObjRef::new(2, 0));
    }
}
