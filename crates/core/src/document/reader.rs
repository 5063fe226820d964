//! PDF file reader: cross-reference table, trailer and lazy object cache.

use crate::codec::FilterRegistry;
use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{IdAllocator, PDFObjRef, PDFObject, PDFValue};
use crate::model::stream::PDFStream;
use crate::model::table::{NoResolver, ObjectTable, Resolver};
use crate::params::ReaderParams;
use crate::parser::lexer::is_whitespace;
use crate::parser::pdf_parser::PDFParser;
use bytes::Bytes;
use memmap2::Mmap;
use regex::bytes::Regex;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Entries of one `xref` section plus its trailer.
type XRefSection = (Vec<(u32, Option<XRefEntry>)>, PDFDictionary);

/// Location of an in-use object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub offset: usize,
    pub genno: u16,
}

/// Reads objects out of a complete PDF file on demand.
///
/// Objects are parsed on first [`fetch`](Self::fetch) and cached. A
/// released object is parsed again on the next fetch and comes back with a
/// new identity.
pub struct PdfReader {
    data: Bytes,
    ids: IdAllocator,
    xref: BTreeMap<u32, XRefEntry>,
    trailer: PDFDictionary,
    cache: ObjectTable,
    filters: FilterRegistry,
    fallback: bool,
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("len", &self.data.len())
            .field("objects", &self.xref.len())
            .field("cached", &self.cache.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl PdfReader {
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        Self::with_params(data, &ReaderParams::default())
    }

    pub fn with_params(data: impl Into<Bytes>, params: &ReaderParams) -> Result<Self> {
        let cache = match params.cache_capacity {
            Some(capacity) => ObjectTable::with_capacity_limit(capacity.max(1)),
            None => ObjectTable::new(),
        };
        let mut reader = Self {
            data: data.into(),
            ids: IdAllocator::new(),
            xref: BTreeMap::new(),
            trailer: PDFDictionary::new(),
            cache,
            filters: FilterRegistry::with_defaults(),
            fallback: false,
        };

        match reader.load_xrefs() {
            Ok(()) => {}
            Err(err) if params.allow_xref_fallback => {
                warn!(%err, "cross-reference table unusable; scanning for objects");
                reader.load_xref_fallback()?;
            }
            Err(err) => return Err(err),
        }
        debug!(objects = reader.xref.len(), fallback = reader.fallback, "opened PDF");
        Ok(reader)
    }

    /// Memory-map `path` and read from the mapping without copying.
    pub fn from_mmap(path: impl AsRef<Path>, params: &ReaderParams) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is read-only and owned by the returned Bytes.
        let mmap = unsafe { Mmap::map(&file) }?;
        Self::with_params(Bytes::from_owner(mmap), params)
    }

    pub fn trailer(&self) -> &PDFDictionary {
        &self.trailer
    }

    /// Allocator for the objects this reader parses; use it to build new
    /// objects that live alongside them.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// True when the objects were located by scanning instead of the xref.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn xref_entry(&self, objid: u32) -> Option<XRefEntry> {
        self.xref.get(&objid).copied()
    }

    /// References of every in-use object, by object number.
    pub fn object_numbers(&self) -> impl Iterator<Item = PDFObjRef> + '_ {
        self.xref
            .iter()
            .map(|(&objid, entry)| PDFObjRef::new(objid, entry.genno))
    }

    /// The object for `reference`, parsed on first access.
    pub fn fetch(&mut self, reference: PDFObjRef) -> Result<&PDFObject> {
        if self.cache.contains(&reference) {
            self.cache.touch(&reference);
        } else {
            let object = self.parse_object(reference)?;
            trace!(%reference, "fetched");
            self.cache.insert(reference, object);
        }
        self.cache
            .get(&reference)
            .ok_or(PdfError::ObjectNotFound(reference.objid))
    }

    /// Fetch and hand over ownership, leaving nothing cached.
    pub fn get_and_release(&mut self, reference: PDFObjRef) -> Result<PDFObject> {
        self.fetch(reference)?;
        self.cache
            .release(&reference)
            .ok_or(PdfError::ObjectNotFound(reference.objid))
    }

    /// Drop a cached object. Returns whether it was cached.
    pub fn release(&mut self, reference: PDFObjRef) -> bool {
        let released = self.cache.release(&reference).is_some();
        if released {
            trace!(%reference, "released");
        }
        released
    }

    /// Parse every object in the cross-reference table into the cache.
    ///
    /// With a cache capacity set, early objects may already be evicted when
    /// this returns.
    pub fn load_all(&mut self) -> Result<usize> {
        let references: Vec<PDFObjRef> = self.object_numbers().collect();
        for &reference in &references {
            self.fetch(reference)?;
        }
        Ok(references.len())
    }

    /// Decode a stream's payload with this reader resolving indirect
    /// filter parameters.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Vec<u8>> {
        stream.decoded_data(self, &self.filters)
    }

    fn parse_object(&self, reference: PDFObjRef) -> Result<PDFObject> {
        let entry = self
            .xref
            .get(&reference.objid)
            .filter(|entry| entry.genno == reference.genno)
            .ok_or(PdfError::ObjectNotFound(reference.objid))?;

        let mut parser = PDFParser::with_shared(&self.data, &self.ids);
        parser.set_pos(entry.offset);
        let parsed = parser
            .read_indirect_object(|length| self.lookup_length(length))?
            .ok_or(PdfError::UnexpectedEof)?;
        if parsed.reference.objid != reference.objid {
            return Err(PdfError::SyntaxError(format!(
                "expected object {reference} at offset {}, found {}",
                entry.offset, parsed.reference
            )));
        }
        Ok(parsed.object)
    }

    /// Value of an indirect `/Length`, without caching the length object.
    fn lookup_length(&self, reference: PDFObjRef) -> Option<i64> {
        if let Some(object) = self.cache.get(&reference) {
            return object.as_int();
        }
        let entry = self.xref.get(&reference.objid)?;
        let mut parser = PDFParser::with_shared(&self.data, &self.ids);
        parser.set_pos(entry.offset);
        parser.read_indirect_object(|_| None).ok()??.object.as_int()
    }

    /// Follow `startxref` and the `/Prev` chain. Newer sections win.
    fn load_xrefs(&mut self) -> Result<()> {
        let mut pos = find_startxref(&self.data)?;
        let mut visited = FxHashSet::default();
        let mut entries: BTreeMap<u32, Option<XRefEntry>> = BTreeMap::new();
        let mut trailer = None;

        while visited.insert(pos) {
            let (section, section_trailer) = self.load_xref_section(pos)?;
            for (objid, entry) in section {
                entries.entry(objid).or_insert(entry);
            }
            let prev = section_trailer.get_int("Prev", &NoResolver);
            if trailer.is_none() {
                trailer = Some(section_trailer);
            }
            match prev.and_then(|p| usize::try_from(p).ok()) {
                Some(prev) => pos = prev,
                None => break,
            }
        }

        self.trailer = trailer.ok_or(PdfError::NoValidXRef)?;
        self.xref = entries
            .into_iter()
            .filter_map(|(objid, entry)| Some((objid, entry?)))
            .collect();
        Ok(())
    }

    /// One `xref` section and its trailer. Free entries map to `None`.
    fn load_xref_section(&self, pos: usize) -> Result<XRefSection> {
        let data = &self.data[..];
        if !data.get(pos..).is_some_and(|rest| rest.starts_with(b"xref")) {
            return Err(PdfError::NoValidXRef);
        }
        let mut cursor = pos + 4;
        let mut section = Vec::new();

        loop {
            cursor = skip_whitespace(data, cursor);
            if cursor >= data.len() {
                return Err(PdfError::NoValidXRef);
            }
            if data[cursor..].starts_with(b"trailer") {
                cursor += 7;
                break;
            }

            let (start, next) = read_uint(data, cursor).ok_or(PdfError::NoValidXRef)?;
            let (count, next) = read_uint(data, skip_spaces(data, next)).ok_or(PdfError::NoValidXRef)?;
            cursor = next;

            let mut base = start;
            for i in 0..count {
                cursor = skip_whitespace(data, cursor);
                let (offset, next) = read_uint(data, cursor).ok_or(PdfError::NoValidXRef)?;
                let (genno, next) = read_uint(data, skip_spaces(data, next)).ok_or(PdfError::NoValidXRef)?;
                let marker_at = skip_spaces(data, next);
                let marker = data.get(marker_at).copied().ok_or(PdfError::NoValidXRef)?;
                cursor = marker_at + 1;

                // Some writers number the subsection from 1 but still list
                // the object 0 free entry first.
                if i == 0 && base > 0 && marker == b'f' && offset == 0 && genno == 65535 {
                    base -= 1;
                }
                let Ok(objid) = u32::try_from(base + i) else {
                    return Err(PdfError::NoValidXRef);
                };
                let entry = match marker {
                    b'n' => Some(XRefEntry {
                        offset: usize::try_from(offset).map_err(|_| PdfError::NoValidXRef)?,
                        genno: u16::try_from(genno).unwrap_or(u16::MAX),
                    }),
                    b'f' => None,
                    _ => return Err(PdfError::NoValidXRef),
                };
                section.push((objid, entry));
            }
        }

        let trailer = self.parse_trailer_at(cursor).ok_or(PdfError::NoValidXRef)?;
        Ok((section, trailer))
    }

    /// Dictionary following the `trailer` keyword.
    fn parse_trailer_at(&self, pos: usize) -> Option<PDFDictionary> {
        let mut parser = PDFParser::with_shared(&self.data, &self.ids);
        parser.set_pos(pos);
        match parser.read_object().ok()??.into_value() {
            PDFValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Locate objects by scanning for `N G obj`; later definitions win.
    fn load_xref_fallback(&mut self) -> Result<()> {
        let pattern = Regex::new(r"(\d+)\s+(\d+)\s+obj\b")
            .map_err(|err| PdfError::SyntaxError(err.to_string()))?;

        let mut xref = BTreeMap::new();
        for caps in pattern.captures_iter(&self.data) {
            let (Some(whole), Some(objid), Some(genno)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let parse = |m: regex::bytes::Match<'_>| {
                std::str::from_utf8(m.as_bytes())
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
            };
            let (Some(objid), Some(genno)) = (parse(objid), parse(genno)) else {
                continue;
            };
            let (Ok(objid), Ok(genno)) = (u32::try_from(objid), u16::try_from(genno)) else {
                continue;
            };
            xref.insert(
                objid,
                XRefEntry {
                    offset: whole.start(),
                    genno,
                },
            );
        }
        if xref.is_empty() {
            return Err(PdfError::NoValidXRef);
        }

        self.trailer = rfind(&self.data, b"trailer")
            .and_then(|pos| self.parse_trailer_at(pos + 7))
            .unwrap_or_default();
        self.xref = xref;
        self.fallback = true;
        Ok(())
    }
}

impl Resolver for PdfReader {
    fn resolve(&self, reference: &PDFObjRef) -> Option<&PDFObject> {
        self.cache.get(reference)
    }
}

fn rfind(data: &[u8], needle: &[u8]) -> Option<usize> {
    data.windows(needle.len()).rposition(|w| w == needle)
}

/// Offset named by the last `startxref`.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let keyword = b"startxref";
    let pos = rfind(data, keyword).ok_or(PdfError::NoValidXRef)?;
    let start = skip_whitespace(data, pos + keyword.len());
    let (offset, _) = read_uint(data, start).ok_or(PdfError::NoValidXRef)?;
    usize::try_from(offset).map_err(|_| PdfError::NoValidXRef)
}

fn skip_whitespace(data: &[u8], mut pos: usize) -> usize {
    while data.get(pos).copied().is_some_and(is_whitespace) {
        pos += 1;
    }
    pos
}

fn skip_spaces(data: &[u8], mut pos: usize) -> usize {
    while data.get(pos) == Some(&b' ') {
        pos += 1;
    }
    pos
}

/// Decimal number at `pos` and the offset after it.
fn read_uint(data: &[u8], pos: usize) -> Option<(u64, usize)> {
    let digits = data
        .get(pos..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    let text = std::str::from_utf8(&data[pos..pos + digits]).ok()?;
    Some((text.parse().ok()?, pos + digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_startxref_uses_last() {
        let data = b"startxref\n10\n%%EOF\nstartxref\r\n42\n%%EOF";
        assert_eq!(find_startxref(data).unwrap(), 42);
    }

    #[test]
    fn test_read_uint() {
        assert_eq!(read_uint(b"0000000017 00000 n", 0), Some((17, 10)));
        assert_eq!(read_uint(b"x", 0), None);
    }
}
