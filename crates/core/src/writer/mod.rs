//! PDF output: object body layout, cross-reference table and trailer.
//!
//! - `encryption`: per-object RC4 / AES-128 transforms for strings and streams

pub mod encryption;

pub use encryption::{CryptMethod, EncryptingWriter, PdfEncryption};

use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{IdAllocator, PDFObjRef, PDFObject};
use crate::params::WriterParams;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// State that serialization runs against.
///
/// `current` is the indirect object being written; it selects the
/// per-object encryption key for strings and streams inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterContext<'a> {
    pub encryption: Option<&'a PdfEncryption>,
    pub current: Option<PDFObjRef>,
}

impl<'a> WriterContext<'a> {
    pub fn new(encryption: Option<&'a PdfEncryption>, current: Option<PDFObjRef>) -> Self {
        Self {
            encryption,
            current,
        }
    }

    /// Active encryption and the object it is keyed to.
    pub(crate) fn crypto(&self) -> Result<Option<(&'a PdfEncryption, PDFObjRef)>> {
        match (self.encryption, self.current) {
            (None, _) => Ok(None),
            (Some(enc), Some(current)) => Ok(Some((enc, current))),
            (Some(_), None) => Err(PdfError::InvalidState(
                "encryption requires an enclosing indirect object".into(),
            )),
        }
    }
}

/// Write adapter that counts bytes passed through.
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Sequential PDF writer.
///
/// Objects are written as they are added; `close` appends the
/// cross-reference table and trailer.
pub struct PdfWriter<W: Write> {
    out: CountingWriter<W>,
    params: WriterParams,
    encryption: Option<PdfEncryption>,
    /// Written objects: object number to (offset, generation)
    offsets: BTreeMap<u32, (u64, u16)>,
    next_objid: u32,
}

impl<W: Write> PdfWriter<W> {
    /// Start a document, writing the `%PDF-x.y` header.
    pub fn new(out: W, params: WriterParams) -> Result<Self> {
        let mut out = CountingWriter::new(out);
        let (major, minor) = params.version;
        writeln!(out, "%PDF-{major}.{minor}")?;
        if params.binary_comment {
            out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;
        }
        Ok(Self {
            out,
            params,
            encryption: None,
            offsets: BTreeMap::new(),
            next_objid: 1,
        })
    }

    pub const fn params(&self) -> &WriterParams {
        &self.params
    }

    pub fn set_encryption(&mut self, encryption: Option<PdfEncryption>) {
        self.encryption = encryption;
    }

    pub const fn encryption(&self) -> Option<&PdfEncryption> {
        self.encryption.as_ref()
    }

    /// Bytes written so far.
    pub const fn position(&self) -> u64 {
        self.out.count()
    }

    /// Allocate an object number without writing anything.
    pub fn reserve_reference(&mut self) -> PDFObjRef {
        let reference = PDFObjRef::new(self.next_objid, 0);
        self.next_objid = self.next_objid.saturating_add(1);
        reference
    }

    /// Write `obj` under a fresh object number.
    pub fn add_object(&mut self, obj: &PDFObject) -> Result<PDFObjRef> {
        let reference = self.reserve_reference();
        self.add_object_at(obj, reference)?;
        Ok(reference)
    }

    /// Write `obj` under a reserved or externally assigned number.
    pub fn add_object_at(&mut self, obj: &PDFObject, reference: PDFObjRef) -> Result<()> {
        if reference.objid == 0 {
            return Err(PdfError::InvalidState("object number 0 is reserved".into()));
        }
        if self.offsets.contains_key(&reference.objid) {
            return Err(PdfError::InvalidState(format!(
                "object {} already written",
                reference.objid
            )));
        }
        let following = reference.objid.checked_add(1).ok_or_else(|| {
            PdfError::InvalidState(format!("object number {} is out of range", reference.objid))
        })?;

        // Only a completely written object gets an xref entry.
        let offset = self.out.count();
        writeln!(self.out, "{} {} obj", reference.objid, reference.genno)?;
        let ctx = WriterContext::new(self.encryption.as_ref(), Some(reference));
        obj.to_pdf(Some(&ctx), &mut self.out)?;
        self.out.write_all(b"\nendobj\n")?;

        self.offsets.insert(reference.objid, (offset, reference.genno));
        self.next_objid = self.next_objid.max(following);
        tracing::trace!(%reference, offset, "object written");
        Ok(())
    }

    /// Finish the file: xref table, trailer (with `/Size`), `startxref`.
    pub fn close(mut self, ids: &IdAllocator, mut trailer: PDFDictionary) -> Result<W> {
        let size = self.next_objid;
        let unwritten = (1..size)
            .filter(|n| !self.offsets.contains_key(n))
            .count();
        if unwritten > 0 {
            tracing::warn!(unwritten, "reserved objects never written; listed as free");
        }

        let xref_offset = self.out.count();
        writeln!(self.out, "xref\n0 {size}")?;
        // Free entries are chained through their offset field, ending at 0.
        let free: Vec<u32> = (1..size)
            .filter(|n| !self.offsets.contains_key(n))
            .collect();
        let first_free = free.first().copied().unwrap_or(0);
        write!(self.out, "{first_free:010} 65535 f\r\n")?;
        let mut free_iter = free.iter().skip(1);
        for objid in 1..size {
            match self.offsets.get(&objid) {
                Some((offset, genno)) => write!(self.out, "{offset:010} {genno:05} n\r\n")?,
                None => {
                    let next = free_iter.next().copied().unwrap_or(0);
                    write!(self.out, "{next:010} 00001 f\r\n")?;
                }
            }
        }

        trailer.put("Size", ids.int(i64::from(size)));
        self.out.write_all(b"trailer\n")?;
        ids.dict(trailer).to_pdf(None, &mut self.out)?;
        writeln!(self.out, "\nstartxref\n{xref_offset}\n%%EOF")?;
        self.out.flush()?;
        Ok(self.out.into_inner())
    }
}
