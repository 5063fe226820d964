//! PDF stream objects: a dictionary plus a byte payload.
//!
//! A stream either holds its payload in memory, or pulls it from a reader
//! while being written. The second form cannot know its length up front,
//! so `/Length` points at a placeholder object that [`PDFStream::write_length`]
//! fills in once the body is out.

use crate::codec::FilterRegistry;
use crate::codec::flate::flate_encode;
use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{IdAllocator, PDFObjRef, PDFObject, PDFValue};
use crate::model::serialize::write_dictionary;
use crate::model::table::Resolver;
use crate::params::CompressionParams;
use crate::writer::{CountingWriter, PdfWriter, WriterContext};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io::{self, Read, Write};

enum Payload {
    Bytes(Bytes),
    /// One-shot source, taken when the stream is written.
    Source(RefCell<Option<Box<dyn Read>>>),
}

/// PDF Stream - dictionary attributes + binary data.
pub struct PDFStream {
    dict: PDFDictionary,
    payload: Payload,
    compressed: bool,
    /// Level used when a streaming source is deflated on write.
    compression: Compression,
    length_ref: Option<PDFObjRef>,
    written_length: Cell<Option<u64>>,
}

impl fmt::Debug for PDFStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.payload {
            Payload::Bytes(b) => format!("{} bytes", b.len()),
            Payload::Source(_) => "reader".to_string(),
        };
        f.debug_struct("PDFStream")
            .field("dict", &self.dict)
            .field("payload", &payload)
            .field("compressed", &self.compressed)
            .field("length_ref", &self.length_ref)
            .finish()
    }
}

pub(crate) fn is_flate_name(name: &str) -> bool {
    name == "FlateDecode" || name == "Fl"
}

impl PDFStream {
    /// In-memory stream; `/Length` is set from `data`.
    pub fn new(ids: &IdAllocator, mut dict: PDFDictionary, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        dict.put("Length", ids.int(data.len() as i64));
        Self {
            dict,
            payload: Payload::Bytes(data),
            compressed: false,
            compression: Compression::default(),
            length_ref: None,
            written_length: Cell::new(None),
        }
    }

    /// Stream whose body is read from `source` while it is written.
    ///
    /// `/Length` becomes a reference reserved from `writer`; call
    /// [`write_length`](Self::write_length) after the stream has been added.
    pub fn from_reader<W: Write>(
        ids: &IdAllocator,
        mut dict: PDFDictionary,
        source: impl Read + 'static,
        writer: &mut PdfWriter<W>,
    ) -> Self {
        let length_ref = writer.reserve_reference();
        dict.put("Length", ids.reference(length_ref));
        Self {
            dict,
            payload: Payload::Source(RefCell::new(Some(Box::new(source)))),
            compressed: false,
            compression: Compression::default(),
            length_ref: Some(length_ref),
            written_length: Cell::new(None),
        }
    }

    /// Stream as found in a file; the dictionary is kept verbatim.
    pub fn from_raw(dict: PDFDictionary, rawdata: impl Into<Bytes>) -> Self {
        Self {
            dict,
            payload: Payload::Bytes(rawdata.into()),
            compressed: false,
            compression: Compression::default(),
            length_ref: None,
            written_length: Cell::new(None),
        }
    }

    pub const fn dict(&self) -> &PDFDictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut PDFDictionary {
        &mut self.dict
    }

    /// Get attribute by name.
    pub fn get(&self, key: &str) -> Option<&PDFObject> {
        self.dict.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: PDFObject) -> Option<PDFObject> {
        self.dict.put(key, value)
    }

    /// Raw (still encoded) payload; `None` for reader-backed streams.
    pub fn raw_data(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) => Some(&b[..]),
            Payload::Source(_) => None,
        }
    }

    /// Raw payload as shared bytes.
    pub fn raw_bytes(&self) -> Option<Bytes> {
        match &self.payload {
            Payload::Bytes(b) => Some(b.clone()),
            Payload::Source(_) => None,
        }
    }

    pub const fn is_streaming(&self) -> bool {
        matches!(self.payload, Payload::Source(_))
    }

    /// True once [`flate_compress`](Self::flate_compress) has run.
    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Placeholder reference for a deferred `/Length`.
    pub const fn length_reference(&self) -> Option<PDFObjRef> {
        self.length_ref
    }

    /// Bytes emitted for a reader-backed body, known after writing.
    pub fn written_length(&self) -> Option<u64> {
        self.written_length.get()
    }

    /// Replace the payload with unencoded `data`.
    ///
    /// Drops `/Filter` and `/DecodeParms` and resets the compression state.
    pub fn set_data(&mut self, ids: &IdAllocator, data: impl Into<Bytes>) {
        let data = data.into();
        self.dict.remove("Filter");
        self.dict.remove("DecodeParms");
        self.dict.put("Length", ids.int(data.len() as i64));
        self.payload = Payload::Bytes(data);
        self.compressed = false;
        self.length_ref = None;
        self.written_length.set(None);
    }

    /// Apply Flate compression and prepend `FlateDecode` to the chain.
    ///
    /// No-op (returning `false`) when already compressed, when compression
    /// is disabled, or when the filter chain already holds Flate.
    pub fn flate_compress(&mut self, ids: &IdAllocator, params: &CompressionParams) -> Result<bool> {
        if self.compressed || !params.enabled {
            return Ok(false);
        }
        if let Some(filter) = self.dict.get("Filter") {
            match filter.value() {
                PDFValue::Name(name) if is_flate_name(name) => return Ok(false),
                PDFValue::Array(chain) if chain.iter().any(|f| f.as_name().is_some_and(is_flate_name)) => {
                    return Ok(false);
                }
                PDFValue::Name(_) | PDFValue::Array(_) => {}
                other => {
                    tracing::warn!(
                        filter = other.type_name(),
                        "cannot prepend FlateDecode to this /Filter; left uncompressed"
                    );
                    return Ok(false);
                }
            }
        }

        let level = params.flate_level();
        if let Payload::Bytes(data) = &self.payload {
            let encoded = flate_encode(data, level)?;
            self.dict.put("Length", ids.int(encoded.len() as i64));
            self.payload = Payload::Bytes(Bytes::from(encoded));
        }
        self.compression = level;

        let flate = ids.name("FlateDecode");
        match self.dict.remove("Filter") {
            None => {
                self.dict.put("Filter", flate);
            }
            Some(mut chain) if chain.as_array().is_some() => {
                if let Some(array) = chain.as_array_mut() {
                    array.insert(0, flate);
                }
                self.dict.put("Filter", chain);
            }
            Some(single) => {
                self.dict
                    .put("Filter", ids.array(vec![flate, single].into()));
            }
        }

        // Keep DecodeParms aligned with the lengthened chain.
        match self.dict.remove("DecodeParms") {
            None => {}
            Some(mut parms) if parms.as_array().is_some() => {
                if let Some(array) = parms.as_array_mut() {
                    array.insert(0, ids.null());
                }
                self.dict.put("DecodeParms", parms);
            }
            Some(single) => {
                self.dict
                    .put("DecodeParms", ids.array(vec![ids.null(), single].into()));
            }
        }

        self.compressed = true;
        Ok(true)
    }

    /// Run the filter chain over the payload.
    pub fn decoded_data<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        registry: &FilterRegistry,
    ) -> Result<Vec<u8>> {
        let data = self.raw_data().ok_or_else(|| {
            PdfError::InvalidState("reader-backed stream has no payload to decode".into())
        })?;
        registry.decode(data, &self.dict, resolver)
    }

    /// Emit the recorded body length as the placeholder object.
    pub fn write_length<W: Write>(&self, ids: &IdAllocator, writer: &mut PdfWriter<W>) -> Result<()> {
        let reference = self.length_ref.ok_or_else(|| {
            PdfError::InvalidState("write_length needs a stream built from a reader".into())
        })?;
        let length = self.written_length.get().ok_or_else(|| {
            PdfError::InvalidState("write_length called before the stream body was written".into())
        })?;
        writer.add_object_at(&ids.int(length as i64), reference)
    }

    pub fn duplicate(&self, ids: &IdAllocator) -> Result<Self> {
        let Payload::Bytes(data) = &self.payload else {
            return Err(PdfError::InvalidState(
                "reader-backed stream cannot be duplicated".into(),
            ));
        };
        Ok(Self {
            dict: self.dict.duplicate(ids)?,
            payload: Payload::Bytes(data.clone()),
            compressed: self.compressed,
            compression: self.compression,
            length_ref: None,
            written_length: Cell::new(None),
        })
    }

    pub(crate) fn write_pdf(&self, ctx: Option<&WriterContext<'_>>, out: &mut dyn Write) -> Result<()> {
        let crypto = ctx
            .map(WriterContext::crypto)
            .transpose()?
            .flatten()
            .filter(|(enc, _)| !enc.is_exempt(&self.dict));

        match &self.payload {
            Payload::Bytes(data) => {
                let body: Cow<'_, [u8]> = match crypto {
                    Some((enc, current)) => Cow::Owned(enc.encrypt(current, data)?),
                    None => Cow::Borrowed(&data[..]),
                };
                write_dictionary(&self.dict, ctx, out, Some(body.len() as u64))?;
                out.write_all(b"stream\n")?;
                out.write_all(&body)?;
                out.write_all(b"\nendstream")?;
            }
            Payload::Source(cell) => {
                let mut source = cell.borrow_mut().take().ok_or_else(|| {
                    PdfError::InvalidState("stream source already consumed".into())
                })?;
                write_dictionary(&self.dict, ctx, out, None)?;
                out.write_all(b"stream\n")?;
                let deflate = self.compressed.then_some(self.compression);
                let written = match crypto {
                    Some((enc, current)) => {
                        let mut sink = enc.encrypting_writer(current, CountingWriter::new(&mut *out))?;
                        pump(&mut source, &mut sink, deflate)?;
                        sink.finish()?.count()
                    }
                    None => {
                        let mut sink = CountingWriter::new(&mut *out);
                        pump(&mut source, &mut sink, deflate)?;
                        sink.count()
                    }
                };
                out.write_all(b"\nendstream")?;
                self.written_length.set(Some(written));
            }
        }
        Ok(())
    }
}

fn pump<W: Write>(source: &mut dyn Read, sink: &mut W, deflate: Option<Compression>) -> io::Result<()> {
    match deflate {
        Some(level) => {
            let mut encoder = ZlibEncoder::new(sink, level);
            io::copy(source, &mut encoder)?;
            encoder.finish()?;
        }
        None => {
            io::copy(source, sink)?;
        }
    }
    Ok(())
}
