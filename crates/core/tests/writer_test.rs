//! `PdfWriter` output layout, deferred lengths and encryption.

use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;
use vellum_core::{
    CompressionParams, IdAllocator, PDFDictionary, PDFObjRef, PDFStream, PdfEncryption, PdfError,
    PdfWriter, WriterParams,
};

fn plain_params() -> WriterParams {
    WriterParams {
        binary_comment: false,
        ..WriterParams::default()
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn test_header_with_binary_comment() {
    let writer = PdfWriter::new(Vec::new(), WriterParams::default()).unwrap();
    assert_eq!(writer.position(), 15);
    let out = writer.close(&IdAllocator::new(), PDFDictionary::new()).unwrap();
    assert!(out.starts_with(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n"));
}

#[test]
fn test_header_version() {
    let params = WriterParams {
        version: (2, 0),
        ..plain_params()
    };
    let writer = PdfWriter::new(Vec::new(), params).unwrap();
    let out = writer.close(&IdAllocator::new(), PDFDictionary::new()).unwrap();
    assert!(out.starts_with(b"%PDF-2.0\nxref\n0 1\n"));
}

#[test]
fn test_xref_layout() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();

    let first = writer.add_object(&ids.int(42)).unwrap();
    assert_eq!(first, PDFObjRef::new(1, 0));
    let skipped = writer.reserve_reference();
    assert_eq!(skipped, PDFObjRef::new(2, 0));

    let mut catalog = PDFDictionary::new();
    catalog.put("Type", ids.name("Catalog"));
    let root = writer.add_object(&ids.dict(catalog)).unwrap();
    assert_eq!(root, PDFObjRef::new(3, 0));

    let mut trailer = PDFDictionary::new();
    trailer.put("Root", ids.reference(root));
    let out = text(&writer.close(&ids, trailer).unwrap());

    // Every xref entry is exactly 20 bytes.
    assert!(out.contains("0000000009 00000 n\r\n"));
    insta::assert_snapshot!(out.replace("\r\n", "\n"), @r"
    %PDF-1.7
    1 0 obj
    42
    endobj
    3 0 obj
    <</Type/Catalog>>
    endobj
    xref
    0 4
    0000000002 65535 f
    0000000009 00000 n
    0000000000 00001 f
    0000000027 00000 n
    trailer
    <</Root 3 0 R/Size 4>>
    startxref
    60
    %%EOF
    ");
}

#[test]
fn test_add_object_at_rejects_zero_and_duplicates() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    assert!(matches!(
        writer.add_object_at(&ids.null(), PDFObjRef::new(0, 0)),
        Err(PdfError::InvalidState(_))
    ));

    writer.add_object_at(&ids.int(1), PDFObjRef::new(5, 0)).unwrap();
    assert!(matches!(
        writer.add_object_at(&ids.int(2), PDFObjRef::new(5, 0)),
        Err(PdfError::InvalidState(_))
    ));
    // Numbering continues after the highest written object.
    assert_eq!(writer.reserve_reference(), PDFObjRef::new(6, 0));
}

/// Sink that fails once its shared byte budget runs out.
struct BudgetSink {
    budget: Rc<Cell<usize>>,
    buf: Vec<u8>,
}

impl Write for BudgetSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let left = self.budget.get();
        if left == 0 {
            return Err(io::Error::other("disk full"));
        }
        let n = data.len().min(left);
        self.budget.set(left - n);
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_failed_write_leaves_no_xref_entry() {
    let ids = IdAllocator::new();
    let budget = Rc::new(Cell::new(usize::MAX));
    let sink = BudgetSink {
        budget: budget.clone(),
        buf: Vec::new(),
    };
    let mut writer = PdfWriter::new(sink, plain_params()).unwrap();
    writer.add_object(&ids.int(1)).unwrap();

    budget.set(4);
    assert!(matches!(
        writer.add_object_at(&ids.int(7), PDFObjRef::new(4, 0)),
        Err(PdfError::Io(_))
    ));
    budget.set(usize::MAX);

    let out = text(&writer.close(&ids, PDFDictionary::new()).unwrap().buf);
    assert!(out.contains("xref\n0 2\n"), "{out}");
    assert!(out.contains("/Size 2"), "{out}");
}

#[test]
fn test_highest_object_number_is_rejected() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    assert!(matches!(
        writer.add_object_at(&ids.null(), PDFObjRef::new(u32::MAX, 0)),
        Err(PdfError::InvalidState(_))
    ));
    writer.add_object_at(&ids.null(), PDFObjRef::new(u32::MAX - 1, 0)).unwrap();
    assert_eq!(writer.reserve_reference(), PDFObjRef::new(u32::MAX, 0));
    assert_eq!(writer.reserve_reference(), PDFObjRef::new(u32::MAX, 0));
}

#[test]
fn test_deferred_length() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    let stream = PDFStream::from_reader(&ids, PDFDictionary::new(), &b"hello world"[..], &mut writer);
    let length_ref = stream.length_reference().unwrap();
    assert_eq!(length_ref, PDFObjRef::new(1, 0));

    let obj = ids.stream(stream);
    let stream_ref = writer.add_object(&obj).unwrap();
    assert_eq!(stream_ref, PDFObjRef::new(2, 0));

    let stream = obj.as_stream().unwrap();
    assert_eq!(stream.written_length(), Some(11));
    stream.write_length(&ids, &mut writer).unwrap();

    let out = text(&writer.close(&ids, PDFDictionary::new()).unwrap());
    assert!(out.contains("2 0 obj\n<</Length 1 0 R>>stream\nhello world\nendstream\nendobj\n"));
    assert!(out.contains("1 0 obj\n11\nendobj\n"));
}

#[test]
fn test_reader_stream_source_is_consumed_once() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    let stream = PDFStream::from_reader(&ids, PDFDictionary::new(), &b"once"[..], &mut writer);
    let obj = ids.stream(stream);
    writer.add_object(&obj).unwrap();
    assert!(matches!(
        writer.add_object(&obj),
        Err(PdfError::InvalidState(_))
    ));
}

#[test]
fn test_deferred_length_with_compression() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    let data = vec![b'z'; 10_000];
    let mut stream = PDFStream::from_reader(&ids, PDFDictionary::new(), std::io::Cursor::new(data), &mut writer);
    assert!(stream.flate_compress(&ids, &CompressionParams::default()).unwrap());

    let obj = ids.stream(stream);
    writer.add_object(&obj).unwrap();
    let written = obj.as_stream().unwrap().written_length().unwrap();
    assert!(written > 0 && written < 10_000);
}

fn stream_with(ids: &IdAllocator, dict: PDFDictionary, len: usize) -> PDFStream {
    PDFStream::new(ids, dict, vec![b'a'; len])
}

fn written_length(out: &[u8]) -> usize {
    let out = text(out);
    let start = out.find("/Length ").unwrap() + "/Length ".len();
    let end = start + out[start..].find('>').unwrap();
    out[start..end].parse().unwrap()
}

#[test]
fn test_aes_stream_length_matches_calculated_size() {
    let ids = IdAllocator::new();
    let encryption = PdfEncryption::aes128(&[7u8; 16]).unwrap();
    for len in [0, 1, 15, 16, 20, 100] {
        let expected = encryption.calculate_stream_size(len);
        let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
        writer.set_encryption(Some(PdfEncryption::aes128(&[7u8; 16]).unwrap()));
        writer
            .add_object(&ids.stream(stream_with(&ids, PDFDictionary::new(), len)))
            .unwrap();
        let out = writer.close(&ids, PDFDictionary::new()).unwrap();
        assert_eq!(written_length(&out), expected, "payload of {len} bytes");
    }
}

#[test]
fn test_rc4_stream_keeps_length() {
    let ids = IdAllocator::new();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    writer.set_encryption(Some(PdfEncryption::rc4(b"12345").unwrap()));
    writer
        .add_object(&ids.stream(stream_with(&ids, PDFDictionary::new(), 20)))
        .unwrap();
    let out = writer.close(&ids, PDFDictionary::new()).unwrap();
    assert_eq!(written_length(&out), 20);
    assert!(!text(&out).contains(&"a".repeat(20)));
}

#[test]
fn test_aes_streaming_length_matches_calculated_size() {
    let ids = IdAllocator::new();
    let encryption = PdfEncryption::aes128(&[9u8; 16]).unwrap();
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    writer.set_encryption(Some(PdfEncryption::aes128(&[9u8; 16]).unwrap()));
    let stream = PDFStream::from_reader(&ids, PDFDictionary::new(), std::io::Cursor::new(vec![1u8; 33]), &mut writer);
    let obj = ids.stream(stream);
    writer.add_object(&obj).unwrap();
    assert_eq!(
        obj.as_stream().unwrap().written_length(),
        Some(encryption.calculate_stream_size(33) as u64)
    );
}

#[test]
fn test_crypt_filter_stream_is_exempt() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    dict.put("Filter", ids.name("Crypt"));
    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    writer.set_encryption(Some(PdfEncryption::aes128(&[7u8; 16]).unwrap()));
    writer
        .add_object(&ids.stream(stream_with(&ids, dict, 20)))
        .unwrap();
    let out = writer.close(&ids, PDFDictionary::new()).unwrap();
    assert_eq!(written_length(&out), 20);
    assert!(text(&out).contains(&"a".repeat(20)));
}

#[test]
fn test_embedded_files_only_scope() {
    let ids = IdAllocator::new();
    let encryption = PdfEncryption::rc4(b"12345").unwrap().with_embedded_files_only(true);

    let mut embedded = PDFDictionary::new();
    embedded.put("Type", ids.name("EmbeddedFile"));
    assert!(!encryption.is_exempt(&embedded));
    assert!(encryption.is_exempt(&PDFDictionary::new()));

    let mut writer = PdfWriter::new(Vec::new(), plain_params()).unwrap();
    writer.set_encryption(Some(encryption));
    writer
        .add_object(&ids.stream(stream_with(&ids, PDFDictionary::new(), 12)))
        .unwrap();
    let out = writer.close(&ids, PDFDictionary::new()).unwrap();
    assert!(text(&out).contains(&"a".repeat(12)));
}

#[test]
fn test_key_length_validation() {
    assert!(matches!(PdfEncryption::rc4(b"1234"), Err(PdfError::EncryptionError(_))));
    assert!(PdfEncryption::rc4(&[0u8; 16]).is_ok());
    assert!(matches!(PdfEncryption::rc4(&[0u8; 17]), Err(PdfError::EncryptionError(_))));
    assert!(matches!(PdfEncryption::aes128(&[0u8; 15]), Err(PdfError::EncryptionError(_))));
}

#[test]
fn test_aes_roundtrip_per_object() {
    let encryption = PdfEncryption::aes128(&[3u8; 16]).unwrap();
    let reference = PDFObjRef::new(12, 0);
    let sealed = encryption.encrypt(reference, b"secret payload").unwrap();
    assert_eq!(sealed.len(), encryption.calculate_stream_size(14));
    assert_eq!(encryption.decrypt(reference, &sealed).unwrap(), b"secret payload");
    // Another object's key does not open it.
    assert_ne!(
        encryption.decrypt(PDFObjRef::new(13, 0), &sealed).ok().as_deref(),
        Some(&b"secret payload"[..])
    );
}

#[test]
fn test_object_key_length() {
    let reference = PDFObjRef::new(1, 0);
    assert_eq!(PdfEncryption::rc4(b"12345").unwrap().object_key(reference).len(), 10);
    assert_eq!(PdfEncryption::aes128(&[0u8; 16]).unwrap().object_key(reference).len(), 16);
}
