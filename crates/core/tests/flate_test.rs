//! Flate codec tests.

use flate2::Compression;
use vellum_core::codec::flate::{flate_decode, flate_encode};
use vellum_core::{CompressionParams, FilterRegistry, IdAllocator, NoResolver, PDFDictionary, PDFStream, PdfError};

#[test]
fn test_hello_pdf_stream() {
    let ids = IdAllocator::new();
    let mut stream = PDFStream::new(&ids, PDFDictionary::new(), &b"Hello, PDF!"[..]);
    assert!(stream.flate_compress(&ids, &CompressionParams::default()).unwrap());
    assert_ne!(stream.raw_data().unwrap(), b"Hello, PDF!");

    let decoded = stream
        .decoded_data(&NoResolver, &FilterRegistry::with_defaults())
        .unwrap();
    assert_eq!(decoded.len(), 11);
    assert_eq!(decoded, b"Hello, PDF!");
}

#[test]
fn test_known_zlib_stream() {
    // zlib.compress(b"hello")
    let encoded = hex::decode("789ccb48cdc9c90700062c0215").unwrap();
    assert_eq!(flate_decode(&encoded).unwrap(), b"hello");
}

#[test]
fn test_roundtrip_at_every_level() {
    let data: Vec<u8> = b"stream filters ".iter().copied().cycle().take(5000).collect();
    for level in 0..=9 {
        let encoded = flate_encode(&data, Compression::new(level)).unwrap();
        assert_eq!(flate_decode(&encoded).unwrap(), data, "level {level}");
    }
}

#[test]
fn test_empty_input_roundtrip() {
    let encoded = flate_encode(b"", Compression::default()).unwrap();
    assert_eq!(flate_decode(&encoded).unwrap(), b"");
}

#[test]
fn test_corrupt_stream_is_error() {
    assert!(matches!(
        flate_decode(b"not zlib at all"),
        Err(PdfError::DecodeError(_))
    ));
    assert!(matches!(flate_decode(b""), Err(PdfError::DecodeError(_))));
}
