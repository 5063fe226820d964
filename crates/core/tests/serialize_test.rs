//! Serialization to PDF syntax.

use vellum_core::model::serialize::format_number;
use vellum_core::{
    IdAllocator, PDFDictionary, PDFObjRef, PDFObject, PDFParser, PDFStream, PDFString,
    PdfEncryption, WriterContext,
};

fn serialize(obj: &PDFObject) -> String {
    String::from_utf8(obj.to_bytes().unwrap()).unwrap()
}

fn reserialize(data: &[u8]) -> String {
    let ids = IdAllocator::new();
    let obj = PDFParser::new(data, &ids).read_object().unwrap().unwrap();
    serialize(&obj)
}

#[test]
fn test_catalog_dictionary() {
    let ids = IdAllocator::new();
    let obj = PDFParser::new(b"<< /Type /Catalog /Pages 3 0 R >>", &ids)
        .read_object()
        .unwrap()
        .unwrap();
    let dict = obj.as_dict().unwrap();
    assert_eq!(dict.len(), 2);
    let (key, value) = dict.iter().nth(1).unwrap();
    assert_eq!(key, "Pages");
    assert_eq!(value.as_reference(), Some(PDFObjRef::new(3, 0)));

    insta::assert_snapshot!(serialize(&obj), @"<</Type/Catalog/Pages 3 0 R>>");
}

#[test]
fn test_every_parsed_variant() {
    insta::assert_snapshot!(
        reserialize(b"[ null true false 42 -1.5 /N (lit) <6869> 3 0 R << /K [ ] >> ]"),
        @"[null true false 42 -1.5/N(lit)<6869> 3 0 R<</K[]>>]"
    );
}

#[test]
fn test_reserialized_output_parses_back() {
    let source = b"<< /A [1 2.5 (x\\)y)] /B << /C /D#20E >> /F <00ff> >>";
    let once = reserialize(source);
    let twice = reserialize(once.as_bytes());
    assert_eq!(once, twice);
    insta::assert_snapshot!(once, @"<</A[1 2.5(x\\)y)]/B<</C/D#20E>>/F<00FF>>>");
}

#[test]
fn test_name_bytes_survive_reserialization() {
    assert_eq!(reserialize(b"/A#E9"), "/A#E9");
    assert_eq!(reserialize(b"/A#20B"), "/A#20B");
    assert_eq!(reserialize(b"/Gr#C3#BC#C3#9Fe"), "/Gr#C3#BC#C3#9Fe");
    assert_eq!(reserialize(b"<< /K#FF /V#80#81 >>"), "<</K#FF/V#80#81>>");
}

#[test]
fn test_stream_layout() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    dict.put("Type", ids.name("XObject"));
    let stream = ids.stream(PDFStream::new(&ids, dict, &b"abc"[..]));
    assert_eq!(
        serialize(&stream),
        "<</Type/XObject/Length 3>>stream\nabc\nendstream"
    );
}

#[test]
fn test_numbers_never_use_exponents() {
    assert_eq!(format_number(1.0), "1");
    assert_eq!(format_number(612.0), "612");
    assert_eq!(format_number(0.25), "0.25");
    assert_eq!(format_number(1e20), "100000000000000000000");
    assert_eq!(format_number(-0.000015), "-0.000015");
}

#[test]
fn test_literal_string_escapes() {
    let ids = IdAllocator::new();
    let s = ids.bytes(b"a\\b\tc\x07(d".to_vec());
    insta::assert_snapshot!(serialize(&s), @r"(a\\b\tc\007\(d)");
}

#[test]
fn test_hex_flag() {
    let ids = IdAllocator::new();
    let s = ids.string(PDFString::from_bytes(vec![0x01, 0xAB]).with_hex(true));
    assert_eq!(serialize(&s), "<01AB>");
}

#[test]
fn test_reference_and_scalars() {
    let ids = IdAllocator::new();
    assert_eq!(serialize(&ids.reference(PDFObjRef::new(12, 3))), "12 3 R");
    assert_eq!(serialize(&ids.null()), "null");
    assert_eq!(serialize(&ids.boolean(false)), "false");
    assert_eq!(serialize(&ids.name("Lime Green")), "/Lime#20Green");
}

#[test]
fn test_encrypted_string_needs_current_object() {
    let ids = IdAllocator::new();
    let enc = PdfEncryption::rc4(b"\x01\x02\x03\x04\x05").unwrap();
    let s = ids.bytes(b"secret".to_vec());

    let ctx = WriterContext::new(Some(&enc), None);
    let mut out = Vec::new();
    assert!(s.to_pdf(Some(&ctx), &mut out).is_err());

    let reference = PDFObjRef::new(3, 0);
    let ctx = WriterContext::new(Some(&enc), Some(reference));
    let mut out = Vec::new();
    s.to_pdf(Some(&ctx), &mut out).unwrap();
    let ids2 = IdAllocator::new();
    let parsed = PDFParser::new(&out, &ids2).read_object().unwrap().unwrap();
    let cipher = parsed.as_string().unwrap().as_bytes();
    assert_ne!(cipher, b"secret");
    assert_eq!(enc.decrypt(reference, cipher).unwrap(), b"secret");
}
