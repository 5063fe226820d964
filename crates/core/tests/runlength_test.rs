//! RunLength codec tests.

use vellum_core::PdfError;
use vellum_core::codec::runlength::{rldecode, rlencode};

#[test]
fn test_rldecode_literal_and_repeat() {
    let input = b"\x05123456\xfa7\x04abcde\x80junk";
    assert_eq!(rldecode(input).unwrap(), b"1234567777777abcde");
}

#[test]
fn test_terminator_stops_output() {
    assert_eq!(rldecode(b"\x00A\x80\x00B").unwrap(), b"A");
    assert_eq!(rldecode(b"\x80\x02xyz").unwrap(), b"");
}

#[test]
fn test_missing_terminator_is_accepted() {
    assert_eq!(rldecode(b"\xffZ").unwrap(), b"ZZ");
}

#[test]
fn test_truncated_runs_are_errors() {
    assert!(matches!(rldecode(b"\x05abc"), Err(PdfError::DecodeError(_))));
    assert!(matches!(rldecode(b"\xfe"), Err(PdfError::DecodeError(_))));
}

#[test]
fn test_rlencode_output() {
    assert_eq!(rlencode(b"aaab"), b"\xfea\x00b\x80");
    assert_eq!(rlencode(b""), b"\x80");
}

#[test]
fn test_roundtrip_long_runs() {
    let mut data = vec![0u8; 300];
    data.extend(b"literal bytes that do not repeat");
    data.extend(std::iter::repeat_n(0xAA, 129));
    data.extend((0..=255u8).collect::<Vec<_>>());
    assert_eq!(rldecode(&rlencode(&data)).unwrap(), data);
}
