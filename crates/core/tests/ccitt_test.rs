//! CCITTFaxDecode through stream dictionaries.

use vellum_core::codec::ccitt::{
    CcittParams, MAX_DIMENSION, ccittfaxdecode, decode_with_params,
};
use vellum_core::{FilterRegistry, IdAllocator, NoResolver, PDFDictionary, PdfError};

fn image_dict(ids: &IdAllocator, width: i64, height: i64) -> PDFDictionary {
    let mut dict = PDFDictionary::new();
    dict.put("Width", ids.int(width));
    dict.put("Height", ids.int(height));
    dict
}

fn parms(ids: &IdAllocator, entries: &[(&str, i64)]) -> PDFDictionary {
    entries
        .iter()
        .map(|&(key, value)| (key.to_string(), ids.int(value)))
        .collect()
}

#[test]
fn test_group3_one_dimensional() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 8, 2);
    // Each row: 2 white, 4 black, 2 white.
    let out = ccittfaxdecode(&[0x76, 0xEE, 0xDC], None, &dict).unwrap();
    assert_eq!(out, vec![0xC3, 0xC3]);
}

#[test]
fn test_black_is_1_inverts_output() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 8, 2);
    let mut params = PDFDictionary::new();
    params.put("BlackIs1", ids.boolean(true));
    let out = ccittfaxdecode(&[0x76, 0xEE, 0xDC], Some(&params), &dict).unwrap();
    assert_eq!(out, vec![0x3C, 0x3C]);
}

#[test]
fn test_group4() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 8, 2);
    let params = parms(&ids, &[("K", -1)]);
    let out = ccittfaxdecode(&[0x2E, 0xFC], Some(&params), &dict).unwrap();
    assert_eq!(out, vec![0xC3, 0xC3]);
}

#[test]
fn test_columns_and_rows_override_image_size() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 100, 100);
    let params = parms(&ids, &[("K", -1), ("Columns", 8), ("Rows", 1)]);
    let out = ccittfaxdecode(&[0x2E, 0xE0], Some(&params), &dict).unwrap();
    assert_eq!(out, vec![0xC3]);
}

#[test]
fn test_missing_rows_are_white() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 8, 3);
    let out = ccittfaxdecode(&[0x98], None, &dict).unwrap();
    assert_eq!(out, vec![0xFF, 0xFF, 0xFF]);
}

#[test]
fn test_width_and_height_are_required() {
    let ids = IdAllocator::new();
    let mut no_height = PDFDictionary::new();
    no_height.put("Width", ids.int(8));
    assert!(matches!(
        ccittfaxdecode(&[0x98], None, &no_height),
        Err(PdfError::UnsupportedFormat(_))
    ));

    let zero_width = image_dict(&ids, 0, 2);
    assert!(matches!(
        CcittParams::from_dicts(None, &zero_width),
        Err(PdfError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_params_defaults() {
    let ids = IdAllocator::new();
    let params = CcittParams::from_dicts(None, &image_dict(&ids, 1728, 10)).unwrap();
    assert_eq!(params.k, 0);
    assert_eq!(params.columns, 1728);
    assert_eq!(params.rows, 10);
    assert!(!params.black_is_1);
    assert!(!params.encoded_byte_align);
    assert!(params.end_of_block);
}

#[test]
fn test_invalid_group4_data() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 8, 1);
    let params = parms(&ids, &[("K", -1)]);
    assert!(matches!(
        ccittfaxdecode(&[0x01, 0xFF], Some(&params), &dict),
        Err(PdfError::DecodeError(_))
    ));
}

#[test]
fn test_registry_abbreviation() {
    let ids = IdAllocator::new();
    let mut dict = image_dict(&ids, 8, 2);
    dict.put("Filter", ids.name("CCF"));
    dict.put("DecodeParms", ids.dict(parms(&ids, &[("K", -1)])));
    let out = FilterRegistry::with_defaults()
        .decode(&[0x2E, 0xFC], &dict, &NoResolver)
        .unwrap();
    assert_eq!(out, vec![0xC3, 0xC3]);
}

#[test]
fn test_oversized_image_is_rejected_before_decoding() {
    let ids = IdAllocator::new();
    let dict = image_dict(&ids, 1 << 40, 1 << 40);
    assert!(matches!(
        ccittfaxdecode(&[0x00], None, &dict),
        Err(PdfError::DecodeError(_))
    ));

    let dict = image_dict(&ids, 8, 2);
    let params = parms(&ids, &[("Columns", i64::MAX)]);
    assert!(matches!(
        ccittfaxdecode(&[0x00], Some(&params), &dict),
        Err(PdfError::DecodeError(_))
    ));
}

#[test]
fn test_bitmap_size_is_capped() {
    let ids = IdAllocator::new();
    // Each side is in range but the packed bitmap is 128 GiB.
    let side = MAX_DIMENSION as i64;
    let dict = image_dict(&ids, side, side);
    assert!(CcittParams::from_dicts(None, &dict).is_err());

    let params = CcittParams {
        k: 0,
        columns: MAX_DIMENSION + 1,
        rows: 1,
        black_is_1: false,
        encoded_byte_align: false,
        end_of_block: true,
    };
    assert!(matches!(
        decode_with_params(&[0x00], &params),
        Err(PdfError::DecodeError(_))
    ));
}
