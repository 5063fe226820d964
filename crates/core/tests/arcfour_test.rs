//! RC4 known-answer vectors.

use vellum_core::codec::arcfour::Arcfour;

#[test]
fn test_arcfour_key() {
    let mut cipher = Arcfour::new(b"Key").unwrap();
    let result = cipher.process(b"Plaintext");
    assert_eq!(hex::encode(result), "bbf316e8d940af0ad3");
}

#[test]
fn test_arcfour_wiki() {
    let mut cipher = Arcfour::new(b"Wiki").unwrap();
    let result = cipher.process(b"pedia");
    assert_eq!(hex::encode(result), "1021bf0420");
}

#[test]
fn test_arcfour_secret() {
    let mut cipher = Arcfour::new(b"Secret").unwrap();
    let result = cipher.process(b"Attack at dawn");
    assert_eq!(hex::encode(result), "45a01f645fc35b383552544b9bf5");
}

#[test]
fn test_arcfour_in_place_matches_process() {
    let mut a = Arcfour::new(b"Secret").unwrap();
    let mut b = Arcfour::new(b"Secret").unwrap();
    let mut buf = b"Attack at dawn".to_vec();
    b.process_in_place(&mut buf[..6]);
    b.process_in_place(&mut buf[6..]);
    assert_eq!(buf, a.process(b"Attack at dawn"));
}

#[test]
fn test_arcfour_rejects_empty_key() {
    assert!(Arcfour::new(b"").is_err());
}
