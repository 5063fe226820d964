//! Tokenizer tests.

use vellum_core::parser::lexer::Keyword;
use vellum_core::{Lexer, PDFObjRef, PdfError, Token};

fn tokens(data: &[u8]) -> Vec<Token> {
    Lexer::new(data).map(|t| t.unwrap().1).collect()
}

#[test]
fn test_numbers() {
    assert_eq!(
        tokens(b"1 -2 +3 4.5 -.5 6. 0"),
        vec![
            Token::Integer(1),
            Token::Integer(-2),
            Token::Integer(3),
            Token::Real(4.5),
            Token::Real(-0.5),
            Token::Real(6.0),
            Token::Integer(0),
        ]
    );
}

#[test]
fn test_integer_overflow_becomes_real() {
    assert_eq!(
        tokens(b"99999999999999999999"),
        vec![Token::Real(99999999999999999999.0)]
    );
}

#[test]
fn test_names_with_escapes() {
    assert_eq!(
        tokens(b"/Type /A#20B /Lime#20Green /#zz"),
        vec![
            Token::Name("Type".into()),
            Token::Name("A B".into()),
            Token::Name("Lime Green".into()),
            Token::Name("zz".into()),
        ]
    );
}

#[test]
fn test_literal_string_escapes() {
    let toks = tokens(b"(a\\(b\\)c) (nested (parens) ok) (\\101\\102\\n) (line\\\ncontinued)");
    let strings: Vec<Vec<u8>> = toks
        .into_iter()
        .map(|t| match t {
            Token::String { bytes, hex: false } => bytes,
            other => panic!("expected literal string, got {other:?}"),
        })
        .collect();
    assert_eq!(strings[0], b"a(b)c");
    assert_eq!(strings[1], b"nested (parens) ok");
    assert_eq!(strings[2], b"AB\n");
    assert_eq!(strings[3], b"linecontinued");
}

#[test]
fn test_hex_string_odd_nibble() {
    assert_eq!(
        tokens(b"<48 65 6C6C6F> <ABC>"),
        vec![
            Token::String {
                bytes: b"Hello".to_vec(),
                hex: true
            },
            Token::String {
                bytes: vec![0xAB, 0xC0],
                hex: true
            },
        ]
    );
}

#[test]
fn test_bad_hex_digit_is_token_error() {
    let result: Result<Vec<_>, _> = Lexer::new(b"<4G>").collect();
    assert!(matches!(result, Err(PdfError::TokenError { .. })));
}

#[test]
fn test_lone_closers_are_token_errors() {
    for input in [&b")"[..], b">"] {
        let first = Lexer::new(input).next().unwrap();
        assert!(
            matches!(first, Err(PdfError::TokenError { pos: 0, .. })),
            "{input:?}"
        );
    }
}

#[test]
fn test_unterminated_string_is_eof() {
    let first = Lexer::new(b"(abc").next().unwrap();
    assert!(matches!(first, Err(PdfError::UnexpectedEof)));
}

#[test]
fn test_delimiters_and_keywords() {
    assert_eq!(
        tokens(b"<< /K [true false null] >> obj endobj"),
        vec![
            Token::DictStart,
            Token::Name("K".into()),
            Token::ArrayStart,
            Token::Keyword(Keyword::True),
            Token::Keyword(Keyword::False),
            Token::Keyword(Keyword::Null),
            Token::ArrayEnd,
            Token::DictEnd,
            Token::Keyword(Keyword::Obj),
            Token::Keyword(Keyword::EndObj),
        ]
    );
}

#[test]
fn test_reference_collapses_three_tokens() {
    assert_eq!(
        tokens(b"[1 0 R 2 0 R 3]"),
        vec![
            Token::ArrayStart,
            Token::Ref(PDFObjRef::new(1, 0)),
            Token::Ref(PDFObjRef::new(2, 0)),
            Token::Integer(3),
            Token::ArrayEnd,
        ]
    );
}

#[test]
fn test_integers_without_r_stay_integers() {
    assert_eq!(
        tokens(b"0 0 612 792"),
        vec![
            Token::Integer(0),
            Token::Integer(0),
            Token::Integer(612),
            Token::Integer(792),
        ]
    );
}

#[test]
fn test_comments_are_tokens() {
    assert_eq!(
        tokens(b"%PDF-1.7\n1 % trailing\r\n2"),
        vec![
            Token::Comment(b"PDF-1.7".to_vec()),
            Token::Integer(1),
            Token::Comment(b" trailing".to_vec()),
            Token::Integer(2),
        ]
    );
}

#[test]
fn test_positions() {
    let mut lexer = Lexer::new(b"  /Name  (str)");
    let (pos, _) = lexer.next_token().unwrap().unwrap();
    assert_eq!(pos, 2);
    assert_eq!(lexer.tell(), 7);
    let (pos, _) = lexer.next_token().unwrap().unwrap();
    assert_eq!(pos, 9);
    assert!(lexer.next_token().is_none());
}
