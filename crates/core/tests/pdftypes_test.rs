//! Tests for the object model: identity, dictionaries, arrays and
//! reference resolution.

use vellum_core::model::objects::{int_value, name_value};
use vellum_core::{
    IdAllocator, MAX_REFERENCE_HOPS, NoResolver, ObjectTable, PDFArray, PDFDictionary, PDFObjRef,
    PDFString, PdfError, Resolver, resolve_direct,
};

// === Identity ===

#[test]
fn test_ids_increase_in_creation_order() {
    let ids = IdAllocator::new();
    let a = ids.int(1);
    let b = ids.int(1);
    assert!(a.id() < b.id());
    assert_eq!(ids.allocated(), 2);
}

#[test]
fn test_equality_is_identity() {
    let ids = IdAllocator::new();
    let a = ids.name("Type");
    let b = ids.name("Type");
    assert_ne!(a, b);
    assert_eq!(a, a);
}

#[test]
fn test_duplicate_gets_fresh_identities() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    dict.put("Kids", ids.array(vec![ids.int(1), ids.int(2)].into()));
    let original = ids.dict(dict);

    let copy = original.duplicate(&ids).unwrap();
    assert_ne!(copy, original);
    let kids = copy.as_dict().unwrap().get("Kids").unwrap();
    let original_kids = original.as_dict().unwrap().get("Kids").unwrap();
    assert_ne!(kids, original_kids);
    assert_eq!(kids.as_array().unwrap().len(), 2);
}

// === Accessors ===

#[test]
fn test_number_accessors() {
    let ids = IdAllocator::new();
    assert_eq!(ids.int(42).as_int(), Some(42));
    assert_eq!(ids.number(-2.75).as_int(), Some(-2));
    assert_eq!(ids.number(0.5).as_number(), Some(0.5));
    assert_eq!(ids.number(f64::NAN).as_int(), None);
    assert_eq!(ids.name("X").as_int(), None);
}

#[test]
fn test_strict_accessors_report_types() {
    let ids = IdAllocator::new();
    let err = int_value(&ids.name("Page")).unwrap_err();
    assert!(matches!(
        err,
        PdfError::TypeError {
            expected: "int",
            got: "name"
        }
    ));
    assert_eq!(name_value(&ids.name("Page")).unwrap(), "Page");
}

#[test]
fn test_text_string_roundtrip() {
    let ids = IdAllocator::new();
    let s = ids.text("Hello");
    assert_eq!(s.as_string().unwrap().to_text(), "Hello");
    assert_eq!(s.as_string().unwrap().as_bytes(), PDFString::from_bytes(b"Hello".to_vec()).as_bytes());
}

// === Dictionary ===

#[test]
fn test_put_null_removes_key() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    dict.put("Type", ids.name("Catalog"));
    dict.put("Count", ids.int(3));
    assert_eq!(dict.len(), 2);

    dict.put("Type", ids.null());
    assert!(!dict.contains_key("Type"));
    assert_eq!(dict.len(), 1);

    // absent key stays absent
    dict.put("Missing", ids.null());
    assert_eq!(dict.len(), 1);
}

#[test]
fn test_dictionary_keeps_insertion_order() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    for key in ["Type", "Pages", "Outlines", "Names"] {
        dict.put(key, ids.int(0));
    }
    let keys: Vec<&str> = dict.keys().collect();
    assert_eq!(keys, ["Type", "Pages", "Outlines", "Names"]);
}

#[test]
fn test_typed_getters_return_none_on_mismatch() {
    let ids = IdAllocator::new();
    let mut dict = PDFDictionary::new();
    dict.put("Count", ids.int(5));
    dict.put("Type", ids.name("Pages"));
    dict.put("Open", ids.boolean(true));

    assert_eq!(dict.get_int("Count", &NoResolver), Some(5));
    assert_eq!(dict.get_name("Type", &NoResolver), Some("Pages"));
    assert_eq!(dict.get_bool("Open", &NoResolver), Some(true));
    assert!(dict.get_dict("Count", &NoResolver).is_none());
    assert!(dict.get_name("Count", &NoResolver).is_none());
    assert!(dict.get_array("Missing", &NoResolver).is_none());
}

#[test]
fn test_get_returns_reference_verbatim() {
    let ids = IdAllocator::new();
    let mut table = ObjectTable::new();
    table.insert(PDFObjRef::new(2, 0), ids.int(99));

    let mut dict = PDFDictionary::new();
    dict.put("Pages", ids.reference(PDFObjRef::new(2, 0)));

    assert_eq!(dict.get_reference("Pages"), Some(PDFObjRef::new(2, 0)));
    assert!(dict.get("Pages").unwrap().as_int().is_none());
    assert_eq!(dict.get_int("Pages", &table), Some(99));
}

// === Array ===

#[test]
fn test_array_preserves_order_and_duplicates() {
    let ids = IdAllocator::new();
    let mut array = PDFArray::new();
    array.add(ids.int(3));
    array.add(ids.null());
    array.add(ids.int(3));
    array.insert(0, ids.name("First"));

    assert_eq!(array.len(), 4);
    assert_eq!(array.get_name(0, &NoResolver), Some("First"));
    assert_eq!(array.get_int(1, &NoResolver), Some(3));
    assert!(array.get(2).unwrap().is_null());
    assert_eq!(array.get_int(3, &NoResolver), Some(3));
    assert!(array.get(4).is_none());
}

#[test]
fn test_array_contains_by_identity() {
    let ids = IdAllocator::new();
    let item = ids.int(1);
    let twin = ids.int(1);
    let array: PDFArray = vec![item].into();
    let member = array.get(0).unwrap();
    assert!(array.contains(member));
    assert!(!array.contains(&twin));
}

// === Resolution ===

#[test]
fn test_dangling_reference_resolves_to_none() {
    let ids = IdAllocator::new();
    let obj = ids.reference(PDFObjRef::new(7, 0));
    assert!(resolve_direct(&obj, &NoResolver).is_none());
}

#[test]
fn test_reference_chain_is_followed() {
    let ids = IdAllocator::new();
    let mut table = ObjectTable::new();
    table.insert(PDFObjRef::new(1, 0), ids.reference(PDFObjRef::new(2, 0)));
    table.insert(PDFObjRef::new(2, 0), ids.name("End"));

    let start = ids.reference(PDFObjRef::new(1, 0));
    assert_eq!(resolve_direct(&start, &table).and_then(|o| o.as_name()), Some("End"));
}

#[test]
fn test_reference_cycle_terminates() {
    let ids = IdAllocator::new();
    let mut table = ObjectTable::new();
    table.insert(PDFObjRef::new(1, 0), ids.reference(PDFObjRef::new(2, 0)));
    table.insert(PDFObjRef::new(2, 0), ids.reference(PDFObjRef::new(1, 0)));

    let start = ids.reference(PDFObjRef::new(1, 0));
    assert!(resolve_direct(&start, &table).is_none());
}

#[test]
fn test_reference_chain_over_hop_limit() {
    let ids = IdAllocator::new();
    let mut table = ObjectTable::new();
    let hops = MAX_REFERENCE_HOPS as u32 + 2;
    for n in 1..=hops {
        table.insert(PDFObjRef::new(n, 0), ids.reference(PDFObjRef::new(n + 1, 0)));
    }
    table.insert(PDFObjRef::new(hops + 1, 0), ids.int(1));

    let start = ids.reference(PDFObjRef::new(1, 0));
    assert!(resolve_direct(&start, &table).is_none());
}

#[test]
fn test_released_object_no_longer_resolves() {
    let ids = IdAllocator::new();
    let mut table = ObjectTable::new();
    let reference = PDFObjRef::new(3, 0);
    table.insert(reference, ids.int(3));
    assert!(table.resolve(&reference).is_some());

    let released = table.release(&reference).unwrap();
    assert_eq!(released.as_int(), Some(3));
    assert!(table.resolve(&reference).is_none());
    assert!(table.release(&reference).is_none());
}
