// End-to-end flows over the binary protocol

use crate::common::fixtures::full_term_schema;
use crate::common::helpers::term_query;
use crate::common::{read_rows, Edit, Schema, TestSession};
use lexport::driver::codec::Decoder;
use lexport::driver::opcodes::Opcode;

#[test]
fn test_add_then_query_returns_stored_value() {
    let mut t = TestSession::new();
    t.open_writable("scenario_a");

    let docid = t.add(&Edit::new().add_value(0, "42").add_term("cat", 1));
    assert_eq!(docid, 1);

    let body = t
        .call(Opcode::QueryPage, |e| {
            e.write_u32(0);
            e.write_u32(10);
            term_query(e, "cat");
            Schema::new(Schema::DOCUMENT).value(0).encode(e);
        })
        .body();

    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_u32().unwrap(), 1);
    assert_eq!(dec.read_u8().unwrap(), 0); // string value
    assert_eq!(dec.read_bytes().unwrap(), b"42");
    assert!(dec.is_empty());
}

#[test]
fn test_update_or_create_by_unique_term_never_duplicates() {
    let mut t = TestSession::new();
    t.open_writable("scenario_b");

    let first = t.add(&Edit::new().add_term("key:1", 1).data(b"v1"));

    let updated = t
        .call(Opcode::UpdateOrCreateDocument, |e| {
            Edit::new().data(b"v2").encode(e);
            e.write_u8(1);
            e.write_string("key:1");
        })
        .u32();
    // 0: the existing document was edited, none was added
    assert_eq!(updated, 0);
    assert_eq!(t.doccount(), 1);

    let body = t
        .call(Opcode::GetDocumentById, |e| {
            e.write_u32(first);
            Schema::new(Schema::DOCUMENT).data().encode(e);
        })
        .body();
    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_bytes().unwrap(), b"v2");
}

#[test]
fn test_term_list_cursor_page_and_lookup() {
    let mut t = TestSession::new();
    t.open_writable("scenario_c");

    let mut edit = Edit::new().add_term("Qdoc", 1);
    for term in ["elder", "apple", "date", "banana"] {
        edit = edit.add_term(term, 1);
    }
    t.add(&edit);
    let doc = t.document_by_term("Qdoc");

    let body = t
        .call(Opcode::QlcInit, |e| {
            e.write_u8(1); // TERMS
            e.write_u8(0); // Document
            e.write_u32(doc);
            e.write_u8(1); // TERM_VALUE
            e.write_u8(0);
        })
        .body();
    let mut dec = Decoder::new(&body);
    let cursor = dec.read_u32().unwrap();
    assert_eq!(dec.read_u32().unwrap(), 5);

    // Native order: Qdoc, apple, banana, date, elder
    let page = t.next_portion(cursor, 2, 2);
    let terms = read_rows(&page, |d| d.read_string().unwrap());
    assert_eq!(terms, vec!["banana", "date"]);

    let body = t
        .call(Opcode::QlcLookup, |e| {
            e.write_u32(cursor);
            e.write_string("date");
            e.write_string("banana");
            e.write_string("");
        })
        .body();
    let found = read_rows(&body, |d| d.read_string().unwrap());
    assert_eq!(found, vec!["banana", "date"]);
}

#[test]
fn test_text_indexing_and_statistics_flow() {
    let mut t = TestSession::new();
    t.open_writable("text");
    t.add(&Edit::new().stemmer("english").text("Running dogs run", 1, ""));
    t.add(&Edit::new().text("cats sleep", 1, "S"));

    let doc = t
        .call(Opcode::Document, |e| {
            e.write_u8(0);
            e.write_u32(1);
        })
        .u32();
    let body = t
        .call(Opcode::QlcInit, |e| {
            e.write_u8(1);
            e.write_u8(0);
            e.write_u32(doc);
            full_term_schema(e);
        })
        .body();
    let mut dec = Decoder::new(&body);
    let cursor = dec.read_u32().unwrap();
    let size = dec.read_u32().unwrap();

    let rows = read_rows(&t.next_portion(cursor, 0, size), |d| {
        let term = d.read_string().unwrap();
        let wdf = d.read_u32().unwrap();
        let freq = d.read_u32().unwrap();
        let positions: Vec<u32> = (0..d.read_u32().unwrap())
            .map(|_| d.read_u32().unwrap())
            .collect();
        (term, wdf, freq, positions)
    });

    let run = rows.iter().find(|r| r.0 == "running").expect("unstemmed term");
    assert_eq!(run.3, vec![1]);
    let stem = rows.iter().find(|r| r.0 == "Zrun").expect("stemmed term");
    assert_eq!(stem.1, 2);
    assert!(stem.3.is_empty());
    assert_eq!(stem.2, 1);

    // The second document indexed its text under a prefix
    let body = t
        .call(Opcode::DbInfo, |e| {
            e.write_u8(5);
            e.write_string("Scats");
            e.write_u8(5);
            e.write_string("cats");
            e.write_u8(0);
        })
        .body();
    assert_eq!(body, vec![1, 0]);
}

#[test]
fn test_parsed_query_with_prefixes() {
    let mut t = TestSession::new();
    t.open_writable("parsed");
    t.add(&Edit::new().text("red apple", 1, "").text("fruit", 1, "XT"));
    t.add(&Edit::new().text("red car", 1, "").text("vehicle", 1, "XT"));

    t.call(Opcode::SetDefaultPrefixes, |e| {
        e.write_u32(1);
        e.write_string("type");
        e.write_string("XT");
        e.write_bool(true);
        e.write_bool(true);
    })
    .body();

    let body = t
        .call(Opcode::QueryPage, |e| {
            e.write_u32(0);
            e.write_u32(10);
            e.write_u8(5); // PARSER
            e.write_u8(0); // default parser
            e.write_string("red type:vehicle");
            e.write_string("");
            e.write_u8(12); // DEFAULT features
            e.write_u8(0);
            Schema::new(Schema::BOTH).docid().encode(e);
        })
        .body();
    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_u32().unwrap(), 1);
    assert_eq!(dec.read_u32().unwrap(), 2);
}
