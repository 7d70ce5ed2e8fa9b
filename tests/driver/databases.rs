// Opening indexes, multi-index docids, statistics and persistence

use crate::common::helpers::term_query;
use crate::common::{read_rows, Edit, Schema, TestSession};
use lexport::driver::codec::Decoder;
use lexport::driver::opcodes::Opcode;

const READ_OPEN: u8 = 0;
const WRITE_CREATE: u8 = 2;
const WRITE_CREATE_OR_OVERWRITE: u8 = 3;
const WRITE_OPEN: u8 = 4;

fn build_index(t: &mut TestSession, path: &str, data: &[&str]) {
    t.open_writable(path);
    for d in data {
        t.add(&Edit::new().data(d.as_bytes()).add_term("all", 1));
    }
    t.call(Opcode::Close, |_| {}).body();
}

#[test]
fn test_open_modes() {
    let mut t = TestSession::new();

    assert_eq!(t.open(WRITE_OPEN, "missing").error(), (7, 3));
    assert_eq!(t.open(READ_OPEN, "missing").error(), (7, 3));
    assert_eq!(t.open(WRITE_CREATE, "").error().0, 2);

    t.open(WRITE_CREATE, "fresh").body();
    t.add(&Edit::new().add_term("x", 1));
    t.call(Opcode::Close, |_| {}).body();
    assert_eq!(t.open(WRITE_CREATE, "fresh").error(), (7, 3));

    t.open(WRITE_OPEN, "fresh").body();
    assert_eq!(t.doccount(), 1);

    // Adding a read-only index next to a writable one is refused
    assert_eq!(t.open(READ_OPEN, "fresh").error(), (7, 6));

    t.open(WRITE_CREATE_OR_OVERWRITE, "fresh").body();
    assert_eq!(t.doccount(), 0);
}

#[test]
fn test_reads_need_an_open_index() {
    let mut t = TestSession::new();
    let reply = t.call(Opcode::GetDocumentById, |e| {
        e.write_u32(1);
        Schema::new(Schema::DOCUMENT).data().encode(e);
    });
    assert_eq!(reply.error(), (7, 5));
    assert_eq!(t.call(Opcode::LastDocId, |_| {}).u32(), 0);
}

#[test]
fn test_documents_survive_a_new_session() {
    let mut t = TestSession::new();
    t.open_writable("persist");
    t.add(&Edit::new().data(b"kept").add_term("Qkept", 1));
    t.call(Opcode::SetMetadata, |e| {
        e.write_string("owner");
        e.write_bytes(b"tests");
    })
    .body();
    let uuid = t
        .call(Opcode::DbInfo, |e| {
            e.write_u8(15);
            e.write_u8(0);
        })
        .body();

    t.restart();
    t.open(READ_OPEN, "persist").body();
    let body = t
        .call(Opcode::DbInfo, |e| {
            e.write_u8(2);
            e.write_u8(16);
            e.write_string("owner");
            e.write_u8(15);
            e.write_u8(0);
        })
        .body();
    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_u32().unwrap(), 1);
    assert_eq!(dec.read_bytes().unwrap(), b"tests");
    let mut uuid_dec = Decoder::new(&uuid);
    assert_eq!(dec.read_string().unwrap(), uuid_dec.read_string().unwrap());
}

#[test]
fn test_cancelled_transaction_rolls_back() {
    let mut t = TestSession::new();
    t.open_writable("txn");
    t.add(&Edit::new().add_term("before", 1));

    t.call(Opcode::StartTransaction, |_| {}).body();
    assert_eq!(t.call(Opcode::StartTransaction, |_| {}).error(), (7, 6));
    t.add(&Edit::new().add_term("during", 1));
    assert_eq!(t.doccount(), 2);
    t.call(Opcode::CancelTransaction, |_| {}).body();
    assert_eq!(t.doccount(), 1);

    t.call(Opcode::StartTransaction, |_| {}).body();
    t.add(&Edit::new().add_term("committed", 1));
    t.call(Opcode::CommitTransaction, |_| {}).body();
    assert_eq!(t.doccount(), 2);

    assert_eq!(t.call(Opcode::CommitTransaction, |_| {}).error(), (7, 6));
}

#[test]
fn test_multiple_indexes_interleave_docids() {
    let mut t = TestSession::new();
    build_index(&mut t, "first", &["a1", "a2"]);
    build_index(&mut t, "second", &["b1"]);

    t.open(READ_OPEN, "first").body();
    t.open(READ_OPEN, "second").body();
    assert_eq!(t.doccount(), 3);
    assert_eq!(t.call(Opcode::LastDocId, |_| {}).u32(), 3);

    let body = t
        .call(Opcode::QueryPage, |e| {
            e.write_u32(0);
            e.write_u32(10);
            term_query(e, "all");
            Schema::new(Schema::BOTH)
                .multi_docid()
                .db_number()
                .docid()
                .data()
                .encode(e);
        })
        .body();
    let mut dec = Decoder::new(&body);
    let count = dec.read_u32().unwrap();
    let mut rows: Vec<(u32, u32, u32, Vec<u8>)> = (0..count)
        .map(|_| {
            (
                dec.read_u32().unwrap(),
                dec.read_u32().unwrap(),
                dec.read_u32().unwrap(),
                dec.read_bytes().unwrap(),
            )
        })
        .collect();
    rows.sort();
    assert_eq!(
        rows,
        vec![
            (1, 0, 1, b"a1".to_vec()),
            (2, 1, 2, b"b1".to_vec()),
            (3, 0, 3, b"a2".to_vec()),
        ]
    );

    // The iterator decoder reports docids within each index
    let body = t
        .call(Opcode::QueryPage, |e| {
            e.write_u32(0);
            e.write_u32(10);
            term_query(e, "all");
            Schema::new(Schema::ITERATOR).multi_docid().docid().encode(e);
        })
        .body();
    let mut dec = Decoder::new(&body);
    let count = dec.read_u32().unwrap();
    let mut pairs: Vec<(u32, u32)> = (0..count)
        .map(|_| (dec.read_u32().unwrap(), dec.read_u32().unwrap()))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(1, 1), (2, 1), (3, 2)]);

    let body = t
        .call(Opcode::GetDocumentById, |e| {
            e.write_u32(2);
            Schema::new(Schema::DOCUMENT).data().encode(e);
        })
        .body();
    assert_eq!(Decoder::new(&body).read_bytes().unwrap(), b"b1");
}

#[test]
fn test_db_info_statistics() {
    let mut t = TestSession::new();
    t.open_writable("stats");
    t.add(&Edit::new().add_term("cat", 1).add_value(0, "m"));
    t.add(&Edit::new().add_term("cat", 2).add_value(0, "b"));
    t.add(&Edit::new().posting("dog", 4, 1).add_value(1, "z"));

    let body = t
        .call(Opcode::DbInfo, |e| {
            e.write_u8(1); // HAS_POSITIONS
            e.write_u8(2); // DOCCOUNT
            e.write_u8(3); // LASTDOCID
            e.write_u8(4); // AVLENGTH
            e.write_u8(6); // TERM_FREQ
            e.write_string("cat");
            e.write_u8(7); // COLLECTION_FREQ
            e.write_string("cat");
            e.write_u8(8); // VALUE_FREQ
            e.write_u32(0);
            e.write_u8(9); // VALUE_LOWER_BOUND
            e.write_u32(0);
            e.write_u8(10); // VALUE_UPPER_BOUND
            e.write_u32(0);
            e.write_u8(11); // DOCLENGTH_LOWER_BOUND
            e.write_u8(12); // DOCLENGTH_UPPER_BOUND
            e.write_u8(13); // WDF_UPPER_BOUND
            e.write_string("cat");
            e.write_u8(14); // DOCLENGTH
            e.write_u32(2);
            e.write_u8(0);
        })
        .body();

    let mut dec = Decoder::new(&body);
    assert!(dec.read_bool().unwrap());
    assert_eq!(dec.read_u32().unwrap(), 3);
    assert_eq!(dec.read_u32().unwrap(), 3);
    assert!((dec.read_f64().unwrap() - 4.0 / 3.0).abs() < 1e-9);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_u32().unwrap(), 3);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_bytes().unwrap(), b"b");
    assert_eq!(dec.read_bytes().unwrap(), b"m");
    assert_eq!(dec.read_u32().unwrap(), 1);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert!(dec.is_empty());

    // Missing document
    let reply = t.call(Opcode::DbInfo, |e| {
        e.write_u8(14);
        e.write_u32(99);
        e.write_u8(0);
    });
    assert_eq!(reply.error(), (7, 2));
}

#[test]
fn test_mset_info() {
    let mut t = TestSession::new();
    t.open_writable("mset");
    t.add(&Edit::new().add_term("cat", 1).add_term("pad", 3));
    t.add(&Edit::new().add_term("cat", 2));
    t.add(&Edit::new().add_term("dog", 1));

    let mset = t.match_all_terms(|e| term_query(e, "cat"));
    let body = t
        .call(Opcode::MSetInfo, |e| {
            e.write_u32(mset);
            e.write_u8(7); // SIZE
            e.write_u8(2); // MATCHES_ESTIMATED
            e.write_u8(11); // TERM_FREQ
            e.write_string("cat");
            e.write_u8(9); // MAX_ATTAINED
            e.write_u8(8); // MAX_POSSIBLE
            e.write_u8(0);
        })
        .body();
    let mut dec = Decoder::new(&body);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_u32().unwrap(), 2);
    assert_eq!(dec.read_u32().unwrap(), 2);
    let attained = dec.read_f64().unwrap();
    let possible = dec.read_f64().unwrap();
    assert!(attained > 0.0);
    assert!(possible >= attained);

    // Rows come back in rank order with percentages
    let body = t
        .call(Opcode::QlcInit, |e| {
            e.write_u8(0);
            e.write_u8(2);
            e.write_u32(mset);
            e.write_u8(1); // ITERATOR
            e.write_u8(5); // RANK
            e.write_u8(6); // PERCENT
            e.write_u8(0);
        })
        .body();
    let cursor = Decoder::new(&body).read_u32().unwrap();
    let rows = read_rows(&t.next_portion(cursor, 0, 10), |d| {
        (d.read_u32().unwrap(), d.read_u8().unwrap())
    });
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], (0, 100));
    assert_eq!(rows[1].0, 1);

    // A term outside the query has no statistics
    let reply = t.call(Opcode::MSetInfo, |e| {
        e.write_u32(mset);
        e.write_u8(10);
        e.write_string("dog");
        e.write_u8(0);
    });
    assert_eq!(reply.error(), (7, 1));
}

#[test]
fn test_remote_backends_are_unavailable() {
    let mut t = TestSession::new();
    let reply = t.call(Opcode::OpenProg, |e| {
        e.write_u8(READ_OPEN);
        e.write_string("remote-index");
        e.write_string("--stdio");
        e.write_u32(1000);
    });
    assert_eq!(reply.error(), (7, 7));
}
