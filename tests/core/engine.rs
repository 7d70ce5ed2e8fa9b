// LocalEngine behaviour across opens, shards and transactions

use lexport::core::engine::shard::Shard;
use lexport::core::engine::{
    DatabaseState, Document, EngineErrorKind, IndexEngine, LocalEngine, OpenMode,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn doc(data: &str, terms: &[&str]) -> Document {
    let mut d = Document::new();
    d.set_data(data.as_bytes().to_vec());
    for t in terms {
        d.add_term(t, 1);
    }
    d
}

fn build(temp: &TempDir, path: &str, docs: Vec<Document>) {
    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::Create, Path::new(path)).unwrap();
    for d in docs {
        engine.add_document(d).unwrap();
    }
    engine.close().unwrap();
}

#[test]
fn test_snapshot_round_trip() {
    let temp = TempDir::new().unwrap();
    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::CreateOrOpen, Path::new("idx")).unwrap();

    let mut d = doc("payload", &["alpha"]);
    d.add_posting("beta", 2, 1);
    d.add_value(3, vec![0u8, 255, 7]);
    let docid = engine.add_document(d).unwrap();
    engine.set_metadata("version", b"1").unwrap();
    let uuid = engine.uuid();
    engine.close().unwrap();
    assert_eq!(engine.state(), DatabaseState::Closed);

    assert!(Shard::exists(&temp.path().join("idx")));
    let summary = Shard::summarize(&temp.path().join("idx")).unwrap();
    assert_eq!(summary.doccount, 1);

    engine.open(OpenMode::Read, Path::new("idx")).unwrap();
    assert_eq!(engine.state(), DatabaseState::ReadOnly);
    assert_eq!(engine.uuid(), uuid);
    assert_eq!(engine.metadata("version"), b"1");

    let stored = engine.document(docid).unwrap();
    assert_eq!(stored.data(), b"payload");
    assert_eq!(stored.value(3), &[0u8, 255, 7]);
    assert!(stored.has_posting("beta", 2));
    assert!(stored.has_term("alpha"));
}

#[test]
fn test_corrupt_snapshot() {
    let temp = TempDir::new().unwrap();
    build(&temp, "broken", vec![doc("x", &["a"])]);
    fs::write(Shard::snapshot_path(&temp.path().join("broken")), "{ not json").unwrap();

    let mut engine = LocalEngine::new(temp.path(), true);
    let err = engine.open(OpenMode::Read, Path::new("broken")).unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::DatabaseCorrupt);
    assert_eq!(engine.state(), DatabaseState::Closed);
}

#[test]
fn test_three_shards_map_docids() {
    let temp = TempDir::new().unwrap();
    build(&temp, "s0", vec![doc("0.1", &["t"]), doc("0.2", &["t"])]);
    build(&temp, "s1", vec![doc("1.1", &["t"])]);
    build(&temp, "s2", vec![doc("2.1", &["t"]), doc("2.2", &["u"])]);

    let mut engine = LocalEngine::new(temp.path(), true);
    for path in ["s0", "s1", "s2"] {
        engine.open(OpenMode::Read, Path::new(path)).unwrap();
    }
    assert_eq!(engine.shard_count(), 3);
    assert_eq!(engine.doccount(), 5);

    // (sub - 1) * 3 + shard + 1
    let expect = [(1, "0.1"), (2, "1.1"), (3, "2.1"), (4, "0.2"), (6, "2.2")];
    for (docid, data) in expect {
        assert_eq!(engine.document(docid).unwrap().data(), data.as_bytes());
        assert_eq!(engine.document(docid).unwrap().docid(), docid);
    }
    assert_eq!(
        engine.document(5).unwrap_err().kind,
        EngineErrorKind::DocNotFound
    );
    assert_eq!(engine.postlist("t"), vec![1, 2, 3, 4]);
    assert_eq!(engine.last_docid(), 6);

    let candidates = engine.candidates();
    let two = candidates.iter().find(|c| c.docid == 6).unwrap();
    assert_eq!((two.db_number, two.sub_docid), (2, 2));

    // Read-only shards refuse writes
    let err = engine.add_document(doc("", &[])).unwrap_err();
    assert_eq!(err.kind, EngineErrorKind::InvalidOperation);
}

#[test]
fn test_write_open_replaces_read_shards() {
    let temp = TempDir::new().unwrap();
    build(&temp, "a", vec![doc("a", &[])]);
    build(&temp, "b", vec![doc("b", &[])]);

    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::Read, Path::new("a")).unwrap();
    engine.open(OpenMode::Read, Path::new("b")).unwrap();
    engine.open(OpenMode::Open, Path::new("b")).unwrap();
    assert_eq!(engine.state(), DatabaseState::Writable);
    assert_eq!(engine.shard_count(), 1);
    assert_eq!(engine.doccount(), 1);
}

#[test]
fn test_absolute_paths_ignore_data_dir() {
    let temp = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let path = elsewhere.path().join("abs");

    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::Create, &path).unwrap();
    engine.close().unwrap();
    assert!(Shard::exists(&path));
    assert!(!temp.path().join("abs").exists());
}

#[test]
fn test_transaction_rollback_restores_documents() {
    let temp = TempDir::new().unwrap();
    let mut engine = LocalEngine::new(temp.path(), false);
    engine.open(OpenMode::Create, Path::new("txn")).unwrap();
    let kept = engine.add_document(doc("kept", &["k"])).unwrap();

    engine.begin_transaction().unwrap();
    engine.delete_document(kept).unwrap();
    engine.add_document(doc("new", &["n"])).unwrap();
    engine.cancel_transaction().unwrap();

    assert_eq!(engine.doccount(), 1);
    assert_eq!(engine.document(kept).unwrap().data(), b"kept");
    assert!(engine.postlist("n").is_empty());
    assert_eq!(
        engine.cancel_transaction().unwrap_err().kind,
        EngineErrorKind::InvalidOperation
    );
}
