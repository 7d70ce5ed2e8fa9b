// Matching against a small indexed corpus

use lexport::core::engine::{
    DocidOrder, Document, Enquire, IndexEngine, LocalEngine, MSet, MultiValueKeyMaker, OpenMode,
    Query, SortOrder, ValueCountMatchSpy, Weighting,
};
use lexport::core::sortable;
use lexport::core::text::{ParserFlags, QueryParser, Stemmer, TermGenerator};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const PRICE: u32 = 0;
const CATEGORY: u32 = 1;

/// Five documents: text, a sortable price and a category
fn corpus(temp: &TempDir) -> LocalEngine {
    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::Create, Path::new("corpus")).unwrap();

    let rows = [
        ("the quick brown fox", 10.0, "animal"),
        ("a brown dog sleeps", 3.0, "animal"),
        ("quick thinking wins", -1.5, "idea"),
        ("fox hunting is banned", 7.25, "law"),
        ("quickly quicker quickest", 0.0, "idea"),
    ];
    for (text, price, category) in rows {
        let mut doc = Document::new();
        let mut generator = TermGenerator::new(Stemmer::none());
        generator.index_text(&mut doc, text, 1, "");
        doc.add_value(PRICE, sortable::serialise(price).to_vec());
        doc.add_value(CATEGORY, category.as_bytes().to_vec());
        doc.set_data(text.as_bytes().to_vec());
        engine.add_document(doc).unwrap();
    }
    engine
}

fn run(engine: &LocalEngine, enquire: &Enquire) -> MSet {
    enquire.get_mset(engine, 0, 100, &mut []).unwrap()
}

fn docids(mset: &MSet) -> Vec<u32> {
    mset.items().iter().map(|item| item.docid).collect()
}

fn parsed(engine: &LocalEngine, text: &str, flags: ParserFlags) -> Enquire {
    let query = QueryParser::new()
        .parse_query(text, flags, "", Some(engine as &dyn IndexEngine))
        .unwrap();
    let mut enquire = Enquire::new();
    enquire.set_query(query, 0);
    enquire
}

#[test]
fn test_boolean_and_phrase_queries() {
    let temp = TempDir::new().unwrap();
    let engine = corpus(&temp);

    let mut and = docids(&run(&engine, &parsed(&engine, "quick AND fox", ParserFlags::DEFAULT)));
    and.sort();
    assert_eq!(and, vec![1]);

    let mut either = docids(&run(&engine, &parsed(&engine, "dog OR banned", ParserFlags::DEFAULT)));
    either.sort();
    assert_eq!(either, vec![2, 4]);

    let phrase = run(&engine, &parsed(&engine, "\"brown fox\"", ParserFlags::DEFAULT));
    assert_eq!(docids(&phrase), vec![1]);

    let hated = run(&engine, &parsed(&engine, "brown -dog", ParserFlags::DEFAULT));
    assert_eq!(docids(&hated), vec![1]);
}

#[test]
fn test_wildcard_expands_against_the_index() {
    let temp = TempDir::new().unwrap();
    let engine = corpus(&temp);

    let flags = ParserFlags::DEFAULT | ParserFlags::WILDCARD;
    let mut found = docids(&run(&engine, &parsed(&engine, "quick*", flags)));
    found.sort();
    assert_eq!(found, vec![1, 3, 5]);

    let mut limited = QueryParser::new();
    limited.set_max_wildcard_expansion(2);
    assert!(limited
        .parse_query("quick*", flags, "", Some(&engine as &dyn IndexEngine))
        .is_err());
}

#[test]
fn test_sort_by_sortable_value() {
    let temp = TempDir::new().unwrap();
    let engine = corpus(&temp);

    let mut enquire = Enquire::new();
    enquire.set_query(Query::term(""), 0);
    enquire.set_sort(SortOrder::Value {
        slot: PRICE,
        reverse: false,
    });
    // -1.5, 0.0, 3.0, 7.25, 10.0
    assert_eq!(docids(&run(&engine, &enquire)), vec![3, 5, 2, 4, 1]);

    enquire.set_sort(SortOrder::Value {
        slot: PRICE,
        reverse: true,
    });
    assert_eq!(docids(&run(&engine, &enquire)), vec![1, 4, 2, 5, 3]);

    let mut maker = MultiValueKeyMaker::new();
    maker.add_value(CATEGORY, false);
    maker.add_value(PRICE, true);
    enquire.set_sort(SortOrder::Key {
        maker: Arc::new(maker),
        reverse: false,
    });
    // animal (10, 3), idea (0, -1.5), law
    assert_eq!(docids(&run(&engine, &enquire)), vec![1, 2, 5, 3, 4]);
}

#[test]
fn test_collapse_and_docid_order() {
    let temp = TempDir::new().unwrap();
    let engine = corpus(&temp);

    let mut enquire = Enquire::new();
    enquire.set_query(Query::term(""), 0);
    enquire.set_weighting(Weighting::Bool);
    enquire.set_docid_order(DocidOrder::Descending);
    assert_eq!(docids(&run(&engine, &enquire)), vec![5, 4, 3, 2, 1]);

    enquire.set_collapse_key(CATEGORY, 1);
    let mset = run(&engine, &enquire);
    assert_eq!(docids(&mset), vec![5, 4, 2]);
    let counts: Vec<u32> = mset.items().iter().map(|i| i.collapse_count).collect();
    assert_eq!(counts, vec![1, 0, 1]);
    assert_eq!(mset.uncollapsed_estimated, 5);
    assert_eq!(mset.matches_estimated, 3);
    assert!(mset.items().iter().all(|i| i.percent == 100));
}

#[test]
fn test_match_spy_counts_once() {
    let temp = TempDir::new().unwrap();
    let engine = corpus(&temp);

    let mut enquire = Enquire::new();
    enquire.set_query(Query::term(""), 0);
    let mut spy = ValueCountMatchSpy::new(CATEGORY);
    enquire.get_mset(&engine, 0, 2, &mut [&mut spy]).unwrap();

    // Every match is observed, not only the returned page
    assert_eq!(spy.total(), 5);
    assert_eq!(
        spy.values(),
        vec![
            (b"animal".to_vec(), 2),
            (b"idea".to_vec(), 2),
            (b"law".to_vec(), 1)
        ]
    );
    assert_eq!(spy.top_values(1), vec![(b"animal".to_vec(), 2)]);

    assert!(spy.is_finalized());
    assert!(enquire.get_mset(&engine, 0, 2, &mut [&mut spy]).is_err());
    assert_eq!(engine.doccount(), 5);
}

/// Four documents of length 5 in which "a" occurs 1..=4 times
fn graded(temp: &TempDir) -> LocalEngine {
    let mut engine = LocalEngine::new(temp.path(), true);
    engine.open(OpenMode::Create, Path::new("graded")).unwrap();
    for wdf in 1..=4 {
        let mut doc = Document::new();
        doc.add_term("a", wdf);
        doc.add_term("pad", 5 - wdf);
        engine.add_document(doc).unwrap();
    }
    engine
}

#[test]
fn test_weight_cutoff_keeps_boundary() {
    let temp = TempDir::new().unwrap();
    let engine = graded(&temp);
    let mut enquire = Enquire::new();
    enquire.set_query(Query::term("a"), 0);

    let full = run(&engine, &enquire);
    assert_eq!(docids(&full), vec![4, 3, 2, 1]);
    let weights: Vec<f64> = full.items().iter().map(|i| i.weight).collect();
    assert!(weights.windows(2).all(|w| w[0] > w[1]));

    enquire.set_cutoff(0, weights[1]);
    let cut = run(&engine, &enquire);
    assert_eq!(docids(&cut), vec![4, 3]);
    assert_eq!(cut.matches_estimated, 2);
    assert_eq!(cut.uncollapsed_estimated, 2);
    assert_eq!(cut.max_attained, full.max_attained);

    // Above every weight
    enquire.set_cutoff(0, weights[0] * 2.0);
    let none = run(&engine, &enquire);
    assert!(none.items().is_empty());
    assert_eq!(none.matches_upper_bound, 0);
}

#[test]
fn test_percent_cutoff_keeps_boundary() {
    let temp = TempDir::new().unwrap();
    let engine = graded(&temp);
    let mut enquire = Enquire::new();
    enquire.set_query(Query::term("a"), 0);

    let full = run(&engine, &enquire);
    let percents: Vec<u8> = full.items().iter().map(|i| i.percent).collect();
    assert_eq!(percents[0], 100);
    assert!(percents[1] > percents[2]);

    enquire.set_cutoff(percents[1], 0.0);
    let cut = run(&engine, &enquire);
    assert_eq!(docids(&cut), vec![4, 3]);
    assert_eq!(cut.matches_lower_bound, 2);
    assert_eq!(cut.uncollapsed_upper_bound, 2);

    enquire.set_cutoff(100, 0.0);
    assert_eq!(docids(&run(&engine, &enquire)), vec![4]);

    // Both cutoffs apply together
    enquire.set_cutoff(percents[3], full.items()[2].weight);
    assert_eq!(docids(&run(&engine, &enquire)), vec![4, 3, 2]);
}
