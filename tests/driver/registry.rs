// Handle lifecycle through CREATE_RESOURCE, RELEASE_RESOURCE and
// GET_RESOURCE_INFO

use crate::common::helpers::term_query;
use crate::common::{Edit, TestSession};
use lexport::driver::codec::{Decoder, Encoder};
use lexport::driver::opcodes::Opcode;

const WEIGHT: u8 = 4;
const MATCH_SPY: u8 = 11;

fn create(t: &mut TestSession, body: impl FnOnce(&mut Encoder)) -> (u8, u32) {
    let body = t.call(Opcode::CreateResource, body).body();
    let mut dec = Decoder::new(&body);
    (dec.read_u8().unwrap(), dec.read_u32().unwrap())
}

fn bool_weight(t: &mut TestSession) -> (u8, u32) {
    create(t, |e| e.write_string("bool_weight"))
}

fn release(t: &mut TestSession, kind: u8, handle: u32) -> crate::common::Reply {
    t.call(Opcode::ReleaseResource, |e| {
        e.write_u8(kind);
        e.write_u32(handle);
    })
}

fn resource_info(t: &mut TestSession) -> Vec<(u8, u32, String)> {
    let body = t.call(Opcode::GetResourceInfo, |_| {}).body();
    let mut dec = Decoder::new(&body);
    let count = dec.read_u32().unwrap();
    let list = (0..count)
        .map(|_| {
            (
                dec.read_u8().unwrap(),
                dec.read_u32().unwrap(),
                dec.read_string().unwrap(),
            )
        })
        .collect();
    assert!(dec.is_empty());
    list
}

#[test]
fn test_handles_are_unique_and_never_reissued() {
    let mut t = TestSession::new();

    assert_eq!(bool_weight(&mut t), (WEIGHT, 1));
    assert_eq!(bool_weight(&mut t), (WEIGHT, 2));
    release(&mut t, WEIGHT, 1).body();
    assert_eq!(bool_weight(&mut t), (WEIGHT, 3));

    // Types have separate handle spaces
    let spy = create(&mut t, |e| {
        e.write_string("value_count_match_spy");
        e.write_u32(0);
    });
    assert_eq!(spy, (MATCH_SPY, 1));
}

#[test]
fn test_released_handle_is_gone() {
    let mut t = TestSession::new();
    let (_, handle) = bool_weight(&mut t);
    release(&mut t, WEIGHT, handle).body();

    assert_eq!(release(&mut t, WEIGHT, handle).error(), (3, handle));

    // Releasing under the wrong type fails too
    let (_, other) = bool_weight(&mut t);
    assert_eq!(release(&mut t, MATCH_SPY, other).error(), (3, other));
    assert_eq!(resource_info(&mut t).len(), 1);
}

#[test]
fn test_resource_info_is_sorted_by_type_then_handle() {
    let mut t = TestSession::new();
    create(&mut t, |e| {
        e.write_string("value_count_match_spy");
        e.write_u32(3);
    });
    bool_weight(&mut t);
    create(&mut t, |e| {
        e.write_string("bm25_weight");
        for v in [1.0, 0.0, 1.0, 0.5, 0.5] {
            e.write_f64(v);
        }
    });

    let info = resource_info(&mut t);
    let keys: Vec<(u8, u32)> = info.iter().map(|(k, h, _)| (*k, *h)).collect();
    assert_eq!(keys, vec![(WEIGHT, 1), (WEIGHT, 2), (MATCH_SPY, 1)]);
    assert_eq!(info[2].2, "ValueCountMatchSpy(slot=3)");
}

#[test]
fn test_every_result_object_gets_a_handle() {
    let mut t = TestSession::new();
    t.open_writable("objects");
    t.add(&Edit::new().add_term("Qa", 1));

    let doc = t.document_by_term("Qa");
    let mset = t.match_all_terms(|e| term_query(e, "Qa"));
    assert_eq!((doc, mset), (1, 1));

    let kinds: Vec<u8> = resource_info(&mut t).iter().map(|r| r.0).collect();
    // Document, Enquire, ResultSet
    assert_eq!(kinds, vec![0, 1, 2]);
}

#[test]
fn test_bad_constructor_parameters() {
    let mut t = TestSession::new();
    let reply = t.call(Opcode::CreateResource, |e| {
        e.write_string("bm25_weight");
        for v in [1.0, 0.0, 1.0, 1.5, 0.5] {
            e.write_f64(v);
        }
    });
    assert_eq!(reply.error().0, 2);

    let reply = t.call(Opcode::CreateResource, |e| e.write_string("no_such_thing"));
    assert_eq!(reply.error().0, 2);

    // Truncated parameters
    let reply = t.call(Opcode::CreateResource, |e| {
        e.write_string("value_count_match_spy");
        e.write_u8(1);
    });
    assert_eq!(reply.error().0, 6);
    assert!(resource_info(&mut t).is_empty());
}

#[test]
fn test_unknown_resource_type_tag() {
    let mut t = TestSession::new();
    assert_eq!(release(&mut t, 42, 1).error(), (1, 42));
}
