use concord_doc::{Doc, DocError, ReplicaId, SharedRef, TypeKind, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn replicas(n: u128) -> Vec<Doc> {
    (1..=n).map(|i| Doc::new(ReplicaId::from_u128(i))).collect()
}

/// Every replica sends every other replica what it is missing.
fn flush_all(docs: &mut [Doc]) {
    for from in 0..docs.len() {
        for to in 0..docs.len() {
            if from == to {
                continue;
            }
            let ops = docs[from].delta(docs[to].state_vector());
            docs[to].receive(ops).expect("receive");
        }
    }
}

fn stuff(doc: &Doc) -> Option<Value> {
    doc.read_root().get("stuff")
}

fn assert_converged(docs: &[Doc]) {
    let first = docs[0].to_json();
    for doc in &docs[1..] {
        assert_eq!(doc.to_json(), first);
        assert_eq!(doc.state_vector(), docs[0].state_vector());
    }
}

// =============================================================================
// BASIC
// =============================================================================

#[test]
fn set_is_visible_locally_and_after_sync() {
    let mut docs = replicas(4);
    docs[0].root().set("stuff", "stuffy").unwrap();
    assert_eq!(stuff(&docs[0]).unwrap(), json!("stuffy"));

    flush_all(&mut docs);
    for doc in &docs {
        assert_eq!(stuff(doc).unwrap(), json!("stuffy"));
    }
    assert_converged(&docs);
}

#[test]
fn get_of_unknown_key_is_absent() {
    let doc = Doc::new(ReplicaId::from_u128(1));
    assert!(doc.read_root().get("nope").is_none());
    assert!(doc.read_root().is_empty());
}

#[test]
fn later_local_set_replaces_earlier() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let mut root = doc.root();
    root.set("stuff", 1).unwrap();
    root.set("stuff", 2).unwrap();
    assert_eq!(root.get("stuff").unwrap(), json!(2));
    assert_eq!(root.len(), 1);
}

#[test]
fn delete_of_absent_key_creates_no_operation() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    assert!(!doc.root().delete("stuff").unwrap());
    assert_eq!(doc.clock(), 0);
    assert!(!doc.has_outgoing());
}

#[test]
fn delete_removes_key() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    doc.root().set("stuff", "x").unwrap();
    assert!(doc.root().delete("stuff").unwrap());
    assert!(stuff(&doc).is_none());
    assert_eq!(doc.to_json(), json!({}));
}

#[test]
fn keys_are_sorted_and_skip_deleted() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let mut root = doc.root();
    root.set("b", 2).unwrap();
    root.set("a", 1).unwrap();
    root.set("c", 3).unwrap();
    root.delete("b").unwrap();
    assert_eq!(root.keys(), vec!["a".to_string(), "c".to_string()]);
    assert!(root.contains_key("a"));
    assert!(!root.contains_key("b"));
}

// =============================================================================
// CONFLICTS
// =============================================================================

#[test]
fn concurrent_sets_resolve_to_smallest_id() {
    let mut docs = replicas(4);
    flush_all(&mut docs);
    docs[0].root().set("stuff", "c0").unwrap();
    docs[1].root().set("stuff", "c1").unwrap();

    flush_all(&mut docs);
    for doc in &docs {
        assert_eq!(stuff(doc).unwrap(), json!("c0"));
    }
    assert_converged(&docs);
}

#[test]
fn delete_kills_concurrent_set() {
    let mut docs = replicas(4);
    flush_all(&mut docs);
    docs[0].root().set("stuff", "c0").unwrap();
    docs[0].root().delete("stuff").unwrap();
    docs[1].root().set("stuff", "c1").unwrap();

    flush_all(&mut docs);
    for doc in &docs {
        assert!(stuff(doc).is_none());
    }
    assert_converged(&docs);
}

#[test]
fn three_concurrent_writers() {
    let mut docs = replicas(4);
    flush_all(&mut docs);
    docs[0].root().set("stuff", "c0").unwrap();
    docs[1].root().set("stuff", "c1").unwrap();
    docs[1].root().set("stuff", "c2").unwrap();
    docs[2].root().set("stuff", "c3").unwrap();

    flush_all(&mut docs);
    for doc in &docs {
        assert_eq!(stuff(doc).unwrap(), json!("c0"));
    }
    assert_converged(&docs);
}

#[test]
fn delete_wins_over_three_concurrent_writers() {
    let mut docs = replicas(5);
    flush_all(&mut docs);
    docs[0].root().set("stuff", "c0").unwrap();
    docs[1].root().set("stuff", "c1").unwrap();
    docs[1].root().set("stuff", "c2").unwrap();
    docs[2].root().set("stuff", "c3").unwrap();
    flush_all(&mut docs);

    docs[0].root().set("stuff", "deleteme").unwrap();
    docs[0].root().delete("stuff").unwrap();
    docs[1].root().set("stuff", "c1").unwrap();
    docs[2].root().set("stuff", "c2").unwrap();
    docs[3].root().set("stuff", "c3").unwrap();
    flush_all(&mut docs);

    for doc in &docs {
        assert!(stuff(doc).is_none());
    }
    assert_converged(&docs);
}

#[test]
fn set_after_seeing_delete_survives() {
    let mut docs = replicas(2);
    docs[0].root().set("stuff", "old").unwrap();
    docs[0].root().delete("stuff").unwrap();
    flush_all(&mut docs);

    docs[1].root().set("stuff", "new").unwrap();
    flush_all(&mut docs);

    for doc in &docs {
        assert_eq!(stuff(doc).unwrap(), json!("new"));
    }
}

#[test]
fn concurrent_keys_do_not_interfere() {
    let mut docs = replicas(3);
    docs[0].root().set("a", 1).unwrap();
    docs[1].root().set("b", 2).unwrap();
    docs[2].root().set("c", 3).unwrap();
    flush_all(&mut docs);

    for doc in &docs {
        assert_eq!(doc.to_json(), json!({ "a": 1, "b": 2, "c": 3 }));
    }
}

// =============================================================================
// NESTED TYPES
// =============================================================================

#[test]
fn set_map_returns_usable_handle() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let map = doc.root().set("Map", TypeKind::Map).unwrap();
    let shared = map.as_shared().expect("nested map");
    assert_eq!(shared.kind, TypeKind::Map);

    doc.map(shared).unwrap().set("one", 1).unwrap();

    let again = doc.read_root().get("Map").unwrap().as_shared().unwrap();
    assert_eq!(again, shared);
    assert_eq!(doc.read_map(again).unwrap().get("one").unwrap(), json!(1));
    assert_eq!(doc.to_json(), json!({ "Map": { "one": 1 } }));
}

#[test]
fn set_array_returns_usable_handle() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let array = doc.root().set("Array", TypeKind::Array).unwrap();
    let shared = array.as_shared().unwrap();

    doc.array(shared).unwrap().insert(0, [1, 2, 3]).unwrap();

    let again = doc.read_root().get("Array").unwrap().as_shared().unwrap();
    assert_eq!(doc.read_array(again).unwrap().to_json(), json!([1, 2, 3]));
}

#[test]
fn nested_map_resolves_on_every_replica() {
    let mut docs = replicas(3);
    let created = docs[0].root().set("Map", TypeKind::Map).unwrap();
    flush_all(&mut docs);

    let mut refs: Vec<SharedRef> = Vec::new();
    for doc in &docs {
        let value = doc.read_root().get("Map").expect("visible");
        let shared = value.as_shared().expect("a shared map, not a request");
        assert_eq!(Some(shared), created.as_shared());
        refs.push(shared);
    }

    // Mutate through different replicas' handles.
    docs[1].map(refs[1]).unwrap().set("x", 1).unwrap();
    docs[2].map(refs[2]).unwrap().set("y", 2).unwrap();
    flush_all(&mut docs);

    for doc in &docs {
        assert_eq!(doc.to_json(), json!({ "Map": { "x": 1, "y": 2 } }));
    }
    assert_converged(&docs);
}

#[test]
fn concurrent_nested_creation_keeps_one_instance() {
    let mut docs = replicas(2);
    let a = docs[0].root().set("Map", TypeKind::Map).unwrap();
    let b = docs[1].root().set("Map", TypeKind::Map).unwrap();
    docs[0].map(a.as_shared().unwrap()).unwrap().set("from", "a").unwrap();
    docs[1].map(b.as_shared().unwrap()).unwrap().set("from", "b").unwrap();
    flush_all(&mut docs);

    // The creation with the smaller id wins; edits to the loser stay
    // orphaned.
    for doc in &docs {
        let winner = doc.read_root().get("Map").unwrap().as_shared().unwrap();
        assert_eq!(Some(winner), a.as_shared());
        assert_eq!(doc.to_json(), json!({ "Map": { "from": "a" } }));
        assert!(doc.contains_type(&b.as_shared().unwrap().id));
    }
}

#[test]
fn wrong_kind_is_rejected() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let map = doc.root().set("m", TypeKind::Map).unwrap().as_shared().unwrap();
    let as_array = SharedRef::new(map.id, TypeKind::Array);
    assert!(matches!(
        doc.array(as_array),
        Err(DocError::WrongType { .. })
    ));
}

#[test]
fn replacing_a_nested_type_hides_it() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let inner = doc.root().set("m", TypeKind::Map).unwrap().as_shared().unwrap();
    doc.map(inner).unwrap().set("k", "v").unwrap();
    doc.root().set("m", 5).unwrap();

    assert_eq!(doc.to_json(), json!({ "m": 5 }));
    // The instance still exists and can be read through an old reference.
    assert_eq!(doc.read_map(inner).unwrap().get("k").unwrap(), json!("v"));
}
