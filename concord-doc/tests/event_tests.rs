use concord_doc::{
    ArrayChange, ChangeKind, Changes, Doc, MapChange, ReplicaId, SharedRef, TypeEvent, TypeKind,
    Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

type Seen = Arc<Mutex<Vec<TypeEvent>>>;

fn record(doc: &mut Doc, target: SharedRef) -> Seen {
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    doc.observe(target, move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    })
    .unwrap();
    seen
}

fn take(seen: &Seen) -> Vec<TypeEvent> {
    std::mem::take(&mut *seen.lock().unwrap())
}

fn map_event(target: SharedRef, kind: ChangeKind, key: &str, previous: Option<Value>) -> TypeEvent {
    TypeEvent {
        target,
        changes: Changes::Map(vec![MapChange {
            kind,
            key: key.to_string(),
            previous,
        }]),
    }
}

fn sync(from: &Doc, to: &mut Doc) {
    let ops = from.delta(to.state_vector());
    to.receive(ops).unwrap();
}

// =============================================================================
// MAP EVENTS
// =============================================================================

#[test]
fn add_update_delete_with_primitive_and_type_content() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let root = SharedRef::root();
    let seen = record(&mut doc, root);

    doc.root().set("stuff", 4).unwrap();
    assert_eq!(take(&seen), vec![map_event(root, ChangeKind::Add, "stuff", None)]);

    let array = doc.root().set("stuff", TypeKind::Array).unwrap();
    assert_eq!(
        take(&seen),
        vec![map_event(
            root,
            ChangeKind::Update,
            "stuff",
            Some(Value::from(json!(4)))
        )]
    );

    doc.root().set("stuff", 5).unwrap();
    let events = take(&seen);
    assert_eq!(events, vec![map_event(root, ChangeKind::Update, "stuff", Some(array.clone()))]);
    // The previous value resolves to the replaced array instance.
    let replaced = events[0].map_changes().unwrap()[0]
        .previous
        .as_ref()
        .and_then(Value::as_shared)
        .unwrap();
    assert_eq!(Some(replaced), array.as_shared());
    assert!(doc.read_array(replaced).is_ok());

    doc.root().delete("stuff").unwrap();
    assert_eq!(
        take(&seen),
        vec![map_event(
            root,
            ChangeKind::Delete,
            "stuff",
            Some(Value::from(json!(5)))
        )]
    );
}

#[test]
fn event_is_delivered_before_the_call_returns() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let seen = record(&mut doc, SharedRef::root());
    doc.root().set("k", 1).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn losing_concurrent_set_emits_nothing() {
    let mut a = Doc::new(ReplicaId::from_u128(1));
    let mut b = Doc::new(ReplicaId::from_u128(2));
    a.root().set("k", "winner").unwrap();
    b.root().set("k", "loser").unwrap();

    let seen = record(&mut a, SharedRef::root());
    sync(&b, &mut a);
    assert!(take(&seen).is_empty());
    assert_eq!(a.read_root().get("k").unwrap(), json!("winner"));
}

#[test]
fn winning_remote_set_emits_update() {
    let mut a = Doc::new(ReplicaId::from_u128(1));
    let mut b = Doc::new(ReplicaId::from_u128(2));
    a.root().set("k", "winner").unwrap();
    b.root().set("k", "loser").unwrap();

    let seen = record(&mut b, SharedRef::root());
    sync(&a, &mut b);
    assert_eq!(
        take(&seen),
        vec![map_event(
            SharedRef::root(),
            ChangeKind::Update,
            "k",
            Some(Value::from(json!("loser")))
        )]
    );
}

#[test]
fn remote_delete_emits_delete() {
    let mut a = Doc::new(ReplicaId::from_u128(1));
    let mut b = Doc::new(ReplicaId::from_u128(2));
    a.root().set("k", 1).unwrap();
    sync(&a, &mut b);

    let seen = record(&mut b, SharedRef::root());
    a.root().delete("k").unwrap();
    sync(&a, &mut b);
    assert_eq!(
        take(&seen),
        vec![map_event(
            SharedRef::root(),
            ChangeKind::Delete,
            "k",
            Some(Value::from(json!(1)))
        )]
    );
}

#[test]
fn observers_only_see_their_own_type() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let inner = doc.root().set("m", TypeKind::Map).unwrap().as_shared().unwrap();
    let root_seen = record(&mut doc, SharedRef::root());
    let inner_seen = record(&mut doc, inner);

    doc.map(inner).unwrap().set("x", 1).unwrap();
    assert!(take(&root_seen).is_empty());
    assert_eq!(take(&inner_seen), vec![map_event(inner, ChangeKind::Add, "x", None)]);
}

// =============================================================================
// ARRAY EVENTS
// =============================================================================

#[test]
fn multi_item_insert_is_one_event() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let list = doc.root().set("l", TypeKind::Array).unwrap().as_shared().unwrap();
    let seen = record(&mut doc, list);

    doc.array(list).unwrap().insert(0, ["a", "b", "c"]).unwrap();
    let events = take(&seen);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].array_changes().unwrap(),
        &[ArrayChange::Insert {
            index: 0,
            values: vec![json!("a").into(), json!("b").into(), json!("c").into()],
        }]
    );
}

#[test]
fn range_remove_is_one_event() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let list = doc.root().set("l", TypeKind::Array).unwrap().as_shared().unwrap();
    doc.array(list).unwrap().insert(0, [1, 2, 3, 4]).unwrap();
    let seen = record(&mut doc, list);

    doc.array(list).unwrap().remove(1, 2).unwrap();
    let events = take(&seen);
    assert_eq!(
        events[0].array_changes().unwrap(),
        &[ArrayChange::Remove {
            index: 1,
            values: vec![json!(2).into(), json!(3).into()],
        }]
    );
}

#[test]
fn unobserve_stops_delivery() {
    let mut doc = Doc::new(ReplicaId::from_u128(1));
    let seen: Seen = Arc::default();
    let sink = Arc::clone(&seen);
    let id = doc
        .root()
        .observe(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        })
        .unwrap();

    doc.root().set("a", 1).unwrap();
    assert!(doc.root().unobserve(id));
    doc.root().set("b", 2).unwrap();

    assert_eq!(take(&seen).len(), 1);
    assert!(!doc.root().unobserve(id));
}
