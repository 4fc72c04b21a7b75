use concord_crdt::{Error, OpKind, Operation, OperationLog, StateVector};
use concord_types::{Content, OperationId, ReplicaId, SharedId};
use pretty_assertions::assert_eq;

fn replica(n: u128) -> ReplicaId {
    ReplicaId::from_u128(n)
}

fn set_op(n: u128, clock: u64, key: &str, deps: &[OperationId]) -> Operation {
    Operation::new(
        OperationId::new(replica(n), clock),
        SharedId::Root,
        OpKind::Set {
            key: key.to_string(),
            content: Content::from(format!("v{clock}")),
        },
        deps.iter().copied().collect(),
    )
}

#[test]
fn append_and_lookup() {
    let mut log = OperationLog::new();
    assert!(log.is_empty());

    let op = set_op(1, 1, "a", &[]);
    log.append(op.clone()).unwrap();

    assert_eq!(log.len(), 1);
    assert!(log.contains(&op.id));
    assert_eq!(log.get(&op.id), Some(&op));
}

#[test]
fn append_rejects_duplicate_id() {
    let mut log = OperationLog::new();
    let op = set_op(1, 1, "a", &[]);
    log.append(op.clone()).unwrap();
    assert_eq!(log.append(op.clone()), Err(Error::DuplicateOperation(op.id)));
    assert_eq!(log.len(), 1);
}

#[test]
fn for_target_filters_by_shared_type() {
    let mut log = OperationLog::new();
    let root = set_op(1, 1, "a", &[]);
    let nested_target = SharedId::Nested(root.id);
    let mut nested = set_op(1, 2, "b", &[root.id]);
    nested.target = nested_target;

    log.append(root.clone()).unwrap();
    log.append(nested.clone()).unwrap();

    let on_root: Vec<_> = log.for_target(&SharedId::Root).collect();
    let on_nested: Vec<_> = log.for_target(&nested_target).collect();
    assert_eq!(on_root, vec![&root]);
    assert_eq!(on_nested, vec![&nested]);
    assert_eq!(log.for_target(&SharedId::Nested(nested.id)).count(), 0);
}

#[test]
fn delta_returns_uncovered_operations_in_log_order() {
    let mut log = OperationLog::new();
    let a1 = set_op(1, 1, "k", &[]);
    let b1 = set_op(2, 1, "k", &[]);
    let a2 = set_op(1, 2, "k", &[a1.id, b1.id]);
    for op in [&a1, &b1, &a2] {
        log.append(op.clone()).unwrap();
    }

    let ids = |ops: Vec<Operation>| ops.into_iter().map(|o| o.id).collect::<Vec<_>>();

    assert_eq!(ids(log.delta(&StateVector::new())), vec![a1.id, b1.id, a2.id]);

    let peer: StateVector = [a1.id].into_iter().collect();
    assert_eq!(ids(log.delta(&peer)), vec![b1.id, a2.id]);

    let caught_up: StateVector = [a2.id, b1.id].into_iter().collect();
    assert!(log.delta(&caught_up).is_empty());
}

#[test]
fn operation_causality_helpers() {
    let a = set_op(1, 1, "k", &[]);
    let b = set_op(2, 1, "k", &[]);
    let c = set_op(2, 2, "k", &[a.id, b.id]);

    assert!(a.happens_before(&c));
    assert!(c.depends_on(&a.id));
    assert!(a.is_concurrent_with(&b));
    assert!(!c.is_concurrent_with(&a));
    assert_eq!(c.replica(), replica(2));
}

#[test]
fn required_includes_previous_own_operation() {
    let op = set_op(3, 4, "k", &[]);
    let required = op.required();
    assert_eq!(required.get(&replica(3)), 3);

    let first = set_op(3, 1, "k", &[]);
    assert!(first.required().is_empty());
}

#[test]
fn op_kind_accessors() {
    let set = OpKind::Set {
        key: "k".into(),
        content: Content::from(1),
    };
    assert_eq!(set.key(), Some("k"));
    assert_eq!(set.content(), Some(&Content::from(1)));
    assert!(set.is_map_op());
    assert_eq!(set.name(), "set");

    let remove = OpKind::Remove {
        element: OperationId::new(replica(1), 1),
    };
    assert_eq!(remove.key(), None);
    assert_eq!(remove.content(), None);
    assert!(!remove.is_map_op());
}

#[test]
fn operation_serde_roundtrip() {
    let op = Operation::new(
        OperationId::new(replica(1), 7),
        SharedId::Nested(OperationId::new(replica(2), 1)),
        OpKind::Insert {
            origin: Some(OperationId::new(replica(2), 3)),
            rank: 4,
            content: Content::from("x"),
        },
        [OperationId::new(replica(2), 3), OperationId::new(replica(1), 6)]
            .into_iter()
            .collect(),
    );
    let json = serde_json::to_string(&op).unwrap();
    let back: Operation = serde_json::from_str(&json).unwrap();
    assert_eq!(back, op);
    assert!(back.depends_on(&OperationId::new(replica(2), 2)));
}
