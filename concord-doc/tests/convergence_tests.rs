//! Randomized convergence tests.
//!
//! Replicas perform random actions and exchange operations at random
//! points, sometimes delivering them in scrambled order. After a final
//! full exchange every replica must show the same document.

use concord_doc::{Doc, Operation, ReplicaId, SharedRef, TypeKind};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const USERS: u128 = 5;

fn users() -> Vec<Doc> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    (1..=USERS).map(|i| Doc::new(ReplicaId::from_u128(i))).collect()
}

fn flush_all(docs: &mut [Doc]) {
    for from in 0..docs.len() {
        for to in 0..docs.len() {
            if from != to {
                let ops = docs[from].delta(docs[to].state_vector());
                docs[to].receive(ops).expect("receive");
            }
        }
    }
}

/// Sends everything `from` knows to `to`, shuffled.
fn gossip(docs: &mut [Doc], from: usize, to: usize, rng: &mut StdRng) {
    let mut ops: Vec<Operation> = docs[from].delta(docs[to].state_vector());
    ops.shuffle(rng);
    docs[to].receive(ops).expect("receive");
}

fn assert_all_equal(docs: &[Doc]) {
    let first = docs[0].to_json();
    for doc in &docs[1..] {
        assert_eq!(doc.to_json(), first);
        assert_eq!(doc.pending_len(), 0);
    }
}

/// Creates a shared nested type on the first user and hands every user a
/// reference to it.
fn shared_nested(docs: &mut [Doc], kind: TypeKind) -> SharedRef {
    let shared = docs[0]
        .root()
        .set("shared", kind)
        .expect("set")
        .as_shared()
        .expect("nested type");
    flush_all(docs);
    shared
}

fn random_map_actions(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut docs = users();
    let map = shared_nested(&mut docs, TypeKind::Map);

    for _ in 0..steps {
        let u = rng.gen_range(0..docs.len());
        match rng.gen_range(0..10) {
            0..=5 => {
                let value: i64 = rng.gen_range(0..1_000_000);
                docs[u].map(map).unwrap().set("somekey", value).unwrap();
            }
            6..=7 => {
                docs[u].map(map).unwrap().delete("somekey").unwrap();
            }
            _ => {
                let to = rng.gen_range(0..docs.len());
                if to != u {
                    gossip(&mut docs, u, to, &mut rng);
                }
            }
        }
    }

    flush_all(&mut docs);
    assert_all_equal(&docs);
    let first = docs[0].read_map(map).unwrap().get("somekey");
    for doc in &docs {
        assert_eq!(doc.read_map(map).unwrap().get("somekey"), first);
    }
}

fn random_array_actions(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut docs = users();
    let list = shared_nested(&mut docs, TypeKind::Array);

    for _ in 0..steps {
        let u = rng.gen_range(0..docs.len());
        let len = docs[u].read_array(list).unwrap().len();
        match rng.gen_range(0..10) {
            0..=5 => {
                let index = rng.gen_range(0..=len);
                let count = rng.gen_range(1..=3);
                let items: Vec<i64> = (0..count).map(|_| rng.gen_range(0..100)).collect();
                docs[u].array(list).unwrap().insert(index, items).unwrap();
            }
            6..=7 if len > 0 => {
                let index = rng.gen_range(0..len);
                let count = rng.gen_range(1..=(len - index).min(3));
                docs[u].array(list).unwrap().remove(index, count).unwrap();
            }
            _ => {
                let to = rng.gen_range(0..docs.len());
                if to != u {
                    gossip(&mut docs, u, to, &mut rng);
                }
            }
        }
    }

    flush_all(&mut docs);
    assert_all_equal(&docs);
}

#[test]
fn map_converges_after_many_random_actions() {
    random_map_actions(0xC0FFEE, 100);
}

#[test]
fn array_converges_after_many_random_actions() {
    random_array_actions(0xBEEF, 100);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_map_histories_converge(seed in any::<u64>(), steps in 1usize..120) {
        random_map_actions(seed, steps);
    }

    #[test]
    fn random_array_histories_converge(seed in any::<u64>(), steps in 1usize..120) {
        random_array_actions(seed, steps);
    }
}
