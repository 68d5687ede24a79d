// dryrun/core/storage/tests/layering_tests.rs

// Property and scenario tests for snapshot layering

use dryrun_storage::{MemoryStore, RootStore, Snapshot, StorageKey};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

const CONTRACT: i32 = 3;

#[derive(Debug, Clone)]
enum Op {
    Put(u8, u8),
    Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..16, any::<u8>()).prop_map(|(k, v)| Op::Put(k, v)),
        (0u8..16).prop_map(Op::Delete),
    ]
}

fn slot(k: u8) -> StorageKey {
    StorageKey::new(CONTRACT, vec![b'k', k])
}

fn seeded_root(seed: &[(u8, u8)]) -> Arc<dyn RootStore> {
    let mut store = MemoryStore::new();
    for (k, v) in seed {
        store.put(slot(*k), vec![*v]);
    }
    Arc::new(store)
}

fn visible(snapshot: &Snapshot<'_>) -> BTreeMap<Vec<u8>, Vec<u8>> {
    snapshot.find_by_prefix(CONTRACT, b"k").collect()
}

proptest! {
    #[test]
    fn prop_commit_matches_model(
        seed in proptest::collection::vec((0u8..16, any::<u8>()), 0..12),
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let mut base = Snapshot::new(seeded_root(&seed));
        let mut model: BTreeMap<Vec<u8>, Vec<u8>> = visible(&base);
        let before = model.clone();

        let changes = {
            let mut child = base.create_child();
            for op in &ops {
                match op {
                    Op::Put(k, v) => {
                        child.put(slot(*k), vec![*v]);
                        model.insert(slot(*k).key, vec![*v]);
                    }
                    Op::Delete(k) => {
                        child.delete(slot(*k));
                        model.remove(&slot(*k).key);
                    }
                }
            }
            // Child sees the model, base still sees the original view
            prop_assert_eq!(visible(&child), model.clone());
            prop_assert_eq!(visible(&base), before.clone());
            for k in 0u8..16 {
                prop_assert_eq!(child.get(&slot(k)), model.get(&slot(k).key).cloned());
            }
            child.into_changes()
        };

        base.commit(changes);
        prop_assert_eq!(visible(&base), model.clone());
        for k in 0u8..16 {
            prop_assert_eq!(base.get(&slot(k)), model.get(&slot(k).key).cloned());
        }
    }

    #[test]
    fn prop_discarded_child_changes_nothing(
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let base = Snapshot::new(seeded_root(&[(1, 1), (2, 2)]));
        let before = visible(&base);
        {
            let mut child = base.create_child();
            for op in &ops {
                match op {
                    Op::Put(k, v) => child.put(slot(*k), vec![*v]),
                    Op::Delete(k) => child.delete(slot(*k)),
                }
            }
        }
        prop_assert_eq!(visible(&base), before);
    }
}

#[test]
fn test_nested_commit_collapses_one_layer_at_a_time() {
    let mut head = Snapshot::new(seeded_root(&[(0, 0)]));

    let outer_changes = {
        let mut outer = head.create_child();
        outer.put(slot(1), vec![1]);

        let inner_changes = {
            let mut inner = outer.create_child();
            inner.put(slot(2), vec![2]);
            inner.delete(slot(0));
            inner.into_changes()
        };
        // Inner writes reach the outer layer, not the head
        outer.commit(inner_changes);
        assert_eq!(outer.get(&slot(2)), Some(vec![2]));
        assert_eq!(outer.get(&slot(0)), None);
        assert_eq!(head.get(&slot(0)), Some(vec![0]));
        assert_eq!(head.get(&slot(2)), None);
        outer.into_changes()
    };

    head.commit(outer_changes);
    assert_eq!(head.depth(), 1);
    assert_eq!(
        visible(&head),
        BTreeMap::from([(slot(1).key, vec![1]), (slot(2).key, vec![2])])
    );
}
