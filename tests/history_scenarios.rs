//! History behavior through the public API: bound, ordering, and the
//! capacity-driven shrink on both storage media.

use imagen_studio::history::{
    DEFAULT_SLOT, FileStorage, HistoryStore, MemoryStorage, PersistFailure, PersistOutcome,
    StorageError, StorageMedium,
};
use imagen_studio::types::{GeneratedArtifact, MimeType};
use tempfile::TempDir;

fn artifact(ts: i64) -> GeneratedArtifact {
    GeneratedArtifact::new(vec![7; 64], MimeType::Png, "p", ts)
}

fn timestamps(items: &[GeneratedArtifact]) -> Vec<i64> {
    items.iter().map(|a| a.timestamp).collect()
}

/// Serialized size of `n` equally sized artifacts, as the store writes them.
fn slot_bytes(n: usize) -> usize {
    let items: Vec<_> = (0..n as i64).map(|i| artifact(1000 + i)).collect();
    DEFAULT_SLOT.len() + serde_json::to_string(&items).unwrap().len()
}

/// Medium that rejects any array longer than `limit` items.
struct ItemLimited {
    limit: usize,
    inner: MemoryStorage,
}

impl StorageMedium for ItemLimited {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(slot)
    }

    fn write(&mut self, slot: &str, value: &str) -> Result<(), StorageError> {
        let count = serde_json::from_str::<Vec<serde_json::Value>>(value)?.len();
        if count > self.limit {
            return Err(StorageError::CapacityExceeded {
                needed: count,
                capacity: self.limit,
            });
        }
        self.inner.write(slot, value)
    }

    fn remove(&mut self, slot: &str) -> Result<(), StorageError> {
        self.inner.remove(slot)
    }
}

#[test]
fn seven_adds_keep_five_newest() {
    let mut store = HistoryStore::new(MemoryStorage::unbounded(), DEFAULT_SLOT, 5);
    for ts in 1..=7 {
        store.add(artifact(ts));
    }
    assert_eq!(timestamps(store.items()), vec![7, 6, 5, 4, 3]);
    assert_eq!(timestamps(&store.read_persisted().unwrap()), vec![7, 6, 5, 4, 3]);
}

#[test]
fn bound_and_ordering_hold_after_every_add() {
    for max in 1..=6 {
        let mut store = HistoryStore::new(MemoryStorage::unbounded(), DEFAULT_SLOT, max);
        for ts in 0..15 {
            let committed = store.add(artifact(ts));
            assert!(committed.items.len() <= max);
            assert_eq!(committed.items[0].timestamp, ts);
            assert!(
                committed
                    .items
                    .windows(2)
                    .all(|w| w[0].timestamp > w[1].timestamp)
            );
        }
    }
}

#[test]
fn two_item_capacity_persists_two_of_three() {
    let medium = MemoryStorage::new(slot_bytes(2));
    let mut store = HistoryStore::new(medium, DEFAULT_SLOT, 5);

    let outcomes: Vec<PersistOutcome> = (0..3)
        .map(|i| store.add(artifact(1000 + i)).outcome)
        .collect();

    assert_eq!(outcomes[0], PersistOutcome::Persisted { count: 1 });
    assert_eq!(outcomes[1], PersistOutcome::Persisted { count: 2 });
    assert_eq!(
        outcomes[2],
        PersistOutcome::Degraded {
            persisted: 2,
            dropped: 1
        }
    );
    assert_eq!(store.items().len(), 3);
    assert_eq!(timestamps(&store.read_persisted().unwrap()), vec![1002, 1001]);
}

#[test]
fn shrink_stops_at_single_item() {
    let medium = ItemLimited {
        limit: 1,
        inner: MemoryStorage::unbounded(),
    };
    let mut store = HistoryStore::new(medium, DEFAULT_SLOT, 5);
    for ts in 0..4 {
        store.add(artifact(ts));
    }
    assert_eq!(store.items().len(), 4);
    assert_eq!(timestamps(&store.read_persisted().unwrap()), vec![3]);
}

#[test]
fn persisted_list_is_always_a_prefix_of_memory() {
    let medium = ItemLimited {
        limit: 2,
        inner: MemoryStorage::unbounded(),
    };
    let mut store = HistoryStore::new(medium, DEFAULT_SLOT, 4);
    for ts in 0..6 {
        store.add(artifact(ts));
        let persisted = timestamps(&store.read_persisted().unwrap());
        let memory = timestamps(store.items());
        assert!(persisted.len() <= memory.len());
        assert_eq!(persisted[..], memory[..persisted.len()]);
    }
}

#[test]
fn oversized_add_leaves_previous_slot_in_place() {
    let medium = MemoryStorage::new(slot_bytes(2));
    let mut store = HistoryStore::new(medium, DEFAULT_SLOT, 2);
    for i in 1..=3 {
        let committed = store.add(artifact(1000 + i));
        assert!(committed.outcome.is_complete());
    }

    let huge = GeneratedArtifact::new(vec![7; 4096], MimeType::Png, "p", 1004);
    let committed = store.add(huge);
    assert_eq!(
        committed.outcome,
        PersistOutcome::NotPersisted {
            reason: PersistFailure::Capacity
        }
    );
    assert!(!committed.outcome.is_complete());
    assert_eq!(timestamps(committed.items), vec![1004, 1003]);

    // The slot still holds the last successful write, including 1002,
    // which memory has already evicted.
    assert_eq!(
        timestamps(&store.read_persisted().unwrap()),
        vec![1003, 1002]
    );
}

#[test]
fn file_storage_degrades_like_memory() {
    let tmp = TempDir::new().unwrap();
    let medium = FileStorage::open(tmp.path(), slot_bytes(2)).unwrap();
    let mut store = HistoryStore::new(medium, DEFAULT_SLOT, 5);
    for i in 0..3 {
        store.add(artifact(1000 + i));
    }

    let reopened = HistoryStore::new(
        FileStorage::open(tmp.path(), slot_bytes(2)).unwrap(),
        DEFAULT_SLOT,
        5,
    );
    assert_eq!(
        timestamps(&reopened.read_persisted().unwrap()),
        vec![1002, 1001]
    );
}

#[test]
fn remove_then_clear() {
    let mut store = HistoryStore::with_defaults(MemoryStorage::unbounded());
    for ts in 1..=4 {
        store.add(artifact(ts));
    }

    let committed = store.remove(&[2, 4].into_iter().collect());
    assert_eq!(timestamps(committed.items), vec![3, 1]);
    assert_eq!(committed.outcome, PersistOutcome::Persisted { count: 2 });

    assert_eq!(store.clear(), PersistOutcome::Persisted { count: 0 });
    assert!(store.items().is_empty());
    assert!(store.read_persisted().unwrap().is_empty());
}
