//! Bounded, quota-aware history of generated artifacts.
//!
//! The history is a newest-first list of at most `max_items`
//! [`GeneratedArtifact`]s, persisted as a JSON array in one named slot of a
//! size-limited [`StorageMedium`].
//!
//! # Degrading under capacity pressure
//!
//! Encoded images are large and the medium is small. When a write is
//! rejected with [`StorageError::CapacityExceeded`], [`HistoryStore::add`]
//! drops the oldest entry from the candidate list and retries, down to the
//! single newest item. The in-memory list is never shrunk by this: the
//! session keeps showing everything, while the slot holds a newest-first
//! prefix of it. When not even the newest item fits
//! ([`PersistOutcome::NotPersisted`]) nothing is written and the slot stays
//! stale: it may still hold entries that memory has since evicted. Every
//! mutation reports what actually reached the medium as a
//! [`PersistOutcome`], so callers can tell a full save from a degraded one.
//!
//! # Loading
//!
//! The slot is read lazily on first access. A missing slot is an empty
//! history; an unreadable or corrupt one is logged and also treated as empty.
//!
//! # Concurrency
//!
//! Mutations take `&mut self`: one writer at a time. Share a store across
//! threads behind a `Mutex`.

use crate::types::GeneratedArtifact;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Slot name used when none is configured.
pub const DEFAULT_SLOT: &str = "imagen_studio_history";

/// Bound used when none is configured.
pub const DEFAULT_MAX_ITEMS: usize = 5;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage capacity exceeded: {needed} bytes needed, {capacity} available")]
    CapacityExceeded { needed: usize, capacity: usize },
    #[error("invalid slot name: {0:?}")]
    InvalidSlot(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A size-limited key/value store of text slots.
///
/// Usage is measured as the sum of slot name and value lengths in bytes,
/// across every slot in the medium.
pub trait StorageMedium {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError>;

    /// Replace the slot's value. Fails with `CapacityExceeded` if the medium
    /// would grow past its capacity; the old value is then kept.
    fn write(&mut self, slot: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the slot. Deleting a missing slot is not an error.
    fn remove(&mut self, slot: &str) -> Result<(), StorageError>;
}

/// In-process medium with a byte capacity.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    capacity: usize,
    slots: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: BTreeMap::new(),
        }
    }

    /// Medium that never rejects a write.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.slots.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl StorageMedium for MemoryStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(slot).cloned())
    }

    fn write(&mut self, slot: &str, value: &str) -> Result<(), StorageError> {
        let others: usize = self
            .slots
            .iter()
            .filter(|(k, _)| k.as_str() != slot)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        let needed = others.saturating_add(slot.len() + value.len());
        if needed > self.capacity {
            return Err(StorageError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        self.slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> Result<(), StorageError> {
        self.slots.remove(slot);
        Ok(())
    }
}

/// Directory-backed medium: one `<slot>.json` file per slot, with a total quota.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    capacity: usize,
}

const SLOT_EXTENSION: &str = "json";

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, capacity })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, StorageError> {
        let valid = !slot.is_empty()
            && slot
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !slot.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidSlot(slot.to_string()));
        }
        Ok(self.dir.join(format!("{slot}.{SLOT_EXTENSION}")))
    }

    /// Bytes used by every slot except `skip`.
    fn used_excluding(&self, skip: &str) -> Result<usize, StorageError> {
        let mut used = 0usize;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if name == skip {
                continue;
            }
            used += name.len() + fs::metadata(&path)?.len() as usize;
        }
        Ok(used)
    }
}

impl StorageMedium for FileStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, StorageError> {
        let path = self.slot_path(slot)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, slot: &str, value: &str) -> Result<(), StorageError> {
        let path = self.slot_path(slot)?;
        let needed = self
            .used_excluding(slot)?
            .saturating_add(slot.len() + value.len());
        if needed > self.capacity {
            return Err(StorageError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, slot: &str) -> Result<(), StorageError> {
        let path = self.slot_path(slot)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Why a mutation did not reach the medium at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistFailure {
    /// Even the newest item alone does not fit.
    Capacity,
    /// Any other storage error, as text.
    Storage(String),
}

/// What a mutation wrote to the medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The whole in-memory list was written.
    Persisted { count: usize },
    /// Only the newest `persisted` items fit; `dropped` older ones live in
    /// memory only.
    Degraded { persisted: usize, dropped: usize },
    /// Nothing was written; the slot keeps its previous contents.
    NotPersisted { reason: PersistFailure },
}

impl PersistOutcome {
    /// True when the slot now mirrors the in-memory list exactly.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Persisted { .. })
    }
}

/// Result of a mutation: the in-memory list and what was persisted.
#[derive(Debug)]
pub struct Committed<'a> {
    pub items: &'a [GeneratedArtifact],
    pub outcome: PersistOutcome,
}

/// Newest-first, bounded history backed by a [`StorageMedium`].
pub struct HistoryStore<S: StorageMedium> {
    medium: S,
    slot: String,
    max_items: usize,
    items: Option<Vec<GeneratedArtifact>>,
}

impl<S: StorageMedium> HistoryStore<S> {
    /// `max_items` below 1 is treated as 1.
    pub fn new(medium: S, slot: impl Into<String>, max_items: usize) -> Self {
        Self {
            medium,
            slot: slot.into(),
            max_items: max_items.max(1),
            items: None,
        }
    }

    pub fn with_defaults(medium: S) -> Self {
        Self::new(medium, DEFAULT_SLOT, DEFAULT_MAX_ITEMS)
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn medium(&self) -> &S {
        &self.medium
    }

    /// Current in-memory list, reading the slot on first access.
    pub fn items(&mut self) -> &[GeneratedArtifact] {
        self.loaded()
    }

    pub fn get(&mut self, timestamp: i64) -> Option<&GeneratedArtifact> {
        self.loaded().iter().find(|a| a.timestamp == timestamp)
    }

    /// Decode the slot as it is right now, bypassing the in-memory list.
    pub fn read_persisted(&self) -> Result<Vec<GeneratedArtifact>, StorageError> {
        match self.medium.read(&self.slot)? {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    fn loaded(&mut self) -> &mut Vec<GeneratedArtifact> {
        if self.items.is_none() {
            let mut items = match self.read_persisted() {
                Ok(items) => items,
                Err(e) => {
                    warn!(slot = %self.slot, error = %e, "history unreadable, starting empty");
                    Vec::new()
                }
            };
            items.truncate(self.max_items);
            debug!(slot = %self.slot, count = items.len(), "history loaded");
            self.items = Some(items);
        }
        self.items.get_or_insert_with(Vec::new)
    }

    /// Prepend `item`, evict beyond the bound, and persist as much as fits.
    pub fn add(&mut self, item: GeneratedArtifact) -> Committed<'_> {
        let max_items = self.max_items;
        let items = self.loaded();
        items.insert(0, item);
        items.truncate(max_items);

        let items = self.items.as_deref().unwrap_or_default();
        let outcome = persist_newest(&mut self.medium, &self.slot, items);
        Committed { items, outcome }
    }

    /// Drop every entry whose timestamp is in `ids` and persist the rest.
    pub fn remove(&mut self, ids: &BTreeSet<i64>) -> Committed<'_> {
        self.loaded().retain(|a| !ids.contains(&a.timestamp));

        let items = self.items.as_deref().unwrap_or_default();
        let outcome = persist_newest(&mut self.medium, &self.slot, items);
        Committed { items, outcome }
    }

    /// Empty the in-memory list and delete the slot.
    pub fn clear(&mut self) -> PersistOutcome {
        self.items = Some(Vec::new());
        match self.medium.remove(&self.slot) {
            Ok(()) => PersistOutcome::Persisted { count: 0 },
            Err(e) => {
                error!(slot = %self.slot, error = %e, "failed to clear persisted history");
                PersistOutcome::NotPersisted {
                    reason: PersistFailure::Storage(e.to_string()),
                }
            }
        }
    }
}

/// Write the longest newest-first prefix of `items` the medium accepts.
fn persist_newest<S: StorageMedium>(
    medium: &mut S,
    slot: &str,
    items: &[GeneratedArtifact],
) -> PersistOutcome {
    let total = items.len();
    let mut count = total;
    loop {
        let result = serde_json::to_string(&items[..count])
            .map_err(StorageError::from)
            .and_then(|json| medium.write(slot, &json));

        match result {
            Ok(()) if count == total => {
                debug!(slot, count, "history persisted");
                return PersistOutcome::Persisted { count };
            }
            Ok(()) => {
                let dropped = total - count;
                warn!(slot, persisted = count, dropped, "history persisted partially");
                return PersistOutcome::Degraded {
                    persisted: count,
                    dropped,
                };
            }
            Err(StorageError::CapacityExceeded { needed, capacity }) if count > 1 => {
                debug!(slot, count, needed, capacity, "over capacity, dropping oldest");
                count -= 1;
            }
            Err(e @ StorageError::CapacityExceeded { .. }) => {
                warn!(slot, error = %e, "history not persisted: newest item does not fit");
                return PersistOutcome::NotPersisted {
                    reason: PersistFailure::Capacity,
                };
            }
            Err(e) => {
                error!(slot, error = %e, "history not persisted");
                return PersistOutcome::NotPersisted {
                    reason: PersistFailure::Storage(e.to_string()),
                };
            }
        }
    }
}
