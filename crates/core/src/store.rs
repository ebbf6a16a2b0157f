//! Slot storage: the committed/modified pair behind a rewrite pass, the
//! backend trait the result is committed into, and an in-memory backend for
//! harnesses and tests.

use alloy::primitives::B256;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// A full storage image: slot key to slot value, zero values absent.
pub type StorageImage = HashMap<B256, B256>;

/// Mutable slot storage with delete-on-zero-write semantics.
pub trait SlotBackend {
    /// Returns the value stored at `key`, or all-zero if absent.
    fn get(&self, key: &B256) -> B256;
    /// Stores `value` at `key`; an all-zero value removes the key.
    fn set(&mut self, key: B256, value: B256);
    /// Removes `key` outright.
    fn remove(&mut self, key: &B256);
}

/// The committed/modified slot pair backing one rewrite pass.
///
/// `committed` is the pre-transform image and is never written after
/// construction; `modified` is the post-transform image under construction.
/// Zero-valued writes to `modified` are recorded rather than dropped, because
/// later sub-slot writes may land sibling bytes into the same slot.
#[derive(Debug, Clone, Default)]
pub struct SlotStore {
    committed: StorageImage,
    modified: StorageImage,
}

impl SlotStore {
    /// Wraps a committed image; the modified buffer starts empty.
    pub fn new(committed: StorageImage) -> Self {
        Self {
            committed,
            modified: StorageImage::new(),
        }
    }

    /// Reads a slot from the committed image; missing keys read as zero.
    pub fn read_committed(&self, key: &B256) -> B256 {
        self.committed.get(key).copied().unwrap_or(B256::ZERO)
    }

    /// Reads a slot from the modified buffer; unwritten keys read as zero.
    pub fn read_modified(&self, key: &B256) -> B256 {
        self.modified.get(key).copied().unwrap_or(B256::ZERO)
    }

    /// Writes a slot into the modified buffer, zero values included.
    pub fn write_modified(&mut self, key: B256, value: B256) {
        self.modified.insert(key, value);
    }

    /// The committed image as given at construction.
    pub fn committed(&self) -> &StorageImage {
        &self.committed
    }

    /// The modified buffer, including any zero-valued entries.
    pub fn modified(&self) -> &StorageImage {
        &self.modified
    }

    /// Publishes the rewrite into `target`: every committed key is deleted
    /// first, then every non-zero modified slot is written.
    ///
    /// Deleting before writing is what removes slots the new layout no longer
    /// uses; writing over the old image without the delete pass would leave
    /// stale keys behind.
    pub fn commit_to(&self, target: &mut dyn SlotBackend) {
        debug!(
            "commit: deleting {} committed keys, writing {} modified slots",
            self.committed.len(),
            self.modified.len()
        );
        for key in self.committed.keys() {
            target.remove(key);
        }
        for (key, value) in &self.modified {
            if *value != B256::ZERO {
                target.set(*key, *value);
            }
        }
    }
}

/// In-memory slot backend used by the fixture harness and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryBackend {
    slots: StorageImage,
}

impl InMemoryBackend {
    /// An empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend pre-seeded with an image.
    pub fn from_image(slots: StorageImage) -> Self {
        Self { slots }
    }

    /// The current image.
    pub fn image(&self) -> &StorageImage {
        &self.slots
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slots are stored.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// First difference between `self` (expected) and `other` (actual),
    /// scanning keys in sorted order so the report is deterministic.
    pub fn diff(&self, other: &InMemoryBackend) -> Option<StorageDiff> {
        let mut expected_keys: Vec<&B256> = self.slots.keys().collect();
        expected_keys.sort();
        for key in expected_keys {
            match other.slots.get(key) {
                None => return Some(StorageDiff::MissingKey { key: *key }),
                Some(actual) if actual != &self.slots[key] => {
                    return Some(StorageDiff::ValueMismatch {
                        key: *key,
                        expected: self.slots[key],
                        actual: *actual,
                    });
                }
                Some(_) => {}
            }
        }
        let mut actual_keys: Vec<&B256> = other.slots.keys().collect();
        actual_keys.sort();
        for key in actual_keys {
            if !self.slots.contains_key(key) {
                return Some(StorageDiff::UnexpectedKey {
                    key: *key,
                    actual: other.slots[key],
                });
            }
        }
        None
    }
}

impl SlotBackend for InMemoryBackend {
    fn get(&self, key: &B256) -> B256 {
        self.slots.get(key).copied().unwrap_or(B256::ZERO)
    }

    fn set(&mut self, key: B256, value: B256) {
        if value == B256::ZERO {
            self.slots.remove(&key);
        } else {
            self.slots.insert(key, value);
        }
    }

    fn remove(&mut self, key: &B256) {
        self.slots.remove(key);
    }
}

/// First observed difference between an expected and an actual image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageDiff {
    /// Expected slot missing from the actual image.
    MissingKey {
        /// The absent slot key.
        key: B256,
    },
    /// Slot present on both sides with different values.
    ValueMismatch {
        /// The slot key.
        key: B256,
        /// Value in the expected image.
        expected: B256,
        /// Value in the actual image.
        actual: B256,
    },
    /// Slot present in the actual image but not expected.
    UnexpectedKey {
        /// The surplus slot key.
        key: B256,
        /// Its value in the actual image.
        actual: B256,
    },
}

impl fmt::Display for StorageDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDiff::MissingKey { key } => write!(f, "missing slot {key}"),
            StorageDiff::ValueMismatch {
                key,
                expected,
                actual,
            } => write!(f, "slot {key}: expected {expected}, got {actual}"),
            StorageDiff::UnexpectedKey { key, actual } => {
                write!(f, "unexpected slot {key} holding {actual}")
            }
        }
    }
}
