//! Fixture loading and execution.
//!
//! A fixture is a directory with four JSON files: `old_storage.json` (the
//! committed image), `directives.json` (the reorganization directives),
//! `types.json` (the type dictionary), and `new_storage.json` (the expected
//! image after the rewrite). Storage files are arrays of `{key, value}`
//! entries; all-zero values are dropped on load before the core ever sees
//! them.

use crate::commands::HarnessError;
use alloy::primitives::B256;
use reslot_core::{Directive, InMemoryBackend, StorageDiff, StorageImage, TypeDescriptor, TypeDictionary};
use reslot_rewrite::StorageRewriter;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// File names a fixture directory must contain.
pub const OLD_STORAGE: &str = "old_storage.json";
pub const DIRECTIVES: &str = "directives.json";
pub const TYPES: &str = "types.json";
pub const NEW_STORAGE: &str = "new_storage.json";

/// One storage slot on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    /// 32-byte slot key.
    pub key: B256,
    /// 32-byte slot value.
    pub value: B256,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HarnessError> {
    let raw = fs::read_to_string(path).map_err(|source| HarnessError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| HarnessError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a storage image, dropping all-zero entries.
pub fn load_storage(path: &Path) -> Result<StorageImage, HarnessError> {
    let entries: Vec<StorageEntry> = read_json(path)?;
    Ok(entries
        .into_iter()
        .filter(|entry| entry.value != B256::ZERO)
        .map(|entry| (entry.key, entry.value))
        .collect())
}

/// Loads the ordered directive list.
pub fn load_directives(path: &Path) -> Result<Vec<Directive>, HarnessError> {
    read_json(path)
}

/// Loads the type dictionary.
pub fn load_types(path: &Path) -> Result<TypeDictionary, HarnessError> {
    let descriptors: Vec<TypeDescriptor> = read_json(path)?;
    Ok(TypeDictionary::new(descriptors))
}

/// Renders an image as wire entries, sorted by key so output is stable.
pub fn storage_entries(image: &StorageImage) -> Vec<StorageEntry> {
    let mut entries: Vec<StorageEntry> = image
        .iter()
        .map(|(key, value)| StorageEntry {
            key: *key,
            value: *value,
        })
        .collect();
    entries.sort_by_key(|entry| entry.key);
    entries
}

/// Runs a fixture's rewrite and returns the resulting backend.
///
/// The backend starts as the old image; commit deletes the old keys and
/// writes the rewritten slots, exactly as it would against a real state
/// database.
pub fn apply_fixture(dir: &Path) -> Result<InMemoryBackend, HarnessError> {
    debug!("applying fixture {}", dir.display());
    let committed = load_storage(&dir.join(OLD_STORAGE))?;
    let directives = load_directives(&dir.join(DIRECTIVES))?;
    let types = load_types(&dir.join(TYPES))?;

    let mut backend = InMemoryBackend::from_image(committed.clone());
    let mut rewriter = StorageRewriter::new(committed, types);
    rewriter.run(&directives)?;
    rewriter.commit_to(&mut backend);
    Ok(backend)
}

/// Runs a fixture and compares the result against its expected image.
///
/// Returns `None` on a match, or the first difference otherwise.
pub fn check_fixture(dir: &Path) -> Result<Option<StorageDiff>, HarnessError> {
    let actual = apply_fixture(dir)?;
    let expected = InMemoryBackend::from_image(load_storage(&dir.join(NEW_STORAGE))?);
    Ok(expected.diff(&actual))
}
