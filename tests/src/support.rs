//! Shared builders for the end-to-end tests.

use alloy::primitives::{B256, U256};
use reslot_core::{slot, Directive, InMemoryBackend, StorageImage, TypeDescriptor, TypeDictionary};
use reslot_rewrite::StorageRewriter;

pub fn key(n: u64) -> B256 {
    slot::from_u256(U256::from(n))
}

pub fn word(n: u64) -> B256 {
    key(n)
}

/// A 32-byte value with single bytes poked at given positions.
pub fn packed(positions: &[(usize, u8)]) -> B256 {
    let mut buf = [0u8; 32];
    for (position, value) in positions {
        buf[*position] = *value;
    }
    B256::from(buf)
}

pub fn leaf(name: &str, width: u64) -> TypeDescriptor {
    TypeDescriptor {
        type_name: name.to_string(),
        base: String::new(),
        encoding: "inplace".to_string(),
        prev_width: width,
        new_width: width,
        members: Vec::new(),
    }
}

pub fn dynamic_array(name: &str, base: &str) -> TypeDescriptor {
    TypeDescriptor {
        type_name: name.to_string(),
        base: base.to_string(),
        encoding: "dynamic_array".to_string(),
        prev_width: 32,
        new_width: 32,
        members: Vec::new(),
    }
}

pub fn bytes_type(name: &str) -> TypeDescriptor {
    TypeDescriptor {
        type_name: name.to_string(),
        base: String::new(),
        encoding: "bytes".to_string(),
        prev_width: 32,
        new_width: 32,
        members: Vec::new(),
    }
}

/// Runs a full transform and commits into a backend seeded with the
/// committed image, returning the final image.
pub fn reorganize(
    committed: &StorageImage,
    directives: &[Directive],
    types: &TypeDictionary,
) -> StorageImage {
    let mut rewriter = StorageRewriter::new(committed.clone(), types.clone());
    rewriter.run(directives).expect("rewrite succeeds");
    let mut backend = InMemoryBackend::from_image(committed.clone());
    rewriter.commit_to(&mut backend);
    backend.image().clone()
}
