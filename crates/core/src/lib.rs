//! Core primitives for the Reslot storage-layout reorganizer.
//!
//! This crate holds everything the rewriter builds on: 32-byte slot-key
//! arithmetic and keccak data-head derivation ([`slot`]), the type dictionary
//! driving the recursive traversal ([`types`]), reorganization directives
//! ([`directive`]), and the committed/modified slot store plus the backend the
//! final image is committed into ([`store`]).

pub mod directive;
pub mod result;
pub mod slot;
pub mod store;
pub mod types;

pub use directive::Directive;
pub use result::{Error, Result};
pub use store::{InMemoryBackend, SlotBackend, SlotStore, StorageDiff, StorageImage};
pub use types::{BaseChainEnd, Encoding, Member, TypeDescriptor, TypeDictionary};
