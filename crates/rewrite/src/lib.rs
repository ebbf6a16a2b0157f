//! Layout-driven storage rewriting.
//!
//! Given a committed storage image, a type dictionary, and a list of
//! reorganization directives, [`StorageRewriter`] produces a new image that is
//! semantically equivalent under the changed layout. The whole transform is a
//! pure, synchronous function of its inputs; a failure anywhere abandons the
//! modified buffer and nothing is committed.

pub mod rewriter;

pub use rewriter::StorageRewriter;

use alloy::primitives::{B256, U256};
use thiserror::Error;

/// Rewrite error type encompassing all rewriter failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Type dictionary lookup or encoding resolution failed.
    #[error(transparent)]
    Type(#[from] reslot_core::Error),

    /// A descriptor's widths are inconsistent with how its region is laid out.
    #[error("malformed descriptor for `{type_name}`: {reason}")]
    MalformedDescriptor {
        /// The type whose descriptor is inconsistent.
        type_name: String,
        /// What was inconsistent about it.
        reason: String,
    },

    /// A byte-string head slot encodes a payload no slot range can hold.
    #[error("inconsistent bytes head at slot {slot}: payload of {length} bytes is not addressable")]
    MalformedBytesHead {
        /// The head slot carrying the inconsistent encoding.
        slot: B256,
        /// The payload length the head claims.
        length: U256,
    },
}

/// Rewrite result type
pub type Result<T> = std::result::Result<T, Error>;
