//! Type dictionary for layout-driven storage rewriting.
//!
//! Every type referenced by a reorganization directive resolves here to a
//! [`TypeDescriptor`]: its storage encoding, its widths under the old and new
//! layout, an optional element (base) type for containers, and an ordered
//! member list for structs. The dictionary also answers the two base-chain
//! questions the inplace rewriter needs: does a fixed-width region hide
//! dynamic content, and does it hide a struct.

use crate::result::{Error, Result};
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage encoding families the rewriter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Fixed-width data packed from the right of a slot, spilling across
    /// slots when wider than 32 bytes.
    Inplace,
    /// Head slot holds the element count; payload at `keccak256(head)`.
    DynamicArray,
    /// Short byte-strings inline in the head slot; long ones at
    /// `keccak256(head)` with `2·len + 1` in the head.
    Bytes,
}

impl Encoding {
    /// Parses the wire encoding string, if it is one of the handled kinds.
    pub fn parse(raw: &str) -> Option<Encoding> {
        match raw {
            "inplace" => Some(Encoding::Inplace),
            "dynamic_array" => Some(Encoding::DynamicArray),
            "bytes" => Some(Encoding::Bytes),
            _ => None,
        }
    }

    /// The wire spelling of this encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Inplace => "inplace",
            Encoding::DynamicArray => "dynamic_array",
            Encoding::Bytes => "bytes",
        }
    }
}

/// One member of a struct type.
///
/// Slot offsets are relative to the struct head and carried as full 32-byte
/// values on the wire; byte offsets address within a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Byte offset within the slot under the old layout.
    #[serde(rename = "oldOffset")]
    pub prev_offset: u64,
    /// Byte offset within the slot under the new layout.
    #[serde(rename = "newOffset")]
    pub new_offset: u64,
    /// Slot offset from the struct head under the old layout.
    #[serde(rename = "oldSlot")]
    pub prev_slot: B256,
    /// Slot offset from the struct head under the new layout.
    #[serde(rename = "newSlot")]
    pub new_slot: B256,
}

/// Layout metadata for a single type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// The type name this descriptor is keyed by.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Element type for containers; empty for leaves and structs.
    #[serde(default)]
    pub base: String,
    /// Raw encoding string; resolved lazily via [`TypeDescriptor::encoding`].
    pub encoding: String,
    /// Width in bytes under the old layout.
    #[serde(rename = "oldNumberOfBytes")]
    pub prev_width: u64,
    /// Width in bytes under the new layout.
    #[serde(rename = "newNumberOfBytes")]
    pub new_width: u64,
    /// Struct members; non-empty iff the type is a struct.
    #[serde(default)]
    pub members: Vec<Member>,
}

impl TypeDescriptor {
    /// A type is a struct when it has members.
    pub fn is_struct(&self) -> bool {
        !self.members.is_empty()
    }

    /// A type is flat when it has no base type.
    pub fn is_flat(&self) -> bool {
        self.base.is_empty()
    }

    /// A type is nested when it wraps a base type or is a struct.
    pub fn is_nested(&self) -> bool {
        !self.base.is_empty() || self.is_struct()
    }

    /// Resolves the raw encoding string to a handled [`Encoding`].
    pub fn encoding(&self) -> Result<Encoding> {
        Encoding::parse(&self.encoding).ok_or_else(|| Error::UnsupportedEncoding {
            type_name: self.type_name.clone(),
            encoding: self.encoding.clone(),
        })
    }
}

/// Where a base chain ends once `inplace` wrappers are peeled off.
#[derive(Debug, Clone, Copy)]
pub enum BaseChainEnd<'a> {
    /// The first descendant stored as a dynamic array.
    DynamicArray(&'a TypeDescriptor),
    /// The first descendant stored as a byte-string.
    Bytes(&'a TypeDescriptor),
    /// The chain bottomed out on a flat `inplace` type.
    Flat(&'a TypeDescriptor),
}

/// Lookup table from type name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct TypeDictionary {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeDictionary {
    /// Builds a dictionary keyed by each descriptor's type name.
    pub fn new(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let types = descriptors
            .into_iter()
            .map(|descriptor| (descriptor.type_name.clone(), descriptor))
            .collect();
        Self { types }
    }

    /// Looks up a descriptor by type name.
    pub fn get(&self, name: &str) -> Result<&TypeDescriptor> {
        self.types.get(name).ok_or_else(|| Error::UnknownType {
            name: name.to_string(),
        })
    }

    /// Resolves a type's encoding.
    pub fn encoding(&self, name: &str) -> Result<Encoding> {
        self.get(name)?.encoding()
    }

    /// Returns a type's (old, new) widths in bytes.
    pub fn widths(&self, name: &str) -> Result<(u64, u64)> {
        let descriptor = self.get(name)?;
        Ok((descriptor.prev_width, descriptor.new_width))
    }

    /// Walks the base chain while the encoding stays `inplace` and returns
    /// the first descriptor that leaves it, or the flat terminus if none
    /// does.
    ///
    /// A fixed-width region whose chain ends in [`BaseChainEnd::DynamicArray`]
    /// or [`BaseChainEnd::Bytes`] hides keccak-addressed content and cannot be
    /// moved with a plain byte copy.
    pub fn extract_until_non_inplace(&self, name: &str) -> Result<BaseChainEnd<'_>> {
        let mut current = self.get(name)?;
        loop {
            match current.encoding()? {
                Encoding::DynamicArray => return Ok(BaseChainEnd::DynamicArray(current)),
                Encoding::Bytes => return Ok(BaseChainEnd::Bytes(current)),
                Encoding::Inplace if current.is_flat() => return Ok(BaseChainEnd::Flat(current)),
                Encoding::Inplace => current = self.get(&current.base)?,
            }
        }
    }

    /// Walks the base chain and returns the first struct descriptor, if any.
    pub fn find_struct(&self, name: &str) -> Result<Option<&TypeDescriptor>> {
        let mut current = self.get(name)?;
        loop {
            if current.is_struct() {
                return Ok(Some(current));
            }
            if current.base.is_empty() {
                return Ok(None);
            }
            current = self.get(&current.base)?;
        }
    }
}
