//! Reorganization directives.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

/// Orders one top-level rewrite: the entity of `type_name` rooted at
/// (`prev_slot`, `prev_offset`) moves to (`new_slot`, `new_offset`).
///
/// Offsets are byte offsets within the slot, counted from the right under the
/// platform's big-endian convention. The rewriters issue sub-directives of the
/// same shape while recursing into containers and struct members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Type of the entity being moved.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Head slot under the old layout.
    #[serde(rename = "oldSlot")]
    pub prev_slot: B256,
    /// Head slot under the new layout.
    #[serde(rename = "newSlot")]
    pub new_slot: B256,
    /// Byte offset within the old slot.
    #[serde(rename = "oldOffset")]
    pub prev_offset: u64,
    /// Byte offset within the new slot.
    #[serde(rename = "newOffset")]
    pub new_offset: u64,
}

impl Directive {
    /// A directive for a whole-slot entity, with zero byte offsets.
    pub fn whole_slot(type_name: impl Into<String>, prev_slot: B256, new_slot: B256) -> Self {
        Self {
            type_name: type_name.into(),
            prev_slot,
            new_slot,
            prev_offset: 0,
            new_offset: 0,
        }
    }
}
