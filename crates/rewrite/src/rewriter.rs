//! Storage rewriter.
//!
//! This pass does not touch bytecode; it rewrites the *stored slots* of a
//! contract whose declared layout changed. Each directive names a type and an
//! old/new root location, and the rewriter recurses from there guided by the
//! type dictionary: packed `inplace` regions are copied byte-for-byte,
//! dynamic arrays chase their payload through `keccak256(head)`, byte-strings
//! carry short payloads inside the head and chase long ones the same way.
//!
//! Storage example, moving a three-element `uint256[]` from slot 2 to slot 7:
//!
//! ```text
//! // Before                                  // After
//! 0x02           = 3                         0x07           = 3
//! keccak(0x02)+0 = e0                        keccak(0x07)+0 = e0
//! keccak(0x02)+1 = e1                        keccak(0x07)+1 = e1
//! keccak(0x02)+2 = e2                        keccak(0x07)+2 = e2
//! ```
//!
//! All writes land in the modified buffer; the committed image is never
//! mutated. Packed destination slots are read back from the modified buffer
//! before each single-byte write so sibling fields already relocated into the
//! same slot survive. Nothing reaches the backing store until [`commit`]
//! publishes the buffer.
//!
//! [`commit`]: StorageRewriter::commit_to

use crate::{Error, Result};
use alloy::primitives::{B256, U256};
use reslot_core::{
    slot, BaseChainEnd, Directive, Encoding, SlotBackend, SlotStore, StorageImage, TypeDictionary,
};
use tracing::debug;

/// What a fixed-width `inplace` region hides, deciding the rewrite strategy.
///
/// Dynamic content dominates struct containment: an array of structs reached
/// through a dynamic extension is rewritten by the dynamic-array rewriter,
/// which recurses into the struct elements itself.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RegionKind {
    /// The base chain reaches a dynamic array; each region slot is its head.
    DynamicArray(String),
    /// The base chain reaches a byte-string; each region slot is its head.
    Bytes(String),
    /// The region repeats a struct with the named type.
    Struct(String),
    /// Plain fixed-width data; a byte copy moves it.
    Primitive,
}

/// Rewrites a committed storage image into a new layout, one directive at a
/// time, and commits the result into a [`SlotBackend`].
#[derive(Debug, Clone)]
pub struct StorageRewriter {
    store: SlotStore,
    types: TypeDictionary,
}

impl StorageRewriter {
    /// Creates a rewriter over a committed image and a type dictionary.
    pub fn new(committed: StorageImage, types: TypeDictionary) -> Self {
        Self {
            store: SlotStore::new(committed),
            types,
        }
    }

    /// Applies every directive in order.
    ///
    /// Any failure is fatal to the whole transform: the modified buffer is
    /// left unpublished and should be discarded with the rewriter.
    pub fn run(&mut self, directives: &[Directive]) -> Result<()> {
        for directive in directives {
            self.dispatch(directive)?;
        }
        Ok(())
    }

    /// The committed/modified pair, mainly for inspection in tests.
    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Publishes the rewrite: deletes every committed key from `target`,
    /// then writes every non-zero modified slot.
    pub fn commit_to(&self, target: &mut dyn SlotBackend) {
        self.store.commit_to(target);
    }

    /// Routes a directive to the rewriter for its type's encoding.
    fn dispatch(&mut self, directive: &Directive) -> Result<()> {
        match self.types.encoding(&directive.type_name)? {
            Encoding::Inplace => self.rewrite_inplace(directive),
            Encoding::DynamicArray => self.rewrite_dynamic_array(directive),
            Encoding::Bytes => self.rewrite_bytes(directive),
        }
    }

    /// Classifies what an inplace region hides. Lookup order is significant:
    /// a dynamic extension wins over a struct, which wins over the byte copy.
    fn classify(&self, type_name: &str) -> Result<RegionKind> {
        match self.types.extract_until_non_inplace(type_name)? {
            BaseChainEnd::DynamicArray(descriptor) => {
                return Ok(RegionKind::DynamicArray(descriptor.type_name.clone()));
            }
            BaseChainEnd::Bytes(descriptor) => {
                return Ok(RegionKind::Bytes(descriptor.type_name.clone()));
            }
            BaseChainEnd::Flat(_) => {}
        }
        Ok(match self.types.find_struct(type_name)? {
            Some(descriptor) => RegionKind::Struct(descriptor.type_name.clone()),
            None => RegionKind::Primitive,
        })
    }

    /// Rewrites a fixed-width region.
    fn rewrite_inplace(&mut self, directive: &Directive) -> Result<()> {
        let (prev_width, _) = self.types.widths(&directive.type_name)?;
        debug!(
            "inplace: type={} prev={}+{} new={}+{} width={}",
            directive.type_name,
            directive.prev_slot,
            directive.prev_offset,
            directive.new_slot,
            directive.new_offset,
            prev_width
        );

        match self.classify(&directive.type_name)? {
            RegionKind::DynamicArray(extension) => {
                self.rewrite_region_heads(directive, prev_width, &extension, Encoding::DynamicArray)
            }
            RegionKind::Bytes(extension) => {
                self.rewrite_region_heads(directive, prev_width, &extension, Encoding::Bytes)
            }
            RegionKind::Struct(struct_type) => {
                self.rewrite_struct_region(directive, prev_width, &struct_type)
            }
            RegionKind::Primitive => {
                self.copy_bytes(directive, prev_width);
                Ok(())
            }
        }
    }

    /// Treats each slot of a fixed-width region as the head of a hidden
    /// dynamic entity and rewrites them one by one with zero offsets.
    fn rewrite_region_heads(
        &mut self,
        directive: &Directive,
        width: u64,
        extension_type: &str,
        encoding: Encoding,
    ) -> Result<()> {
        if width == 0 || width % 32 != 0 {
            return Err(Error::MalformedDescriptor {
                type_name: directive.type_name.clone(),
                reason: format!("width {width} of a slot-spanning region is not a multiple of 32"),
            });
        }
        for i in 0..width / 32 {
            let sub = Directive::whole_slot(
                extension_type,
                slot::add(&directive.prev_slot, U256::from(i)),
                slot::add(&directive.new_slot, U256::from(i)),
            );
            match encoding {
                Encoding::DynamicArray => self.rewrite_dynamic_array(&sub)?,
                Encoding::Bytes => self.rewrite_bytes(&sub)?,
                Encoding::Inplace => {
                    return Err(Error::MalformedDescriptor {
                        type_name: extension_type.to_string(),
                        reason: "an inplace type cannot be a dynamic extension".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Rewrites the repetitions of a struct filling a fixed-width region,
    /// dispatching each member as its own sub-directive.
    fn rewrite_struct_region(
        &mut self,
        directive: &Directive,
        prev_width: u64,
        struct_type: &str,
    ) -> Result<()> {
        let descriptor = self.types.get(struct_type)?.clone();
        let prev_struct_width = descriptor.prev_width;
        let new_struct_width = descriptor.new_width;

        if prev_struct_width == 0 || prev_struct_width % 32 != 0 || new_struct_width % 32 != 0 {
            return Err(Error::MalformedDescriptor {
                type_name: struct_type.to_string(),
                reason: format!(
                    "struct widths ({prev_struct_width}, {new_struct_width}) must be non-zero multiples of 32"
                ),
            });
        }
        if prev_width % prev_struct_width != 0 {
            return Err(Error::MalformedDescriptor {
                type_name: directive.type_name.clone(),
                reason: format!(
                    "region width {prev_width} is not a multiple of struct width {prev_struct_width}"
                ),
            });
        }

        let mut prev_head = directive.prev_slot;
        let mut new_head = directive.new_slot;
        for _ in 0..prev_width / prev_struct_width {
            for member in &descriptor.members {
                let sub = Directive {
                    type_name: member.type_name.clone(),
                    prev_slot: slot::add(&prev_head, slot::to_u256(&member.prev_slot)),
                    new_slot: slot::add(&new_head, slot::to_u256(&member.new_slot)),
                    prev_offset: member.prev_offset,
                    new_offset: member.new_offset,
                };
                self.dispatch(&sub)?;
            }
            prev_head = slot::add(&prev_head, U256::from(prev_struct_width / 32));
            new_head = slot::add(&new_head, U256::from(new_struct_width / 32));
        }
        Ok(())
    }

    /// Copies a primitive region byte-for-byte under the big-endian
    /// convention: byte offset `o` sits at slot position `31 - (o % 32)`.
    ///
    /// The destination slot is read back from the modified buffer each step
    /// so sibling packed fields already written there are preserved.
    fn copy_bytes(&mut self, directive: &Directive, prev_width: u64) {
        let mut prev_offset = directive.prev_offset;
        let mut new_offset = directive.new_offset;
        for _ in 0..prev_width {
            let src_key = slot::add(&directive.prev_slot, U256::from(prev_offset / 32));
            let dst_key = slot::add(&directive.new_slot, U256::from(new_offset / 32));

            let src = self.store.read_committed(&src_key);
            let mut dst = self.store.read_modified(&dst_key);
            dst.0[slot::byte_position(new_offset)] = src.0[slot::byte_position(prev_offset)];
            self.store.write_modified(dst_key, dst);

            prev_offset += 1;
            new_offset += 1;
        }
    }

    /// Rewrites a dynamic array: carries the element count across, then
    /// recurses over the payload at `keccak256(head)` according to the base
    /// type's encoding and flatness.
    fn rewrite_dynamic_array(&mut self, directive: &Directive) -> Result<()> {
        let descriptor = self.types.get(&directive.type_name)?.clone();

        let prev_head = self.store.read_committed(&directive.prev_slot);
        self.copy_head_window(directive, descriptor.prev_width, &prev_head);

        let element_count = slot::to_u256(&prev_head);
        debug!(
            "dynamic_array: type={} prev={} new={} elements={}",
            directive.type_name, directive.prev_slot, directive.new_slot, element_count
        );
        if element_count.is_zero() {
            return Ok(());
        }

        let prev_data = slot::data_head(&directive.prev_slot);
        let new_data = slot::data_head(&directive.new_slot);
        let base = descriptor.base.as_str();

        match self.types.encoding(base)? {
            Encoding::Inplace => {
                let base_descriptor = self.types.get(base)?.clone();
                if base_descriptor.is_nested() {
                    // whole-slot elements (structs, static arrays, wrappers)
                    let prev_elem_width = base_descriptor.prev_width;
                    let new_elem_width = base_descriptor.new_width;
                    if prev_elem_width % 32 != 0 || new_elem_width % 32 != 0 {
                        return Err(Error::MalformedDescriptor {
                            type_name: base.to_string(),
                            reason: format!(
                                "element widths ({prev_elem_width}, {new_elem_width}) must be multiples of 32"
                            ),
                        });
                    }
                    let prev_stride = U256::from(prev_elem_width / 32);
                    let new_stride = U256::from(new_elem_width / 32);
                    let mut index = U256::ZERO;
                    while index < element_count {
                        let sub = Directive::whole_slot(
                            base,
                            slot::add(&prev_data, prev_stride.wrapping_mul(index)),
                            slot::add(&new_data, new_stride.wrapping_mul(index)),
                        );
                        self.rewrite_inplace(&sub)?;
                        index += U256::from(1);
                    }
                } else {
                    // packed primitive elements, several to a slot
                    let elem_width = base_descriptor.prev_width;
                    if elem_width == 0 || 32 % elem_width != 0 {
                        return Err(Error::MalformedDescriptor {
                            type_name: base.to_string(),
                            reason: format!("packed element width {elem_width} does not divide 32"),
                        });
                    }
                    let per_slot = 32 / elem_width;
                    let (mut slot_count, remainder) = element_count.div_rem(U256::from(per_slot));
                    if !remainder.is_zero() {
                        slot_count += U256::from(1);
                    }
                    let mut index = U256::ZERO;
                    while index < slot_count {
                        for lane in 0..per_slot {
                            let sub = Directive {
                                type_name: base.to_string(),
                                prev_slot: slot::add(&prev_data, index),
                                new_slot: slot::add(&new_data, index),
                                prev_offset: lane * elem_width,
                                new_offset: lane * elem_width,
                            };
                            self.rewrite_inplace(&sub)?;
                        }
                        index += U256::from(1);
                    }
                }
            }
            Encoding::DynamicArray | Encoding::Bytes => {
                // element heads in consecutive slots; the inplace rewriter
                // spots the extension and chains through keccak again
                let mut index = U256::ZERO;
                while index < element_count {
                    let sub = Directive::whole_slot(
                        base,
                        slot::add(&prev_data, index),
                        slot::add(&new_data, index),
                    );
                    self.rewrite_inplace(&sub)?;
                    index += U256::from(1);
                }
            }
        }
        Ok(())
    }

    /// Rewrites a byte-string: the head travels whole (form, length, any
    /// inline payload), and a long payload is copied slot-wise from
    /// `keccak256(old head)` to `keccak256(new head)`.
    fn rewrite_bytes(&mut self, directive: &Directive) -> Result<()> {
        let (prev_width, _) = self.types.widths(&directive.type_name)?;

        let prev_head = self.store.read_committed(&directive.prev_slot);
        self.copy_head_window(directive, prev_width, &prev_head);

        if prev_head.0[31] & 1 == 0 {
            // short form: up to 31 bytes live inline and already moved
            debug!(
                "bytes: type={} prev={} new={} short",
                directive.type_name, directive.prev_slot, directive.new_slot
            );
            return Ok(());
        }

        let length = (slot::to_u256(&prev_head) - U256::from(1)) / U256::from(2);
        let (full, remainder) = length.div_rem(U256::from(32));
        let slot_count = if remainder.is_zero() {
            full
        } else {
            full + U256::from(1)
        };
        let slot_count = u64::try_from(slot_count).map_err(|_| Error::MalformedBytesHead {
            slot: directive.prev_slot,
            length,
        })?;
        debug!(
            "bytes: type={} prev={} new={} long length={} slots={}",
            directive.type_name, directive.prev_slot, directive.new_slot, length, slot_count
        );

        let prev_data = slot::data_head(&directive.prev_slot);
        let new_data = slot::data_head(&directive.new_slot);
        for i in 0..slot_count {
            let value = self
                .store
                .read_committed(&slot::add(&prev_data, U256::from(i)));
            self.store
                .write_modified(slot::add(&new_data, U256::from(i)), value);
        }
        Ok(())
    }

    /// Copies the low `min(width, 32)` bytes of a head slot from committed to
    /// modified: the length-carrying window of a dynamic head.
    fn copy_head_window(&mut self, directive: &Directive, width: u64, prev_head: &B256) {
        let window = width.min(32) as usize;
        let mut new_head = self.store.read_modified(&directive.new_slot);
        new_head.0[32 - window..].copy_from_slice(&prev_head.0[32 - window..]);
        self.store.write_modified(directive.new_slot, new_head);
    }
}
