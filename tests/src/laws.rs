//! Algebraic laws the rewriter must satisfy: identity, round-trip,
//! determinism and order-independence, commit idempotence, zero-skip, and
//! conflict detection for overlapping directives.

use crate::support::*;
use alloy::primitives::{B256, U256};
use reslot_core::{slot, Directive, InMemoryBackend, StorageImage, TypeDictionary};
use reslot_rewrite::StorageRewriter;

/// A moderately rich image: a packed pair, a dynamic array, and a short
/// byte-string, with directives mapping every entity onto itself.
fn identity_setup() -> (StorageImage, Vec<Directive>, TypeDictionary) {
    let array_data = slot::data_head(&key(2));
    let mut inline = [0u8; 32];
    inline[..3].copy_from_slice(b"abc");
    inline[31] = 0x06;

    let committed = StorageImage::from([
        (key(0), packed(&[(31, 5), (15, 6)])),
        (key(2), word(2)),
        (array_data, word(77)),
        (slot::add(&array_data, U256::from(1)), word(78)),
        (key(3), B256::from(inline)),
    ]);
    let directives = vec![
        Directive {
            type_name: "t_uint128".to_string(),
            prev_slot: key(0),
            new_slot: key(0),
            prev_offset: 0,
            new_offset: 0,
        },
        Directive {
            type_name: "t_uint128".to_string(),
            prev_slot: key(0),
            new_slot: key(0),
            prev_offset: 16,
            new_offset: 16,
        },
        Directive::whole_slot("t_array(t_uint256)dyn_storage", key(2), key(2)),
        Directive::whole_slot("t_bytes_storage", key(3), key(3)),
    ];
    let types = TypeDictionary::new([
        leaf("t_uint128", 16),
        leaf("t_uint256", 32),
        dynamic_array("t_array(t_uint256)dyn_storage", "t_uint256"),
        bytes_type("t_bytes_storage"),
    ]);
    (committed, directives, types)
}

#[test]
fn identity_directives_reproduce_the_committed_image() {
    let (committed, directives, types) = identity_setup();
    let image = reorganize(&committed, &directives, &types);
    assert_eq!(image, committed);
}

#[test]
fn applying_a_layout_change_and_its_inverse_round_trips() {
    let array_data = slot::data_head(&key(2));
    let committed = StorageImage::from([
        (key(0), word(1234)),
        (key(2), word(2)),
        (array_data, word(7)),
        (slot::add(&array_data, U256::from(1)), word(8)),
    ]);
    let types = TypeDictionary::new([
        leaf("t_uint256", 32),
        dynamic_array("t_array(t_uint256)dyn_storage", "t_uint256"),
    ]);

    let forward = vec![
        Directive::whole_slot("t_uint256", key(0), key(5)),
        Directive::whole_slot("t_array(t_uint256)dyn_storage", key(2), key(6)),
    ];
    let inverse: Vec<Directive> = forward
        .iter()
        .map(|d| Directive {
            type_name: d.type_name.clone(),
            prev_slot: d.new_slot,
            new_slot: d.prev_slot,
            prev_offset: d.new_offset,
            new_offset: d.prev_offset,
        })
        .collect();

    let moved = reorganize(&committed, &forward, &types);
    assert_ne!(moved, committed);
    let restored = reorganize(&moved, &inverse, &types);
    assert_eq!(restored, committed);
}

#[test]
fn runs_are_deterministic_and_disjoint_directives_commute() {
    let (committed, directives, types) = identity_setup();

    let first = reorganize(&committed, &directives, &types);
    let second = reorganize(&committed, &directives, &types);
    assert_eq!(first, second);

    let mut reversed = directives.clone();
    reversed.reverse();
    let permuted = reorganize(&committed, &reversed, &types);
    assert_eq!(first, permuted);
}

#[test]
fn conflicting_directives_are_detected_by_order_sensitivity() {
    // two sources fight over slot 2: a conflicting fixture must not survive
    // the commute check above
    let committed = StorageImage::from([(key(0), word(1)), (key(1), word(2))]);
    let types = TypeDictionary::new([leaf("t_uint256", 32)]);
    let directives = vec![
        Directive::whole_slot("t_uint256", key(0), key(2)),
        Directive::whole_slot("t_uint256", key(1), key(2)),
    ];

    let in_order = reorganize(&committed, &directives, &types);
    let mut reversed = directives.clone();
    reversed.reverse();
    let swapped = reorganize(&committed, &reversed, &types);
    assert_ne!(
        in_order, swapped,
        "overlapping destination writes must show up as order sensitivity"
    );
}

#[test]
fn commit_is_idempotent() {
    let (committed, directives, types) = identity_setup();
    let mut rewriter = StorageRewriter::new(committed.clone(), types);
    rewriter.run(&directives).unwrap();

    let mut backend = InMemoryBackend::from_image(committed);
    rewriter.commit_to(&mut backend);
    let once = backend.image().clone();
    rewriter.commit_to(&mut backend);
    assert_eq!(backend.image(), &once);
}

#[test]
fn committed_images_never_leak_zero_entries() {
    // slot 1 has no directive, so its slot must vanish rather than linger
    // as an explicit zero
    let committed = StorageImage::from([(key(0), word(42)), (key(1), word(7))]);
    let types = TypeDictionary::new([leaf("t_uint256", 32)]);
    let image = reorganize(
        &committed,
        &[Directive::whole_slot("t_uint256", key(0), key(2))],
        &types,
    );
    assert_eq!(image, StorageImage::from([(key(2), word(42))]));
    assert!(image.values().all(|value| *value != B256::ZERO));
}

#[test]
fn sibling_fields_from_separate_directives_share_a_destination_slot() {
    // four uint64 lanes gathered from two source slots into one slot
    let committed = StorageImage::from([
        (key(0), packed(&[(31, 0xa1), (23, 0xa2)])),
        (key(1), packed(&[(31, 0xb1), (23, 0xb2)])),
    ]);
    let types = TypeDictionary::new([leaf("t_uint64", 8)]);
    let gather = |prev_slot: B256, prev_offset: u64, new_offset: u64| Directive {
        type_name: "t_uint64".to_string(),
        prev_slot,
        new_slot: key(4),
        prev_offset,
        new_offset,
    };
    let directives = vec![
        gather(key(0), 0, 0),
        gather(key(0), 8, 8),
        gather(key(1), 0, 16),
        gather(key(1), 8, 24),
    ];

    let image = reorganize(&committed, &directives, &types);
    assert_eq!(
        image,
        StorageImage::from([(
            key(4),
            packed(&[(31, 0xa1), (23, 0xa2), (15, 0xb1), (7, 0xb2)])
        )])
    );
}

#[test]
fn whole_values_from_two_source_slots_pack_into_one() {
    // two uint128 values gathered from separate slots land in the two
    // halves of the same destination slot
    let committed = StorageImage::from([(key(0), word(0x11)), (key(1), word(0x22))]);
    let types = TypeDictionary::new([leaf("t_uint128", 16)]);
    let directives = vec![
        Directive {
            type_name: "t_uint128".to_string(),
            prev_slot: key(0),
            new_slot: key(3),
            prev_offset: 0,
            new_offset: 0,
        },
        Directive {
            type_name: "t_uint128".to_string(),
            prev_slot: key(1),
            new_slot: key(3),
            prev_offset: 0,
            new_offset: 16,
        },
    ];
    let image = reorganize(&committed, &directives, &types);
    assert_eq!(
        image,
        StorageImage::from([(key(3), packed(&[(31, 0x11), (15, 0x22)]))])
    );
}
