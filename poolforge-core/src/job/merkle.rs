//! Merkle branch construction and traversal.
//!
//! Two trees matter here. The transaction tree pins the coinbase at leaf
//! zero, so its branch is the list of sibling hashes the coinbase hash is
//! folded against left-to-right. The blockchain merkle tree used for merge
//! mining places aux chains at arbitrary slots, so its branches carry a mask
//! recording which side each sibling sits on.

use bitcoin::hashes::{sha256d, Hash};

/// Hash of an empty blockchain-merkle slot.
const EMPTY_SLOT: [u8; 32] = [0u8; 32];

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut concat = [0u8; 64];
    concat[..32].copy_from_slice(left);
    concat[32..].copy_from_slice(right);
    sha256d::Hash::hash(&concat).to_byte_array()
}

/// Build the merkle branch a coinbase at leaf zero must be hashed against.
///
/// `tx_hashes` excludes the coinbase. At each level the first remaining hash
/// is the coinbase's sibling; the rest pair up (duplicating the last when
/// odd) to form the next level.
pub(crate) fn coinbase_branch(tx_hashes: &[[u8; 32]]) -> Vec<[u8; 32]> {
    let mut branch = Vec::new();
    let mut level = tx_hashes.to_vec();
    while !level.is_empty() {
        branch.push(level[0]);
        let mut tail = level[1..].to_vec();
        if tail.len() % 2 == 1 {
            tail.push(*tail.last().unwrap());
        }
        level = tail.chunks(2).map(|pair| hash_pair(&pair[0], &pair[1])).collect();
    }
    branch
}

/// Fold a coinbase hash up the transaction tree.
///
/// Each branch element is appended on the right, matching the all-zeros
/// index of the coinbase leaf.
pub(crate) fn fold_coinbase(coinbase_hash: [u8; 32], branch: &[[u8; 32]]) -> [u8; 32] {
    let mut root = coinbase_hash;
    for sibling in branch {
        root = hash_pair(&root, sibling);
    }
    root
}

/// Merkle root of a blockchain-merkle base.
///
/// The base length is a power of two; unoccupied slots hash as 32 zero
/// bytes.
pub(crate) fn base_root(slots: &[Option<[u8; 32]>]) -> [u8; 32] {
    let mut level: Vec<[u8; 32]> = slots
        .iter()
        .map(|slot| slot.unwrap_or(EMPTY_SLOT))
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Branch and side mask for one leaf of a blockchain-merkle base.
///
/// The mask is read least-significant-bit first, one bit per level: 0 means
/// the sibling is on the right, 1 on the left. For a leaf at slot `i` the
/// mask therefore equals `i`.
pub(crate) fn slot_branch(
    slots: &[Option<[u8; 32]>],
    leaf: &[u8; 32],
) -> (Vec<[u8; 32]>, u32) {
    let mut index = slots
        .iter()
        .position(|slot| slot.as_ref() == Some(leaf))
        .expect("leaf was placed in the base by the packer");
    let mask = index as u32;
    let mut branch = Vec::new();
    let mut level: Vec<[u8; 32]> = slots
        .iter()
        .map(|slot| slot.unwrap_or(EMPTY_SLOT))
        .collect();
    while level.len() > 1 {
        branch.push(level[index ^ 1]);
        index >>= 1;
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    (branch, mask)
}

/// Fold a leaf up the blockchain merkle tree under a side mask.
#[cfg(test)]
pub(crate) fn fold_masked(leaf: [u8; 32], branch: &[[u8; 32]], mask: u32) -> [u8; 32] {
    let mut root = leaf;
    for (level, sibling) in branch.iter().enumerate() {
        if (mask >> level) & 1 == 1 {
            root = hash_pair(sibling, &root);
        } else {
            root = hash_pair(&root, sibling);
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> [u8; 32] {
        [byte; 32]
    }

    #[test]
    fn test_coinbase_branch_empty() {
        assert!(coinbase_branch(&[]).is_empty());
        // Root of a coinbase-only block is the coinbase hash itself
        assert_eq!(fold_coinbase(leaf(7), &[]), leaf(7));
    }

    #[test]
    fn test_coinbase_branch_single_tx() {
        let branch = coinbase_branch(&[leaf(1)]);
        assert_eq!(branch, vec![leaf(1)]);
        let root = fold_coinbase(leaf(0xcb), &branch);
        assert_eq!(root, hash_pair(&leaf(0xcb), &leaf(1)));
    }

    #[test]
    fn test_coinbase_branch_two_txs() {
        // Leaves: [coinbase, t1, t2]; t2 pairs with its own duplicate.
        let branch = coinbase_branch(&[leaf(1), leaf(2)]);
        assert_eq!(branch.len(), 2);
        assert_eq!(branch[0], leaf(1));
        assert_eq!(branch[1], hash_pair(&leaf(2), &leaf(2)));

        let root = fold_coinbase(leaf(0xcb), &branch);
        let expect = hash_pair(&hash_pair(&leaf(0xcb), &leaf(1)), &hash_pair(&leaf(2), &leaf(2)));
        assert_eq!(root, expect);
    }

    #[test]
    fn test_coinbase_branch_three_txs() {
        // Leaves: [coinbase, t1, t2, t3]; the level above is
        // [h(cb, t1), h(t2, t3)], whose second element is the final sibling.
        let branch = coinbase_branch(&[leaf(1), leaf(2), leaf(3)]);
        assert_eq!(branch.len(), 2);
        assert_eq!(branch[0], leaf(1));
        assert_eq!(branch[1], hash_pair(&leaf(2), &leaf(3)));
    }

    #[test]
    fn test_base_root_pads_empty_slots() {
        let slots = vec![Some(leaf(9)), None];
        assert_eq!(base_root(&slots), hash_pair(&leaf(9), &EMPTY_SLOT));
    }

    #[test]
    fn test_slot_branch_masks_encode_position() {
        let slots = vec![Some(leaf(1)), None, Some(leaf(3)), Some(leaf(4))];
        let root = base_root(&slots);

        for (byte, expected_mask) in [(1u8, 0u32), (3, 2), (4, 3)] {
            let (branch, mask) = slot_branch(&slots, &leaf(byte));
            assert_eq!(mask, expected_mask);
            assert_eq!(branch.len(), 2);
            assert_eq!(fold_masked(leaf(byte), &branch, mask), root);
        }
    }

    #[test]
    fn test_single_slot_degenerates_to_leaf() {
        let slots = vec![Some(leaf(5))];
        let (branch, mask) = slot_branch(&slots, &leaf(5));
        assert!(branch.is_empty());
        assert_eq!(mask, 0);
        assert_eq!(base_root(&slots), leaf(5));
    }
}
