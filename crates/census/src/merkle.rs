//! Merkle-tree census verification.
//!
//! Generalizes the teacher's on-chain frontier/sibling-path hasher
//! (`merkle/mod.rs`: `hash_pair`, `verify_merkle_proof`) from a fixed,
//! syscall-budgeted on-chain depth to a proof-carried runtime depth
//! suitable for an off-chain service, and swaps the SHA-256 primitive for
//! the circuit's native Poseidon hasher (see `sequencer-ballot-hash` for
//! the same trade-off applied to the ballot-inputs hash).

use light_hasher::{Hasher, Poseidon};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleCensusError {
    #[error("hashing failed: {0}")]
    Hasher(String),
    #[error("recomputed root does not match the process census root")]
    RootMismatch,
}

#[inline]
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> Result<[u8; 32], MerkleCensusError> {
    Poseidon::hashv(&[left, right]).map_err(|e| MerkleCensusError::Hasher(format!("{e:?}")))
}

pub fn leaf_hash(voter: &[u8; 20], weight_bytes: &[u8; 32]) -> Result<[u8; 32], MerkleCensusError> {
    let mut padded_voter = [0u8; 32];
    padded_voter[12..].copy_from_slice(voter);
    hash_pair(&padded_voter, weight_bytes)
}

/// Recompute the Merkle root from `leaf` up through `siblings`, using
/// `leaf_index`'s bits (LSB first) to choose left/right orientation at
/// each level, and compare it to `expected_root`.
pub fn verify_merkle_proof(
    expected_root: &[u8; 32],
    leaf: &[u8; 32],
    leaf_index: u64,
    siblings: &[[u8; 32]],
) -> Result<(), MerkleCensusError> {
    let mut current = *leaf;
    let mut index = leaf_index;

    for sibling in siblings {
        current = if index % 2 == 0 {
            hash_pair(&current, sibling)?
        } else {
            hash_pair(sibling, &current)?
        };
        index /= 2;
    }

    if &current == expected_root {
        Ok(())
    } else {
        Err(MerkleCensusError::RootMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_inclusion_proof() {
        let voter = [1u8; 20];
        let weight = {
            let mut b = [0u8; 32];
            b[24..].copy_from_slice(&100u64.to_be_bytes());
            b
        };
        let leaf = leaf_hash(&voter, &weight).unwrap();

        // Depth-2 tree, leaf at index 2 (binary 10): even bit at level 0
        // means the leaf is the left child, odd bit at level 1 means it's
        // the right child at that level.
        let sibling0 = [9u8; 32];
        let sibling1 = [8u8; 32];
        let level0 = hash_pair(&leaf, &sibling0).unwrap();
        let root = hash_pair(&sibling1, &level0).unwrap();

        assert!(verify_merkle_proof(&root, &leaf, 2, &[sibling0, sibling1]).is_ok());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let leaf = [1u8; 32];
        let siblings = [[2u8; 32]];
        let bogus_root = [0xFFu8; 32];
        assert_eq!(
            verify_merkle_proof(&bogus_root, &leaf, 0, &siblings).unwrap_err(),
            MerkleCensusError::RootMismatch
        );
    }
}
