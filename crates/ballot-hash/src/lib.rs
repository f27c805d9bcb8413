//! `BallotHasher` — derives the "ballot inputs hash" the ZK proof commits
//! to (`spec.md` §4.1).
//!
//! A pure function: identical inputs must yield bit-identical outputs
//! across runs and platforms, and the result must agree with the
//! circuit's own in-circuit hash. Uses the same Poseidon hasher
//! (`light-hasher`, the teacher's own dependency) the circuit is built
//! against, folded pairwise the way the teacher's on-chain Merkle hasher
//! folds sibling pairs (`merkle/mod.rs::hash_pair`) — the only difference
//! is the underlying primitive (Poseidon here, SHA-256 on-chain).

use light_hasher::{Hasher, Poseidon};
use sequencer_types::{BallotMode, Ciphertext, FieldElement, ProcessId, VoteId, VoterAddress};
use sha3::{Digest, Keccak256};
use thiserror::Error;

/// Domain separator for the ballot-inputs hash, analogous to the
/// teacher's `constants::domains` table.
pub const DOMAIN_BALLOT_INPUTS: [u8; 32] = {
    let mut bytes = [0u8; 32];
    bytes[31] = 0x20;
    bytes
};

#[derive(Error, Debug)]
pub enum BallotHasherError {
    #[error("poseidon hashing failed: {0}")]
    Poseidon(String),
}

/// Arbitrary-length opaque bytes (the vote id, or a serialized ballot-mode
/// record) are folded into a field element by first compressing them with
/// Keccak-256 and reducing the digest modulo the scalar field order —
/// the same "reduce into the field" step the teacher's `pubkey_to_field`
/// performs for 256-bit Solana pubkeys (`helpers/field.rs`), generalized
/// to arbitrary-length input via a pre-hash.
fn fold_bytes_to_field(bytes: &[u8]) -> FieldElement {
    let digest: [u8; 32] = Keccak256::digest(bytes).into();
    FieldElement::from_bytes_be_mod(&digest)
}

fn ballot_mode_commitment(mode: &BallotMode) -> FieldElement {
    let mut buf = Vec::with_capacity(32);
    buf.push(mode.num_fields);
    buf.extend_from_slice(&mode.min_value.to_be_bytes());
    buf.extend_from_slice(&mode.max_value.to_be_bytes());
    buf.extend_from_slice(&mode.cost_exponent.to_be_bytes());
    buf.push(mode.unique_values as u8);
    buf.push(mode.cost_from_weight as u8);
    buf.extend_from_slice(&mode.min_value_sum.to_be_bytes());
    buf.extend_from_slice(&mode.max_value_sum.to_be_bytes());
    fold_bytes_to_field(&buf)
}

fn poseidon_fold(acc: [u8; 32], next: [u8; 32]) -> Result<[u8; 32], BallotHasherError> {
    Poseidon::hashv(&[&acc, &next]).map_err(|e| BallotHasherError::Poseidon(format!("{e:?}")))
}

/// Compute the ballot-inputs hash.
///
/// `authoritative_weight` must be the value `CensusVerifier` returned,
/// never the client-declared one (`spec.md` §3, §4.1).
pub fn ballot_inputs_hash(
    process_id: &ProcessId,
    ballot_mode: &BallotMode,
    encryption_public_key: &[u8; 32],
    voter: &VoterAddress,
    vote_id: &VoteId,
    ciphertexts: &[Ciphertext],
    authoritative_weight: u64,
) -> Result<FieldElement, BallotHasherError> {
    let mut acc = DOMAIN_BALLOT_INPUTS;
    acc = poseidon_fold(acc, fold_bytes_to_field(&process_id.0).to_bytes_be())?;
    acc = poseidon_fold(acc, ballot_mode_commitment(ballot_mode).to_bytes_be())?;
    acc = poseidon_fold(acc, fold_bytes_to_field(encryption_public_key).to_bytes_be())?;
    acc = poseidon_fold(acc, fold_bytes_to_field(&voter.0).to_bytes_be())?;
    acc = poseidon_fold(acc, fold_bytes_to_field(&vote_id.0).to_bytes_be())?;
    for ct in ciphertexts {
        acc = poseidon_fold(acc, fold_bytes_to_field(&ct.c1).to_bytes_be())?;
        acc = poseidon_fold(acc, fold_bytes_to_field(&ct.c2).to_bytes_be())?;
    }
    acc = poseidon_fold(acc, FieldElement::from_u64(authoritative_weight).to_bytes_be())?;

    Ok(FieldElement::from_bytes_be_mod(&acc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mode() -> BallotMode {
        BallotMode {
            num_fields: 2,
            min_value: 0,
            max_value: 1,
            cost_exponent: 2,
            unique_values: false,
            cost_from_weight: false,
            min_value_sum: 0,
            max_value_sum: 2,
        }
    }

    #[test]
    fn deterministic_across_calls() {
        let process_id = ProcessId([9u8; 32]);
        let mode = sample_mode();
        let enc_key = [1u8; 32];
        let voter = VoterAddress([2u8; 20]);
        let vote_id = VoteId(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let ciphertexts = vec![Ciphertext {
            c1: [3u8; 32],
            c2: [4u8; 32],
        }];

        let a = ballot_inputs_hash(&process_id, &mode, &enc_key, &voter, &vote_id, &ciphertexts, 100)
            .unwrap();
        let b = ballot_inputs_hash(&process_id, &mode, &enc_key, &voter, &vote_id, &ciphertexts, 100)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_weight_changes_hash() {
        let process_id = ProcessId([9u8; 32]);
        let mode = sample_mode();
        let enc_key = [1u8; 32];
        let voter = VoterAddress([2u8; 20]);
        let vote_id = VoteId(vec![0xDE, 0xAD]);
        let ciphertexts = vec![Ciphertext {
            c1: [3u8; 32],
            c2: [4u8; 32],
        }];

        let a = ballot_inputs_hash(&process_id, &mode, &enc_key, &voter, &vote_id, &ciphertexts, 100)
            .unwrap();
        let b = ballot_inputs_hash(&process_id, &mode, &enc_key, &voter, &vote_id, &ciphertexts, 1000)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_vote_id_changes_hash() {
        let process_id = ProcessId([9u8; 32]);
        let mode = sample_mode();
        let enc_key = [1u8; 32];
        let voter = VoterAddress([2u8; 20]);
        let ciphertexts = vec![Ciphertext {
            c1: [3u8; 32],
            c2: [4u8; 32],
        }];

        let a = ballot_inputs_hash(
            &process_id,
            &mode,
            &enc_key,
            &voter,
            &VoteId(vec![0x01]),
            &ciphertexts,
            100,
        )
        .unwrap();
        let b = ballot_inputs_hash(
            &process_id,
            &mode,
            &enc_key,
            &voter,
            &VoteId(vec![0x02]),
            &ciphertexts,
            100,
        )
        .unwrap();
        assert_ne!(a, b);
    }
}
