//! `CensusVerifier` — resolves a `CensusProof` into an authoritative
//! voter weight, dispatching on `CensusOrigin` (`spec.md` §3, §4.3).
//!
//! Dispatch is an explicit match over the tagged `CensusProof` enum, never
//! a trait object, per the "tagged variant over inheritance" design note
//! in `spec.md` §9 (mirrored by `sequencer-types::CensusProof` itself).

mod credential;
mod merkle;

pub use credential::{verify_credential_signature, CredentialCensusError};
pub use merkle::{hash_pair, leaf_hash, verify_merkle_proof, MerkleCensusError};

use sequencer_types::{CensusProof, CoreError, Process};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CensusVerifierError {
    #[error("census proof origin does not match the process's configured census origin")]
    OriginMismatch,
    #[error("census proof does not carry the process's current root")]
    RootMismatch,
    #[error(transparent)]
    Merkle(#[from] MerkleCensusError),
    #[error(transparent)]
    Credential(#[from] CredentialCensusError),
}

impl From<CensusVerifierError> for CoreError {
    fn from(_: CensusVerifierError) -> Self {
        CoreError::census_miss()
    }
}

/// Verify `proof` against `process`'s current census and return the
/// authoritative weight — never the proof's `declared_weight`
/// (`spec.md` §3, §4.3: "the weight the core trusts is never the one the
/// client claims").
pub fn verify_census(process: &Process, proof: &CensusProof) -> Result<u64, CensusVerifierError> {
    if proof.origin() != process.census.origin {
        return Err(CensusVerifierError::OriginMismatch);
    }
    if proof.root() != process.census.root {
        return Err(CensusVerifierError::RootMismatch);
    }

    match proof {
        CensusProof::MerkleTree {
            voter,
            siblings,
            leaf_index,
            value,
            ..
        } => {
            let leaf = leaf_hash(&voter.0, value)?;
            verify_merkle_proof(&process.census.root, &leaf, *leaf_index, siblings)?;
            Ok(weight_from_leaf_value(value))
        }
        CensusProof::CredentialSigned {
            voter,
            process_id,
            csp_public_key,
            csp_signature,
            declared_weight,
            ..
        } => {
            verify_credential_signature(
                &process.census.root,
                &process_id.0,
                &voter.0,
                *declared_weight,
                csp_public_key,
                csp_signature,
            )?;
            Ok(*declared_weight)
        }
    }
}

/// The census tree stores a leaf's weight as the big-endian encoding of a
/// `u64` right-padded into the 32-byte leaf value.
fn weight_from_leaf_value(value: &[u8; 32]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&value[24..]);
    u64::from_be_bytes(buf)
}
