//! Groth16 proof verification against a verification key, and the
//! transform into a recursion-friendly form the aggregator consumes
//! (`spec.md` §4.4).
//!
//! Built on the arkworks BN254 stack (`ark-bn254`/`ark-groth16`/`ark-ff`),
//! the same family the teacher vendors for its on-chain verifier
//! (`gnark-solana/crates/verifier-lib`), used here in its ordinary
//! off-chain form since this adapter is a plain library call rather than a
//! Solana program constrained to syscall-sized inputs.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use once_cell::sync::OnceCell;
use sequencer_types::FieldElement;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProofAdapterError {
    #[error("failed to parse verification key: {0}")]
    InvalidVerificationKey(String),
    #[error("failed to parse proof: {0}")]
    InvalidProof(String),
    #[error("verification key singleton already failed to initialize")]
    SingletonPoisoned,
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
}

/// A recursion-friendly representation of a verified proof. This is the
/// form stored alongside the `QueuedBallot` for the aggregation stage to
/// consume (`spec.md` §4.4); it is not re-verified downstream, only
/// transported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformedProof {
    pub canonical_proof_bytes: Vec<u8>,
    pub public_inputs: Vec<[u8; 32]>,
}

/// Process-wide verification-key cache. `spec.md` §4.4/§9 describe "a
/// lazily-initialised singleton protected by an initialisation guard" —
/// `OnceCell::get_or_try_init` is exactly that: reentrant-safe, and the
/// loader runs at most once even under concurrent first access.
pub struct VerifyingKeyCache {
    cell: OnceCell<PreparedVerifyingKey<Bn254>>,
}

impl VerifyingKeyCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Parse and prepare `raw_vk_bytes` on first call; every subsequent
    /// call (regardless of the bytes passed) returns the cached value.
    /// Callers are expected to only ever load one verification key per
    /// cache instance, matching the singleton contract in `spec.md` §4.4.
    pub fn get_or_init(
        &self,
        raw_vk_bytes: &[u8],
    ) -> Result<&PreparedVerifyingKey<Bn254>, ProofAdapterError> {
        self.cell.get_or_try_init(|| {
            let vk = VerifyingKey::<Bn254>::deserialize_compressed(raw_vk_bytes)
                .map_err(|e| ProofAdapterError::InvalidVerificationKey(e.to_string()))?;
            Ok(ark_groth16::prepare_verifying_key(&vk))
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for VerifyingKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify `proof_bytes` (a canonically-serialized `ark_groth16::Proof`)
/// against `vk` with the given `public_inputs`, and produce the
/// transformed form to carry downstream.
///
/// For ballot admission, `public_inputs` is the one-element list
/// `[ballot_inputs_hash]` (`spec.md` §4.4).
#[tracing::instrument(skip(vk, proof_bytes), fields(num_public_inputs = public_inputs.len()))]
pub fn verify(
    vk: &PreparedVerifyingKey<Bn254>,
    proof_bytes: &[u8],
    public_inputs: &[FieldElement],
) -> Result<(bool, TransformedProof), ProofAdapterError> {
    let proof = Proof::<Bn254>::deserialize_compressed(proof_bytes)
        .map_err(|e| ProofAdapterError::InvalidProof(e.to_string()))?;

    let scalars: Vec<Fr> = public_inputs.iter().map(|fe| fe.inner()).collect();

    let ok = ark_groth16::verifier::verify_proof(vk, &proof, &scalars)
        .map_err(|e| ProofAdapterError::VerificationFailed(format!("{e:?}")))?;

    if !ok {
        tracing::info!("groth16 proof verification returned false");
        return Ok((
            false,
            TransformedProof {
                canonical_proof_bytes: Vec::new(),
                public_inputs: Vec::new(),
            },
        ));
    }

    let mut canonical = Vec::new();
    proof
        .serialize_compressed(&mut canonical)
        .map_err(|e| ProofAdapterError::InvalidProof(e.to_string()))?;

    let transformed = TransformedProof {
        canonical_proof_bytes: canonical,
        public_inputs: public_inputs.iter().map(|fe| fe.to_bytes_be()).collect(),
    };

    Ok((true, transformed))
}
