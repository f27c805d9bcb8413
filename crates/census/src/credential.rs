//! Credential-signed census verification: a CSP (credential service
//! provider) attests to a voter's weight with its own signature instead
//! of a Merkle tree.

use k256::ecdsa::VerifyingKey;
use sequencer_sigverify::{verify_with_known_key, RawSignature, SigVerifyError};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialCensusError {
    #[error("malformed CSP public key")]
    MalformedPublicKey,
    #[error("signature error: {0}")]
    Signature(#[from] SigVerifyError),
    #[error("CSP signature does not cover the submitted (root, process, voter, weight)")]
    SignatureMismatch,
}

/// Digest the attested tuple `(root, process_id, voter, weight)` the same
/// way `sequencer-sigverify` expects a prehash: Keccak-256 over the
/// concatenated big-endian encoding.
fn attestation_digest(root: &[u8; 32], process_id: &[u8; 32], voter: &[u8; 20], weight: u64) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(root);
    hasher.update(process_id);
    hasher.update(voter);
    hasher.update(weight.to_be_bytes());
    hasher.finalize().into()
}

pub fn verify_credential_signature(
    root: &[u8; 32],
    process_id: &[u8; 32],
    voter: &[u8; 20],
    declared_weight: u64,
    csp_public_key: &[u8; 33],
    csp_signature: &[u8; 65],
) -> Result<(), CredentialCensusError> {
    let key = VerifyingKey::from_sec1_bytes(csp_public_key)
        .map_err(|_| CredentialCensusError::MalformedPublicKey)?;
    let sig = RawSignature::from_bytes(csp_signature)?;
    let digest = attestation_digest(root, process_id, voter, declared_weight);

    let ok = verify_with_known_key(&digest, &sig, &key)?;
    if ok {
        Ok(())
    } else {
        Err(CredentialCensusError::SignatureMismatch)
    }
}
