//! ECDSA signing, recovery and verification over a framed Keccak-256
//! digest (`spec.md` §4.2).
//!
//! The message framing mirrors how Ethereum-adjacent tooling signs
//! arbitrary application messages: a fixed ASCII prefix naming the chain,
//! the decimal length of the message, then the message bytes, all digested
//! with Keccak-256 before the curve operation. This lets a hardware wallet
//! or any signer show the user a readable string instead of raw bytes.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sequencer_types::VoterAddress;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub const SIGNATURE_LEN: usize = 65;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigVerifyError {
    #[error("signature must be exactly 65 bytes (R || S || v)")]
    MalformedSignature,
    #[error("recovery id byte {0} is not in the accepted v range")]
    InvalidRecoveryId(u8),
    #[error("recovered point is not a valid verifying key")]
    RecoveryFailed,
}

/// A 65-byte ECDSA signature: `R(32) || S(32) || v(1)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSignature(pub [u8; SIGNATURE_LEN]);

impl RawSignature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigVerifyError> {
        let arr: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| SigVerifyError::MalformedSignature)?;
        Ok(Self(arr))
    }

    fn split(&self) -> (&[u8; 64], u8) {
        let rs: &[u8; 64] = self.0[..64].try_into().unwrap();
        (rs, self.0[64])
    }
}

/// Frame `message` with the chain-scoped prefix and hash it with
/// Keccak-256, per `spec.md` §4.2.
pub fn framed_digest(chain_name: &str, message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19");
    hasher.update(chain_name.as_bytes());
    hasher.update(b" Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Normalize a `v` byte from any of the accepted encodings (`0`, `1`, `27`,
/// `28`, or the same shifted by an EIP-155 chain id) to a canonical
/// `RecoveryId` in `{0, 1}`.
fn normalize_recovery_id(v: u8) -> Result<RecoveryId, SigVerifyError> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ if v >= 35 => (v - 35) % 2,
        _ => return Err(SigVerifyError::InvalidRecoveryId(v)),
    };
    RecoveryId::from_byte(normalized).ok_or(SigVerifyError::InvalidRecoveryId(v))
}

/// Derive the 20-byte Ethereum-style address from a verifying key:
/// the low 20 bytes of `Keccak256(uncompressed_pubkey[1..])`.
pub fn address_from_verifying_key(key: &VerifyingKey) -> VoterAddress {
    let uncompressed = key.to_encoded_point(false);
    let mut hasher = Keccak256::new();
    hasher.update(&uncompressed.as_bytes()[1..]);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..32]);
    VoterAddress(out)
}

/// Sign `message` (already framed by the caller via [`framed_digest`] if
/// needed — this function signs exactly the bytes it is given) with
/// `privkey`, returning a 65-byte recoverable signature.
pub fn sign(prehash: &[u8; 32], privkey: &SigningKey) -> RawSignature {
    let (sig, recid): (Signature, RecoveryId) = privkey
        .sign_prehash_recoverable(prehash)
        .expect("signing a 32-byte prehash cannot fail");
    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte();
    RawSignature(out)
}

/// Recover the signer's address from a prehashed message and signature.
pub fn recover(
    prehash: &[u8; 32],
    sig: &RawSignature,
) -> Result<(VoterAddress, VerifyingKey), SigVerifyError> {
    let (rs, v) = sig.split();
    let signature =
        Signature::from_slice(rs).map_err(|_| SigVerifyError::MalformedSignature)?;
    let recid = normalize_recovery_id(v)?;
    let key = VerifyingKey::recover_from_prehash(prehash, &signature, recid)
        .map_err(|_| SigVerifyError::RecoveryFailed)?;
    Ok((address_from_verifying_key(&key), key))
}

/// Recover the signer and report whether it matches `expected_address`.
///
/// A mismatch is not an error — `spec.md` §4.2 is explicit that this
/// returns `ok = false`, leaving the caller (Ingress) to decide how to
/// react (`InvalidSignature`).
pub fn verify(
    prehash: &[u8; 32],
    sig: &RawSignature,
    expected_address: &VoterAddress,
) -> Result<(bool, VerifyingKey), SigVerifyError> {
    let (recovered_address, key) = recover(prehash, sig)?;
    Ok((&recovered_address == expected_address, key))
}

/// Verify a signature against a known verifying key without recovery
/// (used by `CensusVerifier`'s CredentialSigned variant, which already
/// holds the CSP's public key and only needs to check the signature).
pub fn verify_with_known_key(
    prehash: &[u8; 32],
    sig: &RawSignature,
    key: &VerifyingKey,
) -> Result<bool, SigVerifyError> {
    let (rs, _v) = sig.split();
    let signature =
        Signature::from_slice(rs).map_err(|_| SigVerifyError::MalformedSignature)?;
    Ok(key.verify_prehash(prehash, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn sign_then_recover_yields_signer_address() {
        let sk = SigningKey::random(&mut OsRng);
        let vk = VerifyingKey::from(&sk);
        let expected = address_from_verifying_key(&vk);

        let digest = framed_digest("vocdoni", b"vote-id-0xdeadbeef");
        let sig = sign(&digest, &sk);

        let (recovered, _) = recover(&digest, &sig).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn verify_reports_false_not_error_on_mismatch() {
        let sk = SigningKey::random(&mut OsRng);
        let digest = framed_digest("vocdoni", b"message");
        let sig = sign(&digest, &sk);

        let wrong_address = VoterAddress([0xAAu8; 20]);
        let (ok, _) = verify(&digest, &sig, &wrong_address).unwrap();
        assert!(!ok);
    }

    #[test]
    fn malformed_signature_length_is_rejected() {
        let err = RawSignature::from_bytes(&[0u8; 10]).unwrap_err();
        assert_eq!(err, SigVerifyError::MalformedSignature);
    }

    #[test]
    fn accepts_legacy_and_normalized_v_values() {
        let sk = SigningKey::random(&mut OsRng);
        let digest = framed_digest("vocdoni", b"hello");
        let sig = sign(&digest, &sk);

        let mut legacy = sig;
        legacy.0[64] += 27;
        assert!(recover(&digest, &legacy).is_ok());
    }

    #[test]
    fn rejects_out_of_range_recovery_id() {
        let sk = SigningKey::random(&mut OsRng);
        let digest = framed_digest("vocdoni", b"hello");
        let mut sig = sign(&digest, &sk);
        sig.0[64] = 99;
        assert!(matches!(
            recover(&digest, &sig),
            Err(SigVerifyError::InvalidRecoveryId(99))
        ));
    }
}
