//! `Ballot` — the wire-submitted vote, and `QueuedBallot` — its internal,
//! BallotQueue-owned representation (`spec.md` §3).

use crate::census_proof::CensusProof;
use crate::field::FieldElement;
use crate::ids::{ProcessId, VoteId, VoterAddress, WorkerId};
use serde::{Deserialize, Serialize};

/// One ElGamal ciphertext pair over a single ballot field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    #[serde(with = "crate::hexbytes::fixed")]
    pub c1: [u8; 32],
    #[serde(with = "crate::hexbytes::fixed")]
    pub c2: [u8; 32],
}

/// A submitted ballot exactly as it arrives over the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ballot {
    pub process_id: ProcessId,
    pub voter: VoterAddress,
    pub vote_id: VoteId,
    pub ciphertexts: Vec<Ciphertext>,
    pub ballot_inputs_hash: FieldElement,
    /// Raw Groth16-style proof bytes, as produced by the client.
    #[serde(with = "crate::hexbytes::vec")]
    pub proof: Vec<u8>,
    /// 65-byte ECDSA signature (R || S || v) over `vote_id`.
    #[serde(with = "crate::hexbytes::fixed")]
    pub signature: [u8; 65],
    pub census_proof: CensusProof,
}

/// Lifecycle state of a ballot once it has entered the queue
/// (`spec.md` §1, §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallotState {
    Pending,
    Reserved,
    Verified,
    Aggregated,
    Processed,
    Settled,
    Error,
}

impl BallotState {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            BallotState::Pending => "pending",
            BallotState::Reserved => "pending",
            BallotState::Verified => "verified",
            BallotState::Aggregated => "aggregated",
            BallotState::Processed => "processed",
            BallotState::Settled => "settled",
            BallotState::Error => "error",
        }
    }
}

/// The BallotQueue's internal record. Built once by Ingress and never
/// mutated by it afterwards — BallotQueue exclusively owns every
/// subsequent state transition (`spec.md` §3, "Ownership & lifecycle").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedBallot {
    pub process_id: ProcessId,
    pub voter: VoterAddress,
    pub vote_id: VoteId,
    pub ciphertexts: Vec<Ciphertext>,
    /// Weight returned by `CensusVerifier`, never the client's declared one.
    pub authoritative_weight: u64,
    pub ballot_inputs_hash: FieldElement,
    /// Recursion-friendly transformed proof produced by `ProofAdapter`.
    #[serde(with = "crate::hexbytes::vec")]
    pub transformed_proof: Vec<u8>,
    /// Public key recovered from the voter's signature.
    #[serde(with = "crate::hexbytes::fixed")]
    pub recovered_pubkey: [u8; 33],
    /// Logical ingress timestamp used for FIFO ordering. A real deployment
    /// stamps this with wall-clock millis; tests use a monotonic counter.
    pub ingress_timestamp: u64,
    pub state: BallotState,
    /// Set once a downstream verification attempt has run and reports this
    /// ballot cannot be repaired in place; the voter must resubmit with a
    /// fresh vote_id (`spec.md` §7, "User-visible failure").
    pub error_reason: Option<String>,
    /// The worker's verified artifact, set by `BallotQueue::complete`
    /// (`spec.md` §4.6, `Complete(leaseToken, verified_artifact)`). `None`
    /// until a worker actually completes the job — distinct from
    /// `transformed_proof`, which `Ingress` computes at admission time.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "crate::hexbytes::option_vec")]
    pub verified_artifact: Option<Vec<u8>>,
}

/// A worker's exclusive, time-bounded claim on one ballot (`spec.md` §3, §4.7).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub vote_id: VoteId,
    pub worker: WorkerId,
    pub acquired_at: u64,
    pub deadline: u64,
}

/// Opaque, single-use capability returned by `BallotQueue::reserve` and
/// consumed by exactly one of `complete`/`release` (`spec.md` §4.6,
/// invariant 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseToken(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_str_folds_reserved_into_pending() {
        assert_eq!(BallotState::Pending.as_wire_str(), "pending");
        assert_eq!(BallotState::Reserved.as_wire_str(), "pending");
        assert_eq!(BallotState::Verified.as_wire_str(), "verified");
    }
}
