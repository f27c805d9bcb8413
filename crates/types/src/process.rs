//! `Process` — read-only metadata resolved by `ProcessStore` (`spec.md` §3, §4.5).

use crate::ids::ProcessId;
use serde::{Deserialize, Serialize};

/// Discriminator for `CensusProof`/`CensusConfig`. Dispatched explicitly by
/// tag rather than by trait object, per the "tagged variant over
/// inheritance" design note in `spec.md` §9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CensusOrigin {
    MerkleTree,
    CredentialSigned,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusConfig {
    pub origin: CensusOrigin,
    #[serde(with = "crate::hexbytes::fixed")]
    pub root: [u8; 32],
    pub uri: String,
    #[serde(with = "crate::hexbytes::decimal")]
    pub max_voters: u64,
}

/// `ballot-mode` parameters a ballot's ciphertext/weight bounds must honor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotMode {
    pub num_fields: u8,
    pub min_value: u64,
    pub max_value: u64,
    pub cost_exponent: u32,
    pub unique_values: bool,
    pub cost_from_weight: bool,
    pub min_value_sum: u64,
    pub max_value_sum: u64,
}

/// Read-only process record. Created and invalidated outside the core
/// (`spec.md` §3); the core only ever discovers and reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub chain_id: String,
    /// Encryption public key (curve point) voters encrypt ballots to.
    #[serde(with = "crate::hexbytes::fixed")]
    pub encryption_public_key: [u8; 32],
    pub census: CensusConfig,
    pub ballot_mode: BallotMode,
    #[serde(with = "crate::hexbytes::fixed")]
    pub current_state_root: [u8; 32],
    pub vote_count: u64,
    /// Whether this sequencer currently accepts votes for this process:
    /// false once finished, paused, or not served here.
    pub accepting_votes: bool,
}
