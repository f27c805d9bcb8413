//! `CensusProof` — tagged union keyed by `CensusOrigin` (`spec.md` §3, §9).

use crate::ids::{ProcessId, VoterAddress};
use crate::process::CensusOrigin;
use serde::{Deserialize, Serialize};

/// Evidence of voter membership and weight. The wire format carries an
/// integer discriminator (`origin`); dispatch on it is explicit, never
/// polymorphic, matching `spec.md` §9's "tagged variant over inheritance"
/// note.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum CensusProof {
    MerkleTree {
        #[serde(with = "crate::hexbytes::fixed")]
        root: [u8; 32],
        voter: VoterAddress,
        /// Sibling hashes from leaf to root.
        #[serde(with = "crate::hexbytes::fixed_vec")]
        siblings: Vec<[u8; 32]>,
        /// Leaf index, needed to know left/right orientation at each level.
        leaf_index: u64,
        /// Weight bytes stored at the leaf.
        #[serde(with = "crate::hexbytes::fixed")]
        value: [u8; 32],
        /// Client-declared weight. Never trusted (`spec.md` §4.3):
        /// `CensusVerifier` ignores this and returns the tree's weight.
        #[serde(with = "crate::hexbytes::decimal")]
        declared_weight: u64,
    },
    CredentialSigned {
        #[serde(with = "crate::hexbytes::fixed")]
        root: [u8; 32],
        voter: VoterAddress,
        process_id: ProcessId,
        /// CSP (credential service provider) public key.
        #[serde(with = "crate::hexbytes::fixed")]
        csp_public_key: [u8; 33],
        /// CSP signature over `(root, processID, voter, weight)`.
        #[serde(with = "crate::hexbytes::fixed")]
        csp_signature: [u8; 65],
        #[serde(with = "crate::hexbytes::decimal")]
        declared_weight: u64,
    },
}

impl CensusProof {
    pub fn origin(&self) -> CensusOrigin {
        match self {
            CensusProof::MerkleTree { .. } => CensusOrigin::MerkleTree,
            CensusProof::CredentialSigned { .. } => CensusOrigin::CredentialSigned,
        }
    }

    pub fn voter(&self) -> VoterAddress {
        match self {
            CensusProof::MerkleTree { voter, .. } => *voter,
            CensusProof::CredentialSigned { voter, .. } => *voter,
        }
    }

    pub fn root(&self) -> [u8; 32] {
        match self {
            CensusProof::MerkleTree { root, .. } => *root,
            CensusProof::CredentialSigned { root, .. } => *root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_matches_variant() {
        let proof = CensusProof::MerkleTree {
            root: [0u8; 32],
            voter: VoterAddress([1u8; 20]),
            siblings: vec![],
            leaf_index: 0,
            value: [0u8; 32],
            declared_weight: 0,
        };
        assert_eq!(proof.origin(), CensusOrigin::MerkleTree);
    }
}
