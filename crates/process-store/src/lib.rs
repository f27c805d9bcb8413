//! `ProcessStore` — the read-only lookup `Ingress` consults for process
//! metadata, acceptance state, and voter-history checks (`spec.md` §4.5).
//!
//! Processes are created and invalidated outside the core (`spec.md` §3);
//! this crate only ever discovers and reads them. The in-memory
//! implementation below is a reference/fixture backing — the shape
//! (a pool-like handle with typed, read-only query methods) follows the
//! teacher's `indexer::database::Database`, minus any commitment to a
//! concrete SQL backend, since the real process registry is an external
//! collaborator the core does not own.

use parking_lot::RwLock;
use sequencer_types::{CoreError, Process, ProcessId, VoterAddress};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessStoreError {
    #[error("process {0:?} not found")]
    NotFound(ProcessId),
}

impl From<ProcessStoreError> for CoreError {
    fn from(err: ProcessStoreError) -> Self {
        match err {
            ProcessStoreError::NotFound(_) => CoreError::process_not_found(),
        }
    }
}

/// Read interface `Ingress` relies on (`spec.md` §4.5). Kept as a trait so
/// `sequencer-ingress` can be exercised against the in-memory fixture in
/// tests and against a real-world-backed implementation in production.
pub trait ProcessStore: Send + Sync {
    fn get(&self, process_id: &ProcessId) -> Result<Process, ProcessStoreError>;

    /// False if the process does not exist, is finished, paused, or not
    /// served by this sequencer.
    fn is_accepting_votes(&self, process_id: &ProcessId) -> bool;

    /// Classifies a submission as overwrite (`true`) or new (`false`).
    fn has_address_voted(
        &self,
        process_id: &ProcessId,
        state_root: &[u8; 32],
        voter: &VoterAddress,
    ) -> bool;

    fn max_voters_reached(&self, process_id: &ProcessId) -> bool;
}

/// In-memory reference implementation, suitable for tests and local runs.
#[derive(Default)]
pub struct InMemoryProcessStore {
    processes: RwLock<HashMap<ProcessId, Process>>,
    /// Voters known to have voted, scoped by the state root their vote was
    /// recorded under — a voter who voted under a stale root is treated
    /// as "new" again once the process's state root has advanced.
    voted: RwLock<HashMap<(ProcessId, [u8; 32]), HashSet<VoterAddress>>>,
}

impl InMemoryProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, process: Process) {
        debug!(process_id = ?process.id, "registering process in store");
        self.processes.write().insert(process.id, process);
    }

    /// Test/fixture hook: record that `voter` has already voted against
    /// `process_id` at `state_root`.
    pub fn record_vote(&self, process_id: ProcessId, state_root: [u8; 32], voter: VoterAddress) {
        self.voted
            .write()
            .entry((process_id, state_root))
            .or_default()
            .insert(voter);
    }

    pub fn set_accepting_votes(&self, process_id: &ProcessId, accepting: bool) {
        if let Some(process) = self.processes.write().get_mut(process_id) {
            process.accepting_votes = accepting;
        }
    }
}

impl ProcessStore for InMemoryProcessStore {
    fn get(&self, process_id: &ProcessId) -> Result<Process, ProcessStoreError> {
        self.processes
            .read()
            .get(process_id)
            .cloned()
            .ok_or(ProcessStoreError::NotFound(*process_id))
    }

    fn is_accepting_votes(&self, process_id: &ProcessId) -> bool {
        self.processes
            .read()
            .get(process_id)
            .map(|p| p.accepting_votes)
            .unwrap_or(false)
    }

    fn has_address_voted(
        &self,
        process_id: &ProcessId,
        state_root: &[u8; 32],
        voter: &VoterAddress,
    ) -> bool {
        self.voted
            .read()
            .get(&(*process_id, *state_root))
            .map(|set| set.contains(voter))
            .unwrap_or(false)
    }

    fn max_voters_reached(&self, process_id: &ProcessId) -> bool {
        self.processes
            .read()
            .get(process_id)
            .map(|p| p.vote_count >= p.census.max_voters)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::{BallotMode, CensusConfig, CensusOrigin};

    fn sample(id: ProcessId, max_voters: u64, vote_count: u64, accepting: bool) -> Process {
        Process {
            id,
            chain_id: "vocdoni-1".into(),
            encryption_public_key: [0u8; 32],
            census: CensusConfig {
                origin: CensusOrigin::MerkleTree,
                root: [1u8; 32],
                uri: "ipfs://census".into(),
                max_voters,
            },
            ballot_mode: BallotMode {
                num_fields: 2,
                min_value: 0,
                max_value: 1,
                cost_exponent: 2,
                unique_values: false,
                cost_from_weight: false,
                min_value_sum: 0,
                max_value_sum: 2,
            },
            current_state_root: [2u8; 32],
            vote_count,
            accepting_votes: accepting,
        }
    }

    #[test]
    fn unknown_process_is_not_found() {
        let store = InMemoryProcessStore::new();
        assert!(matches!(
            store.get(&ProcessId([9u8; 32])),
            Err(ProcessStoreError::NotFound(_))
        ));
    }

    #[test]
    fn not_accepting_votes_when_absent_or_flagged() {
        let store = InMemoryProcessStore::new();
        let id = ProcessId([1u8; 32]);
        assert!(!store.is_accepting_votes(&id));

        store.insert(sample(id, 100, 0, false));
        assert!(!store.is_accepting_votes(&id));

        store.set_accepting_votes(&id, true);
        assert!(store.is_accepting_votes(&id));
    }

    #[test]
    fn has_address_voted_is_scoped_by_state_root() {
        let store = InMemoryProcessStore::new();
        let id = ProcessId([1u8; 32]);
        let voter = VoterAddress([5u8; 20]);
        let root_a = [0xAu8; 32];
        let root_b = [0xBu8; 32];

        store.record_vote(id, root_a, voter);
        assert!(store.has_address_voted(&id, &root_a, &voter));
        assert!(!store.has_address_voted(&id, &root_b, &voter));
    }

    #[test]
    fn max_voters_reached_compares_vote_count() {
        let store = InMemoryProcessStore::new();
        let id = ProcessId([1u8; 32]);
        store.insert(sample(id, 10, 10, true));
        assert!(store.max_voters_reached(&id));

        let id2 = ProcessId([2u8; 32]);
        store.insert(sample(id2, 10, 9, true));
        assert!(!store.max_voters_reached(&id2));
    }
}
