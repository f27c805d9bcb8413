//! `BallotQueue` — the content-addressed, per-voter-exclusive ballot queue
//! (`spec.md` §4.6, the hardest single component in the pipeline).
//!
//! A single lock covers three indices at once — by-voteID (dedup),
//! by-(processID, voter) (overwrite/address-busy detection), and the FIFO
//! pending order — so that `Push`/`Reserve`/`Release`/`Complete` on any
//! voteID are totally ordered with respect to every other operation on the
//! same voteID, per `spec.md` §5. This mirrors the "one big lock across
//! cross-index invariants" choice `spec.md` §9 calls out explicitly, and
//! the teacher's own preference for `parking_lot::Mutex` over a sharded or
//! lock-free structure when correctness, not throughput, is the priority.

use parking_lot::Mutex;
use sequencer_types::{BallotState, LeaseToken, ProcessId, QueuedBallot, VoteId, VoterAddress};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    #[error("a ballot with this vote id already exists")]
    AlreadyExists,
    #[error("this voter already has an in-flight ballot for this process")]
    AddressBusy,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("the lease token is unknown, expired, or already resolved")]
pub struct LeaseExpired;

struct Entry {
    ballot: QueuedBallot,
    lease: Option<LeaseToken>,
}

struct Inner {
    entries: HashMap<VoteId, Entry>,
    /// FIFO order for Pending entries only: `(ordering_key, vote_id)`,
    /// ties on `ordering_key` broken lexicographically by `VoteId`'s own
    /// `Ord` (`spec.md` §4.6, "tie-breaks & ordering").
    pending_order: BTreeSet<(u64, VoteId)>,
    /// Present iff the (processID, voter) pair currently has an entry in
    /// {Pending, Reserved} — the overwrite/address-busy lock.
    address_inflight: HashMap<(ProcessId, VoterAddress), VoteId>,
    lease_owner: HashMap<LeaseToken, VoteId>,
    next_lease: u64,
    /// Monotonic counter used to stamp requeued (released) entries with a
    /// timestamp fresher than anything already pending, so a poison ballot
    /// cycles to the tail instead of the head (`spec.md` §4.6). Independent
    /// of `QueuedBallot::ingress_timestamp`, which Ingress stamps once and
    /// BallotQueue never rewrites.
    requeue_clock: u64,
}

impl Inner {
    fn fresh_lease(&mut self) -> LeaseToken {
        self.next_lease += 1;
        LeaseToken(self.next_lease)
    }

    fn fresh_requeue_key(&mut self) -> u64 {
        self.requeue_clock += 1;
        self.requeue_clock
    }
}

pub struct BallotQueue {
    inner: Mutex<Inner>,
}

impl Default for BallotQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BallotQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                pending_order: BTreeSet::new(),
                address_inflight: HashMap::new(),
                lease_owner: HashMap::new(),
                next_lease: 0,
                requeue_clock: 0,
            }),
        }
    }

    /// Insert a newly-admitted ballot. Atomic over all three indices
    /// (`spec.md` §4.6, invariants 1–2).
    pub fn push(&self, ballot: QueuedBallot) -> Result<(), PushError> {
        let mut inner = self.inner.lock();

        if inner.entries.contains_key(&ballot.vote_id) {
            return Err(PushError::AlreadyExists);
        }

        let address_key = (ballot.process_id, ballot.voter);
        if inner.address_inflight.contains_key(&address_key) {
            return Err(PushError::AddressBusy);
        }

        let order_key = (ballot.ingress_timestamp, ballot.vote_id.clone());
        inner.address_inflight.insert(address_key, ballot.vote_id.clone());
        inner.pending_order.insert(order_key);
        debug!(vote_id = %ballot.vote_id, "pushed ballot onto queue");
        inner.entries.insert(
            ballot.vote_id.clone(),
            Entry {
                ballot,
                lease: None,
            },
        );
        Ok(())
    }

    /// Atomically select the head of the pending queue, transition it
    /// Pending→Reserved, and return a single-use lease token.
    pub fn reserve(&self) -> Option<(QueuedBallot, LeaseToken)> {
        let mut inner = self.inner.lock();

        let head = inner.pending_order.iter().next().cloned()?;
        inner.pending_order.remove(&head);
        let (_, vote_id) = head;

        let lease = inner.fresh_lease();
        let entry = inner.entries.get_mut(&vote_id)?;
        entry.ballot.state = BallotState::Reserved;
        entry.lease = Some(lease);
        inner.lease_owner.insert(lease, vote_id.clone());

        debug!(vote_id = %vote_id, lease = lease.0, "reserved ballot");
        Some((inner.entries[&vote_id].ballot.clone(), lease))
    }

    /// Reserved→Pending, re-queued at the tail with a fresh ordering key
    /// (`spec.md` §4.6). The lease token is single-use: if it was already
    /// resolved by a racing `complete`, this returns `LeaseExpired`.
    pub fn release(&self, token: LeaseToken) -> Result<(), LeaseExpired> {
        let mut inner = self.inner.lock();

        let vote_id = inner.lease_owner.remove(&token).ok_or(LeaseExpired)?;
        let requeue_key = inner.fresh_requeue_key();

        let entry = match inner.entries.get_mut(&vote_id) {
            Some(entry) => entry,
            None => return Err(LeaseExpired),
        };
        entry.lease = None;
        entry.ballot.state = BallotState::Pending;
        inner.pending_order.insert((requeue_key, vote_id));
        Ok(())
    }

    /// Reserved→Verified, and unlocks the voter's (processID, voter) slot
    /// for future overwrites (`spec.md` §4.6, `Complete(leaseToken,
    /// verified_artifact)`). `artifact` is the worker's own verified output,
    /// stored on the ballot for downstream consumers — distinct from
    /// `QueuedBallot::transformed_proof`, which `Ingress` already computed
    /// at admission time.
    pub fn complete(&self, token: LeaseToken, artifact: Vec<u8>) -> Result<QueuedBallot, LeaseExpired> {
        let mut inner = self.inner.lock();

        let vote_id = inner.lease_owner.remove(&token).ok_or(LeaseExpired)?;
        let entry = match inner.entries.get_mut(&vote_id) {
            Some(entry) => entry,
            None => return Err(LeaseExpired),
        };
        entry.lease = None;
        entry.ballot.state = BallotState::Verified;
        entry.ballot.verified_artifact = Some(artifact);
        let address_key = (entry.ballot.process_id, entry.ballot.voter);
        let completed = entry.ballot.clone();
        inner.address_inflight.remove(&address_key);
        debug!(vote_id = %vote_id, "completed ballot, voter slot unlocked");
        Ok(completed)
    }

    pub fn status(&self, process_id: &ProcessId, vote_id: &VoteId) -> Option<BallotState> {
        let inner = self.inner.lock();
        inner.entries.get(vote_id).and_then(|entry| {
            if &entry.ballot.process_id == process_id {
                Some(entry.ballot.state)
            } else {
                None
            }
        })
    }

    pub fn get(&self, process_id: &ProcessId, vote_id: &VoteId) -> Option<QueuedBallot> {
        let inner = self.inner.lock();
        inner.entries.get(vote_id).and_then(|entry| {
            if &entry.ballot.process_id == process_id {
                Some(entry.ballot.clone())
            } else {
                None
            }
        })
    }

    /// Most recent ballot submitted by `voter` under `process_id`, by
    /// ingress timestamp. `entries` never drops a voteID once admitted, so
    /// an overwritten (processID, voter) pair can have more than one entry;
    /// callers querying "the" ballot for an address want the latest one
    /// (`spec.md` §6, `GET /votes/{processId}/address/{address}`).
    pub fn get_by_address(&self, process_id: &ProcessId, voter: &VoterAddress) -> Option<QueuedBallot> {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|entry| entry.ballot.process_id == *process_id && entry.ballot.voter == *voter)
            .map(|entry| &entry.ballot)
            .max_by_key(|ballot| ballot.ingress_timestamp)
            .cloned()
    }

    /// Release a reservation without going through a valid lease — used
    /// only by the timeout sweeper, which has already decided the lease is
    /// stale and wants the same side effects as a voluntary `release`.
    ///
    /// Returns the ballot's worker-relevant identity for the caller to
    /// pass on to `WorkerRegistry`, or `None` if the token had already
    /// been resolved.
    pub fn force_release(&self, token: LeaseToken) -> Option<VoteId> {
        let mut inner = self.inner.lock();
        let vote_id = inner.lease_owner.remove(&token)?;
        let requeue_key = inner.fresh_requeue_key();
        if let Some(entry) = inner.entries.get_mut(&vote_id) {
            entry.lease = None;
            entry.ballot.state = BallotState::Pending;
            inner.pending_order.insert((requeue_key, vote_id.clone()));
        } else {
            warn!(vote_id = %vote_id, "force_release found a lease with no backing entry");
        }
        Some(vote_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sequencer_types::{Ciphertext, FieldElement, VoterAddress};

    fn ballot(process_id: ProcessId, voter: VoterAddress, vote_id: &[u8], ts: u64) -> QueuedBallot {
        QueuedBallot {
            process_id,
            voter,
            vote_id: VoteId(vote_id.to_vec()),
            ciphertexts: vec![Ciphertext {
                c1: [0u8; 32],
                c2: [0u8; 32],
            }],
            authoritative_weight: 1,
            ballot_inputs_hash: FieldElement::from_u64(0),
            transformed_proof: vec![],
            recovered_pubkey: [0u8; 33],
            ingress_timestamp: ts,
            state: BallotState::Pending,
            error_reason: None,
            verified_artifact: None,
        }
    }

    #[test]
    fn duplicate_vote_id_is_rejected() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        let voter_a = VoterAddress([1u8; 20]);
        let voter_b = VoterAddress([2u8; 20]);

        assert!(q.push(ballot(pid, voter_a, b"v1", 1)).is_ok());
        assert_eq!(
            q.push(ballot(pid, voter_b, b"v1", 2)).unwrap_err(),
            PushError::AlreadyExists
        );
    }

    #[test]
    fn same_voter_in_flight_is_address_busy() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        let voter = VoterAddress([1u8; 20]);

        assert!(q.push(ballot(pid, voter, b"v1", 1)).is_ok());
        assert_eq!(
            q.push(ballot(pid, voter, b"v2", 2)).unwrap_err(),
            PushError::AddressBusy
        );
    }

    #[test]
    fn overwrite_is_allowed_after_completion() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        let voter = VoterAddress([1u8; 20]);

        q.push(ballot(pid, voter, b"v1", 1)).unwrap();
        let (_, lease) = q.reserve().unwrap();
        q.complete(lease, vec![0xaa]).unwrap();

        assert!(q.push(ballot(pid, voter, b"v2", 2)).is_ok());
    }

    #[test]
    fn reserve_is_fifo_with_lexicographic_tiebreak() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);

        q.push(ballot(pid, VoterAddress([1u8; 20]), b"bbb", 5)).unwrap();
        q.push(ballot(pid, VoterAddress([2u8; 20]), b"aaa", 5)).unwrap();
        q.push(ballot(pid, VoterAddress([3u8; 20]), b"ccc", 1)).unwrap();

        let (first, _) = q.reserve().unwrap();
        assert_eq!(first.vote_id, VoteId(b"ccc".to_vec()));
        let (second, _) = q.reserve().unwrap();
        assert_eq!(second.vote_id, VoteId(b"aaa".to_vec()));
        let (third, _) = q.reserve().unwrap();
        assert_eq!(third.vote_id, VoteId(b"bbb".to_vec()));
    }

    #[test]
    fn release_requeues_at_tail_not_head() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);

        q.push(ballot(pid, VoterAddress([1u8; 20]), b"v1", 1)).unwrap();
        q.push(ballot(pid, VoterAddress([2u8; 20]), b"v2", 2)).unwrap();

        let (poison, lease) = q.reserve().unwrap();
        assert_eq!(poison.vote_id, VoteId(b"v1".to_vec()));
        q.release(lease).unwrap();

        let (next, _) = q.reserve().unwrap();
        assert_eq!(next.vote_id, VoteId(b"v2".to_vec()), "v2 should come before the requeued v1");
    }

    #[test]
    fn lease_is_single_use() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        q.push(ballot(pid, VoterAddress([1u8; 20]), b"v1", 1)).unwrap();
        let (_, lease) = q.reserve().unwrap();

        assert!(q.complete(lease, vec![0xaa]).is_ok());
        assert_eq!(q.complete(lease, vec![0xaa]).unwrap_err(), LeaseExpired);
        assert_eq!(q.release(lease).unwrap_err(), LeaseExpired);
    }

    #[test]
    fn status_reports_lifecycle_transitions() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        let vote_id = VoteId(b"v1".to_vec());
        q.push(ballot(pid, VoterAddress([1u8; 20]), b"v1", 1)).unwrap();
        assert_eq!(q.status(&pid, &vote_id), Some(BallotState::Pending));

        let (_, lease) = q.reserve().unwrap();
        assert_eq!(q.status(&pid, &vote_id), Some(BallotState::Reserved));

        q.complete(lease, vec![0xaa]).unwrap();
        assert_eq!(q.status(&pid, &vote_id), Some(BallotState::Verified));
    }

    #[test]
    fn get_by_address_returns_the_latest_submission() {
        let q = BallotQueue::new();
        let pid = ProcessId([1u8; 32]);
        let voter = VoterAddress([1u8; 20]);

        q.push(ballot(pid, voter, b"v1", 1)).unwrap();
        let (_, lease) = q.reserve().unwrap();
        let completed = q.complete(lease, vec![0xaa]).unwrap();
        assert_eq!(completed.verified_artifact, Some(vec![0xaa]));
        q.push(ballot(pid, voter, b"v2", 2)).unwrap();

        let latest = q.get_by_address(&pid, &voter).unwrap();
        assert_eq!(latest.vote_id, VoteId(b"v2".to_vec()));
    }

    #[test]
    fn reserve_on_empty_queue_returns_none() {
        let q = BallotQueue::new();
        assert!(q.reserve().is_none());
    }

    #[test]
    fn concurrent_pushes_never_admit_the_same_vote_id_twice() {
        use std::sync::Arc;
        use std::thread;

        let q = Arc::new(BallotQueue::new());
        let pid = ProcessId([1u8; 32]);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    let voter = VoterAddress([i as u8; 20]);
                    q.push(ballot(pid, voter, b"contended", i as u64))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1);
    }
}
