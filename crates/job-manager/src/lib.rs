//! `JobManager` — bridges `BallotQueue` and remote workers: assignment,
//! leases with deadlines, completion, and a periodic timeout sweep
//! (`spec.md` §4.7).
//!
//! Assignment/completion/timeout-sweep for a given worker are serialised
//! by a single lock covering `(reservations, lease status)`, the ordering
//! guarantee `spec.md` §4.7 requires: a worker whose lease has already
//! timed out and been swept must see `NotFound` from a late `CompleteJob`,
//! never a stale success.

use parking_lot::Mutex;
use sequencer_ballot_queue::BallotQueue;
use sequencer_types::{LeaseToken, QueuedBallot, WorkerId};
use sequencer_worker_registry::WorkerRegistry;
use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    #[error("no pending work is available")]
    NoWork,
    #[error("worker is banned or already holds an active lease")]
    WorkerUnavailable,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("lease token is unknown, expired, or already resolved")]
pub struct CompleteError;

/// One job dispatched to the failure channel when its lease expires
/// unclaimed (`spec.md` §4.7, step 4).
#[derive(Clone, Debug)]
pub struct FailedJob {
    pub worker: WorkerId,
    pub vote_id: sequencer_types::VoteId,
}

struct ActiveReservation {
    worker: WorkerId,
    deadline: u64,
}

pub struct JobManagerConfig {
    pub job_timeout_millis: u64,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            job_timeout_millis: 30_000,
        }
    }
}

pub struct JobManager {
    queue: std::sync::Arc<BallotQueue>,
    registry: std::sync::Arc<WorkerRegistry>,
    config: JobManagerConfig,
    /// Keyed by lease token; also indexed by worker to enforce "at most
    /// one active reservation per worker".
    reservations: Mutex<HashMap<LeaseToken, ActiveReservation>>,
    worker_lease: Mutex<HashMap<WorkerId, LeaseToken>>,
    failure_tx: SyncSender<FailedJob>,
}

impl JobManager {
    /// Builds the manager and returns the receiving end of its unbuffered
    /// failure channel. Per `spec.md` §5, this channel has zero buffer —
    /// if nothing is attached to drain it, the sweep loop blocks and
    /// timeouts accumulate, so operational code must keep a consumer
    /// attached at all times.
    pub fn new(
        queue: std::sync::Arc<BallotQueue>,
        registry: std::sync::Arc<WorkerRegistry>,
        config: JobManagerConfig,
    ) -> (Self, Receiver<FailedJob>) {
        let (tx, rx) = sync_channel(0);
        (
            Self {
                queue,
                registry,
                config,
                reservations: Mutex::new(HashMap::new()),
                worker_lease: Mutex::new(HashMap::new()),
                failure_tx: tx,
            },
            rx,
        )
    }

    pub fn is_worker_available(&self, worker: &WorkerId, now: u64) -> bool {
        if self.registry.is_banned(worker, now) {
            return false;
        }
        !self.worker_lease.lock().contains_key(worker)
    }

    /// Consults `WorkerRegistry`; if available, reserves a ballot and
    /// records a deadline-bearing reservation (`spec.md` §4.7).
    pub fn assign_job(
        &self,
        worker: &WorkerId,
        now: u64,
    ) -> Result<(QueuedBallot, LeaseToken), AssignError> {
        if !self.is_worker_available(worker, now) {
            return Err(AssignError::WorkerUnavailable);
        }

        let (ballot, lease) = self.queue.reserve().ok_or(AssignError::NoWork)?;

        let mut reservations = self.reservations.lock();
        let mut worker_lease = self.worker_lease.lock();
        // Re-check under lock: another thread may have raced us between
        // `is_worker_available` and acquiring the reservation.
        if worker_lease.contains_key(worker) {
            drop(reservations);
            drop(worker_lease);
            self.queue
                .release(lease)
                .expect("freshly-issued lease cannot already be resolved");
            return Err(AssignError::WorkerUnavailable);
        }

        reservations.insert(
            lease,
            ActiveReservation {
                worker: worker.clone(),
                deadline: now + self.config.job_timeout_millis,
            },
        );
        worker_lease.insert(worker.clone(), lease);
        info!(%worker, vote_id = %ballot.vote_id, lease = lease.0, "assigned job");
        Ok((ballot, lease))
    }

    /// On success: completes the ballot with the worker's verified
    /// `artifact` (`spec.md` §4.7, `CompleteJob(leaseToken, artifact)`),
    /// records a success with `WorkerRegistry`, and drops the reservation.
    /// An unknown token (already expired or released by the sweeper) is
    /// rejected with `CompleteError` — the worker's submission is simply
    /// too late.
    pub fn complete_job(&self, lease: LeaseToken, artifact: Vec<u8>) -> Result<QueuedBallot, CompleteError> {
        let mut reservations = self.reservations.lock();
        let mut worker_lease = self.worker_lease.lock();

        let reservation = reservations.remove(&lease).ok_or(CompleteError)?;
        worker_lease.remove(&reservation.worker);
        drop(reservations);
        drop(worker_lease);

        let completed = self.queue.complete(lease, artifact).map_err(|_| CompleteError)?;
        self.registry.record(&reservation.worker, true);
        info!(worker = %reservation.worker, vote_id = %completed.vote_id, "job completed");
        Ok(completed)
    }

    /// Periodic tick: releases every reservation whose deadline has
    /// passed, debits the worker, and publishes the failure on the
    /// unbuffered channel. Blocks if no consumer is attached, by design.
    pub fn sweep(&self, now: u64) {
        let expired: Vec<(LeaseToken, ActiveReservation)> = {
            let mut reservations = self.reservations.lock();
            let mut worker_lease = self.worker_lease.lock();
            let expired_tokens: Vec<LeaseToken> = reservations
                .iter()
                .filter(|(_, r)| r.deadline < now)
                .map(|(token, _)| *token)
                .collect();

            expired_tokens
                .into_iter()
                .map(|token| {
                    let reservation = reservations.remove(&token).expect("token came from this map");
                    worker_lease.remove(&reservation.worker);
                    (token, reservation)
                })
                .collect()
        };

        for (token, reservation) in expired {
            let vote_id = match self.queue.force_release(token) {
                Some(vote_id) => vote_id,
                None => {
                    warn!(worker = %reservation.worker, "timeout sweep found a lease the queue no longer knows about");
                    continue;
                }
            };
            self.registry.record(&reservation.worker, false);
            let job = FailedJob {
                worker: reservation.worker,
                vote_id,
            };
            if self.failure_tx.send(job).is_err() {
                warn!("failure channel receiver dropped; timed-out jobs can no longer be observed");
            }
        }
    }
}
