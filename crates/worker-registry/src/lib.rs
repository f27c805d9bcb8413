//! `WorkerRegistry` — per-worker consecutive-failure accounting and
//! time-bounded bans (`spec.md` §4.8).
//!
//! State lives behind a single `parking_lot::RwLock` over the worker map —
//! the "concurrent-safe map" `spec.md` §5 calls for — with per-worker
//! counters read out as plain values rather than atomics, since every
//! mutation already goes through the map's lock.

use parking_lot::RwLock;
use sequencer_types::{WorkerId, WorkerStats};
use std::collections::HashMap;
use tracing::info;

pub struct WorkerRegistryConfig {
    pub max_consecutive_failures: u32,
    pub ban_timeout_millis: u64,
}

impl Default for WorkerRegistryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            ban_timeout_millis: 60_000,
        }
    }
}

pub struct WorkerRegistry {
    workers: RwLock<HashMap<WorkerId, WorkerStats>>,
    config: WorkerRegistryConfig,
}

impl WorkerRegistry {
    pub fn new(config: WorkerRegistryConfig) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Reset the counter on success; increment it on failure.
    pub fn record(&self, worker: &WorkerId, success: bool) {
        let mut workers = self.workers.write();
        let stats = workers.entry(worker.clone()).or_default();
        if success {
            stats.consecutive_failures = 0;
        } else {
            stats.consecutive_failures += 1;
        }
    }

    /// True iff `consecutive_failures >= max` or `now < banned_until`.
    /// A worker never seen before is not banned.
    pub fn is_banned(&self, worker: &WorkerId, now: u64) -> bool {
        self.workers
            .read()
            .get(worker)
            .map(|stats| stats.is_banned(self.config.max_consecutive_failures, now))
            .unwrap_or(false)
    }

    pub fn stats(&self, worker: &WorkerId) -> WorkerStats {
        self.workers.read().get(worker).copied().unwrap_or_default()
    }

    /// Periodic tick (`spec.md` §4.8): bans any worker newly over the
    /// failure threshold, and un-bans (resetting the counter) any worker
    /// whose ban has expired. Both directions are idempotent — running
    /// this twice in a row at the same `now` changes nothing the second
    /// time.
    pub fn sweep(&self, now: u64) {
        let mut workers = self.workers.write();
        for (worker, stats) in workers.iter_mut() {
            if stats.consecutive_failures >= self.config.max_consecutive_failures
                && stats.banned_until == 0
            {
                stats.banned_until = now + self.config.ban_timeout_millis;
                info!(%worker, banned_until = stats.banned_until, "worker banned");
            } else if stats.banned_until != 0 && now >= stats.banned_until {
                stats.banned_until = 0;
                stats.consecutive_failures = 0;
                info!(%worker, "worker ban lifted");
            }
        }
    }
}
