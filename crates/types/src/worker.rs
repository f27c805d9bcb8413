//! Per-worker accounting owned jointly by `JobManager` and `WorkerRegistry`
//! (`spec.md` §3, §4.8).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub consecutive_failures: u32,
    /// Zero means "not time-banned"; a worker may still be banned purely
    /// by failure count even with this at zero (`spec.md` §4.8).
    pub banned_until: u64,
}

impl WorkerStats {
    /// A worker is banned once its failure streak *reaches* the
    /// configured maximum (not strictly past it) — `spec.md` §8's ban-cycle
    /// scenario bans a worker after exactly `max_consecutive_failures`
    /// timeouts, so the next `AssignJob` attempt is the one that is
    /// rejected, not the one after that.
    pub fn is_banned(&self, max_consecutive_failures: u32, now: u64) -> bool {
        self.consecutive_failures >= max_consecutive_failures || now < self.banned_until
    }
}
