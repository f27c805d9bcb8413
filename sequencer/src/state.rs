//! Shared application state handed to every `axum` handler, built once at
//! startup in `main.rs` and cloned cheaply (an `Arc` of its fields) per
//! request — the same `Arc<ApiState>`-over-`with_state` shape the teacher's
//! `rpc::create_router` uses.

use sequencer_ballot_queue::BallotQueue;
use sequencer_ingress::Ingress;
use sequencer_job_manager::JobManager;
use sequencer_process_store::InMemoryProcessStore;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub struct AppState {
    pub ingress: Ingress<InMemoryProcessStore>,
    pub ballot_queue: Arc<BallotQueue>,
    pub job_manager: Arc<JobManager>,
    /// `None` disables the `/workers/*` endpoints entirely (`spec.md` §6,
    /// "worker seed (optional; enables worker endpoints)").
    pub worker_uuid: Option<Uuid>,
}

/// Wall-clock milliseconds, the logical clock `Ingress`/`JobManager`/
/// `WorkerRegistry` take as an explicit `now` parameter so the core stays
/// executor-agnostic (`spec.md` §5).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}

/// A process-wide seed is hashed into a deterministic UUID; workers embed
/// that UUID in the URL they poll (`spec.md` §6, "Worker authentication").
pub fn worker_uuid_from_seed(seed: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes())
}
