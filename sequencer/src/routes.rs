//! HTTP surface (`spec.md` §6). Handlers translate path/query/body into
//! core-crate calls and let `ApiError`'s `IntoResponse` impl render
//! failures; JSON in/out throughout, byte fields hex-encoded by
//! `sequencer_types::hexbytes`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use sequencer_job_manager::AssignError;
use sequencer_types::{Ballot, CoreError, LeaseToken, ProcessId, QueuedBallot, VoteId, VoterAddress, WorkerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{now_millis, AppState};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/votes", post(submit_vote))
        .route("/votes/:process_id/voteId/:vote_id", get(vote_status))
        .route("/votes/:process_id/address/:address", get(vote_by_address))
        .route("/workers/:uuid/job", get(poll_job).post(submit_job))
        .with_state(state)
}

#[derive(Serialize)]
struct SubmitResponse {
    status: &'static str,
}

async fn submit_vote(
    State(state): State<Arc<AppState>>,
    Json(ballot): Json<Ballot>,
) -> Result<Json<SubmitResponse>, ApiError> {
    state.ingress.submit(ballot, now_millis())?;
    Ok(Json(SubmitResponse { status: "accepted" }))
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn vote_status(
    State(state): State<Arc<AppState>>,
    Path((process_id, vote_id)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, ApiError> {
    let process_id = parse_process_id(&process_id)?;
    let vote_id = parse_vote_id(&vote_id)?;
    let status = state
        .ballot_queue
        .status(&process_id, &vote_id)
        .ok_or_else(CoreError::not_found)?;
    Ok(Json(StatusResponse {
        status: status.as_wire_str(),
    }))
}

#[derive(Serialize)]
struct AddressResponse {
    ballot: QueuedBallot,
}

async fn vote_by_address(
    State(state): State<Arc<AppState>>,
    Path((process_id, address)): Path<(String, String)>,
) -> Result<Json<AddressResponse>, ApiError> {
    let process_id = parse_process_id(&process_id)?;
    let address = VoterAddress::from_hex(&address)
        .map_err(|e| CoreError::malformed_body(format!("bad address: {e}")))?;
    let ballot = state
        .ballot_queue
        .get_by_address(&process_id, &address)
        .ok_or_else(CoreError::not_found)?;
    Ok(Json(AddressResponse { ballot }))
}

#[derive(Deserialize)]
struct JobQuery {
    name: String,
    #[allow(dead_code)]
    address: Option<String>,
}

#[derive(Serialize)]
struct JobEnvelope {
    lease: u64,
    ballot: QueuedBallot,
}

async fn poll_job(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<Uuid>,
    Query(query): Query<JobQuery>,
) -> Result<axum::response::Response, ApiError> {
    use axum::response::IntoResponse;

    check_worker_uuid(&state, uuid)?;
    let worker = WorkerId(query.name);
    match state.job_manager.assign_job(&worker, now_millis()) {
        Ok((ballot, lease)) => Ok(Json(JobEnvelope { lease: lease.0, ballot }).into_response()),
        Err(AssignError::NoWork) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(AssignError::WorkerUnavailable) => Err(CoreError::worker_banned().into()),
    }
}

#[derive(Deserialize)]
struct JobResult {
    lease: u64,
    /// The worker's verified artifact (`spec.md` §4.7,
    /// `CompleteJob(leaseToken, artifact)`).
    #[serde(with = "sequencer_types::hexbytes::vec")]
    artifact: Vec<u8>,
}

#[derive(Serialize)]
struct JobCompletedResponse {
    status: &'static str,
}

async fn submit_job(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<Uuid>,
    Json(result): Json<JobResult>,
) -> Result<Json<JobCompletedResponse>, ApiError> {
    check_worker_uuid(&state, uuid)?;
    state
        .job_manager
        .complete_job(LeaseToken(result.lease), result.artifact)
        .map_err(|_| CoreError::not_found())?;
    Ok(Json(JobCompletedResponse { status: "completed" }))
}

/// `spec.md` §6, "Worker authentication": a mismatched or (when no seed is
/// configured) entirely absent worker UUID is `UnauthenticatedRequester`.
fn check_worker_uuid(state: &AppState, presented: Uuid) -> Result<(), CoreError> {
    match state.worker_uuid {
        Some(expected) if expected == presented => Ok(()),
        _ => Err(CoreError::UnauthenticatedRequester),
    }
}

fn parse_process_id(raw: &str) -> Result<ProcessId, CoreError> {
    ProcessId::from_hex(raw).map_err(|e| CoreError::malformed_process_id(e.to_string()))
}

fn parse_vote_id(raw: &str) -> Result<VoteId, CoreError> {
    VoteId::from_hex(raw).map_err(|e| CoreError::malformed_body(format!("bad vote_id: {e}")))
}
