//! `CoreError` — the sum type every core operation resolves to on failure
//! (`spec.md` §7). Every variant carries enough detail to render the wire
//! taxonomy of `spec.md` §6 without the HTTP layer re-deriving anything.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotFoundKind {
    /// Generic "resource not found" (e.g. unknown vote_id on a status query).
    Resource,
    Process,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedKind {
    Body,
    ProcessId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    AlreadyQueued,
    AddressBusy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    NotAcceptingVotes,
    MaxVotersReached,
    WorkerBanned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CryptoFailureKind {
    BadSignature,
    BadProof,
    HashMismatch,
    CensusMiss,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found")]
    NotFound(NotFoundKind),

    #[error("malformed input: {1}")]
    MalformedInput(MalformedKind, String),

    #[error("worker uuid did not match the configured one")]
    UnauthenticatedRequester,

    #[error("conflict")]
    Conflict(ConflictKind),

    #[error("rejected by policy")]
    RejectedByPolicy(PolicyKind),

    #[error("cryptographic failure")]
    CryptographicFailure(CryptoFailureKind),

    /// I/O, lock poisoning, singleton-init, or any other failure that is
    /// not the submitter's fault. Logged with full context server-side;
    /// surfaced generically (`spec.md` §7).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable numeric wire identifier (`spec.md` §6). A handful of
    /// conditions spec.md's table leaves as reserved gaps (e.g. "max
    /// voters reached" has no listed code); those are assigned the
    /// nearest unused gap and noted in `DESIGN.md`.
    pub fn code(&self) -> u32 {
        match self {
            CoreError::NotFound(NotFoundKind::Resource) => 40001,
            CoreError::NotFound(NotFoundKind::Process) => 40007,
            CoreError::MalformedInput(MalformedKind::Body, _) => 40004,
            CoreError::MalformedInput(MalformedKind::ProcessId, _) => 40006,
            CoreError::CryptographicFailure(CryptoFailureKind::BadSignature) => 40005,
            CoreError::CryptographicFailure(CryptoFailureKind::CensusMiss) => 40008,
            CoreError::CryptographicFailure(CryptoFailureKind::BadProof) => 40009,
            CoreError::CryptographicFailure(CryptoFailureKind::HashMismatch) => 40013,
            CoreError::UnauthenticatedRequester => 40014,
            CoreError::Conflict(ConflictKind::AlreadyQueued) => 40018,
            CoreError::Conflict(ConflictKind::AddressBusy) => 40019,
            CoreError::RejectedByPolicy(PolicyKind::NotAcceptingVotes) => 40020,
            CoreError::RejectedByPolicy(PolicyKind::MaxVotersReached) => 40021,
            CoreError::RejectedByPolicy(PolicyKind::WorkerBanned) => 40022,
            CoreError::Internal(_) => 50002,
        }
    }

    /// HTTP status the wire layer should render alongside `code()`.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::NotFound(_) => 404,
            CoreError::UnauthenticatedRequester => 403,
            CoreError::Conflict(ConflictKind::AddressBusy) => 409,
            CoreError::Conflict(ConflictKind::AlreadyQueued) => 400,
            CoreError::Internal(_) => 500,
            _ => 400,
        }
    }

    pub fn not_found() -> Self {
        CoreError::NotFound(NotFoundKind::Resource)
    }

    pub fn process_not_found() -> Self {
        CoreError::NotFound(NotFoundKind::Process)
    }

    pub fn malformed_body(reason: impl Into<String>) -> Self {
        CoreError::MalformedInput(MalformedKind::Body, reason.into())
    }

    pub fn malformed_process_id(reason: impl Into<String>) -> Self {
        CoreError::MalformedInput(MalformedKind::ProcessId, reason.into())
    }

    pub fn already_queued() -> Self {
        CoreError::Conflict(ConflictKind::AlreadyQueued)
    }

    pub fn address_busy() -> Self {
        CoreError::Conflict(ConflictKind::AddressBusy)
    }

    pub fn not_accepting_votes() -> Self {
        CoreError::RejectedByPolicy(PolicyKind::NotAcceptingVotes)
    }

    pub fn max_voters_reached() -> Self {
        CoreError::RejectedByPolicy(PolicyKind::MaxVotersReached)
    }

    pub fn worker_banned() -> Self {
        CoreError::RejectedByPolicy(PolicyKind::WorkerBanned)
    }

    pub fn bad_signature() -> Self {
        CoreError::CryptographicFailure(CryptoFailureKind::BadSignature)
    }

    pub fn bad_proof() -> Self {
        CoreError::CryptographicFailure(CryptoFailureKind::BadProof)
    }

    pub fn hash_mismatch() -> Self {
        CoreError::CryptographicFailure(CryptoFailureKind::HashMismatch)
    }

    pub fn census_miss() -> Self {
        CoreError::CryptographicFailure(CryptoFailureKind::CensusMiss)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        CoreError::Internal(reason.into())
    }
}
