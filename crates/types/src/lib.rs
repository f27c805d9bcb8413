//! Shared data model for the ballot ingestion and worker job pipeline.
//!
//! Every other crate in the workspace depends on this one for the types
//! that cross component boundaries (`spec.md` §3). It intentionally has
//! no behavior of its own beyond small, total helper methods.

pub mod ballot;
pub mod census_proof;
pub mod error;
pub mod field;
pub mod hexbytes;
pub mod ids;
pub mod process;
pub mod worker;

pub use ballot::{Ballot, BallotState, Ciphertext, LeaseToken, QueuedBallot, Reservation};
pub use census_proof::CensusProof;
pub use error::CoreError;
pub use field::FieldElement;
pub use ids::{ProcessId, VoteId, VoterAddress, WorkerId};
pub use process::{BallotMode, CensusConfig, CensusOrigin, Process};
pub use worker::WorkerStats;

pub type CoreResult<T> = std::result::Result<T, CoreError>;
