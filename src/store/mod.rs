//! Abstract storage for the voting core.
//!
//! Every backend (MongoDB in production, in-memory for testing and local
//! development) implements [`Store`]. The voting core depends only on the
//! trait. Uniqueness rules are the backend's job, not the caller's: a write
//! that would break one fails with [`StoreError::UniqueViolation`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    common::{election::ElectionStatus, session::SessionStatus},
    db::{
        ballot::Ballot, candidate::Candidate, election::Election, session::VotingSession,
        vote::Vote, voter::Voter,
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The store as held in managed state and shared with background tasks.
pub type SharedStore = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write. Carries the index name.
    #[error("Unique constraint `{0}` violated")]
    UniqueViolation(&'static str),
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error("Malformed document: {0}")]
    Malformed(String),
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    // Voters.
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()>;
    async fn voter(&self, id: Id) -> StoreResult<Option<Voter>>;
    /// Number of voters whose `can_vote` flag is set.
    async fn count_eligible_voters(&self) -> StoreResult<u64>;

    // Elections.
    async fn insert_election(&self, election: &Election) -> StoreResult<()>;
    async fn election(&self, id: Id) -> StoreResult<Option<Election>>;
    async fn elections(&self) -> StoreResult<Vec<Election>>;
    /// Atomically set the status to `to` iff it is currently `from`.
    /// Returns whether the write happened. No other field is touched.
    async fn transition_status(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<bool>;

    // Candidates.
    async fn insert_candidate(&self, candidate: &Candidate) -> StoreResult<()>;
    async fn candidate(&self, id: Id) -> StoreResult<Option<Candidate>>;
    /// All candidates of an election, in creation order.
    async fn candidates_for(&self, election_id: Id) -> StoreResult<Vec<Candidate>>;

    // Ballots.
    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()>;
    async fn ballot_for(&self, election_id: Id) -> StoreResult<Option<Ballot>>;

    // Votes.
    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()>;
    async fn vote(&self, id: Id) -> StoreResult<Option<Vote>>;
    async fn vote_for(&self, voter_id: Id, election_id: Id) -> StoreResult<Option<Vote>>;
    /// A voter's votes, newest first.
    async fn votes_by_voter(&self, voter_id: Id) -> StoreResult<Vec<Vote>>;
    /// An election's votes, oldest first.
    async fn votes_in_election(&self, election_id: Id) -> StoreResult<Vec<Vote>>;
    async fn count_votes(&self, election_id: Id) -> StoreResult<u64>;
    async fn count_all_votes(&self) -> StoreResult<u64>;
    /// Votes per candidate ID, counting only votes cast no later than `cast_until`.
    async fn tally(
        &self,
        election_id: Id,
        cast_until: DateTime<Utc>,
    ) -> StoreResult<HashMap<Id, u64>>;
    /// Set the `verified` flag. This is the only mutation a vote ever sees.
    async fn mark_verified(&self, vote_id: Id) -> StoreResult<()>;

    // Voting sessions.
    async fn insert_session(&self, session: &VotingSession) -> StoreResult<()>;
    async fn session(&self, id: Id) -> StoreResult<Option<VotingSession>>;
    /// Move a session to `status` unless it is already terminal.
    /// Returns whether the write happened.
    async fn update_session(
        &self,
        id: Id,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;
    /// Number of sessions still started or in progress.
    async fn count_active_sessions(&self) -> StoreResult<u64>;
}
