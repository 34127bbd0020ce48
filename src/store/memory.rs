use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::model::{
    common::{election::ElectionStatus, session::SessionStatus},
    db::{
        ballot::Ballot, candidate::Candidate, election::Election, session::VotingSession,
        vote::Vote, voter::Voter,
    },
    mongodb::{Id, BALLOT_INDEX, CANDIDATE_INDEX, VOTER_NUMBER_INDEX, VOTE_INDEX},
};

use super::{Store, StoreError, StoreResult};

/// All tables, behind a single lock so that every check-then-insert is atomic.
/// Rows are kept in insertion order.
#[derive(Default)]
struct Tables {
    voters: Vec<Voter>,
    elections: Vec<Election>,
    candidates: Vec<Candidate>,
    ballots: Vec<Ballot>,
    votes: Vec<Vote>,
    sessions: Vec<VotingSession>,
}

/// An in-process store with the same unique constraints as the MongoDB
/// indexes. Thread-safe for use with Tokio's multi-threaded runtime.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-applied write,
        // since every write is a single push or field assignment.
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables
            .voters
            .iter()
            .any(|v| v.voter_number == voter.voter_number)
        {
            return Err(StoreError::UniqueViolation(VOTER_NUMBER_INDEX));
        }
        tables.voters.push(voter.clone());
        Ok(())
    }

    async fn voter(&self, id: Id) -> StoreResult<Option<Voter>> {
        Ok(self.tables().voters.iter().find(|v| v.id == id).cloned())
    }

    async fn count_eligible_voters(&self) -> StoreResult<u64> {
        Ok(self.tables().voters.iter().filter(|v| v.can_vote).count() as u64)
    }

    async fn insert_election(&self, election: &Election) -> StoreResult<()> {
        self.tables().elections.push(election.clone());
        Ok(())
    }

    async fn election(&self, id: Id) -> StoreResult<Option<Election>> {
        Ok(self.tables().elections.iter().find(|e| e.id == id).cloned())
    }

    async fn elections(&self) -> StoreResult<Vec<Election>> {
        Ok(self.tables().elections.clone())
    }

    async fn transition_status(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables
            .elections
            .iter_mut()
            .find(|e| e.id == id && e.status == from)
        {
            Some(election) => {
                election.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.candidates.iter().any(|c| {
            c.election_id == candidate.election_id
                && c.name == candidate.name
                && c.party == candidate.party
        }) {
            return Err(StoreError::UniqueViolation(CANDIDATE_INDEX));
        }
        tables.candidates.push(candidate.clone());
        Ok(())
    }

    async fn candidate(&self, id: Id) -> StoreResult<Option<Candidate>> {
        Ok(self.tables().candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidates_for(&self, election_id: Id) -> StoreResult<Vec<Candidate>> {
        Ok(self
            .tables()
            .candidates
            .iter()
            .filter(|c| c.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables
            .ballots
            .iter()
            .any(|b| b.election_id == ballot.election_id)
        {
            return Err(StoreError::UniqueViolation(BALLOT_INDEX));
        }
        tables.ballots.push(ballot.clone());
        Ok(())
    }

    async fn ballot_for(&self, election_id: Id) -> StoreResult<Option<Ballot>> {
        Ok(self
            .tables()
            .ballots
            .iter()
            .find(|b| b.election_id == election_id)
            .cloned())
    }

    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables
            .votes
            .iter()
            .any(|v| v.voter_id == vote.voter_id && v.election_id == vote.election_id)
        {
            return Err(StoreError::UniqueViolation(VOTE_INDEX));
        }
        tables.votes.push(vote.clone());
        Ok(())
    }

    async fn vote(&self, id: Id) -> StoreResult<Option<Vote>> {
        Ok(self.tables().votes.iter().find(|v| v.id == id).cloned())
    }

    async fn vote_for(&self, voter_id: Id, election_id: Id) -> StoreResult<Option<Vote>> {
        Ok(self
            .tables()
            .votes
            .iter()
            .find(|v| v.voter_id == voter_id && v.election_id == election_id)
            .cloned())
    }

    async fn votes_by_voter(&self, voter_id: Id) -> StoreResult<Vec<Vote>> {
        let mut votes = self
            .tables()
            .votes
            .iter()
            .filter(|v| v.voter_id == voter_id)
            .cloned()
            .collect::<Vec<_>>();
        votes.sort_by(|a, b| b.cast_at.cmp(&a.cast_at));
        Ok(votes)
    }

    async fn votes_in_election(&self, election_id: Id) -> StoreResult<Vec<Vote>> {
        let mut votes = self
            .tables()
            .votes
            .iter()
            .filter(|v| v.election_id == election_id)
            .cloned()
            .collect::<Vec<_>>();
        votes.sort_by_key(|v| v.cast_at);
        Ok(votes)
    }

    async fn count_votes(&self, election_id: Id) -> StoreResult<u64> {
        Ok(self
            .tables()
            .votes
            .iter()
            .filter(|v| v.election_id == election_id)
            .count() as u64)
    }

    async fn count_all_votes(&self) -> StoreResult<u64> {
        Ok(self.tables().votes.len() as u64)
    }

    async fn tally(
        &self,
        election_id: Id,
        cast_until: DateTime<Utc>,
    ) -> StoreResult<HashMap<Id, u64>> {
        let mut counts = HashMap::new();
        for vote in self
            .tables()
            .votes
            .iter()
            .filter(|v| v.election_id == election_id && v.cast_at <= cast_until)
        {
            *counts.entry(vote.candidate_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn mark_verified(&self, vote_id: Id) -> StoreResult<()> {
        if let Some(vote) = self.tables().votes.iter_mut().find(|v| v.id == vote_id) {
            vote.verified = true;
        }
        Ok(())
    }

    async fn insert_session(&self, session: &VotingSession) -> StoreResult<()> {
        self.tables().sessions.push(session.clone());
        Ok(())
    }

    async fn session(&self, id: Id) -> StoreResult<Option<VotingSession>> {
        Ok(self.tables().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn update_session(
        &self,
        id: Id,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables();
        match tables
            .sessions
            .iter_mut()
            .find(|s| s.id == id && !s.status.is_terminal())
        {
            Some(session) => {
                session.status = status;
                if completed_at.is_some() {
                    session.completed_at = completed_at;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_active_sessions(&self) -> StoreResult<u64> {
        Ok(self
            .tables()
            .sessions
            .iter()
            .filter(|s| s.status.is_active())
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn vote(voter_id: Id, election_id: Id, candidate_id: Id, cast_at: DateTime<Utc>) -> Vote {
        Vote {
            id: Id::new(),
            voter_id,
            election_id,
            candidate_id,
            encrypted_payload: String::new(),
            cast_at,
            verified: false,
        }
    }

    #[rocket::async_test]
    async fn second_vote_for_same_pair_is_rejected() {
        let store = MemoryStore::new();
        let (voter, election) = (Id::new(), Id::new());
        let now = Utc::now();

        store
            .insert_vote(&vote(voter, election, Id::new(), now))
            .await
            .unwrap();
        let result = store.insert_vote(&vote(voter, election, Id::new(), now)).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(VOTE_INDEX))));

        // The same voter may vote in a different election.
        store
            .insert_vote(&vote(voter, Id::new(), Id::new(), now))
            .await
            .unwrap();
        assert_eq!(store.count_all_votes().await.unwrap(), 2);
    }

    #[rocket::async_test]
    async fn tally_respects_cutoff() {
        let store = MemoryStore::new();
        let (election, a, b) = (Id::new(), Id::new(), Id::new());
        let end = Utc::now();

        store.insert_vote(&vote(Id::new(), election, a, end)).await.unwrap();
        store
            .insert_vote(&vote(Id::new(), election, a, end - Duration::minutes(5)))
            .await
            .unwrap();
        store
            .insert_vote(&vote(Id::new(), election, b, end + Duration::seconds(1)))
            .await
            .unwrap();

        let counts = store.tally(election, end).await.unwrap();
        assert_eq!(counts.get(&a), Some(&2));
        assert_eq!(counts.get(&b), None);
        assert_eq!(store.count_votes(election).await.unwrap(), 3);
    }

    #[rocket::async_test]
    async fn status_transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let election = Election::upcoming_example(Utc::now());
        store.insert_election(&election).await.unwrap();

        let moved = store
            .transition_status(election.id, ElectionStatus::Ongoing, ElectionStatus::Completed)
            .await
            .unwrap();
        assert!(!moved);
        let moved = store
            .transition_status(election.id, ElectionStatus::Upcoming, ElectionStatus::Ongoing)
            .await
            .unwrap();
        assert!(moved);
        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Ongoing);
        assert_eq!(stored.title, election.title);
    }

    #[rocket::async_test]
    async fn terminal_sessions_are_frozen() {
        let store = MemoryStore::new();
        let session = VotingSession::new(Id::new(), Id::new(), None, String::new(), Utc::now());
        store.insert_session(&session).await.unwrap();
        assert_eq!(store.count_active_sessions().await.unwrap(), 1);

        assert!(store
            .update_session(session.id, SessionStatus::Abandoned, None)
            .await
            .unwrap());
        assert!(!store
            .update_session(session.id, SessionStatus::Completed, Some(Utc::now()))
            .await
            .unwrap());
        let stored = store.session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert_eq!(store.count_active_sessions().await.unwrap(), 0);
    }
}
