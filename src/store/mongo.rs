use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc, Bson},
    error::Error as DbError,
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    common::{election::ElectionStatus, session::SessionStatus},
    db::{
        ballot::Ballot, candidate::Candidate, election::Election, session::VotingSession,
        vote::Vote, voter::Voter,
    },
    mongodb::{
        ensure_indexes_exist, is_duplicate_key_error, Coll, Id, BALLOT_INDEX, CANDIDATE_INDEX,
        VOTER_NUMBER_INDEX, VOTE_INDEX,
    },
};

use super::{Store, StoreError, StoreResult};

/// Translate a duplicate key failure on `index` into a constraint violation.
fn on_insert(err: DbError, index: &'static str) -> StoreError {
    if is_duplicate_key_error(&err) {
        StoreError::UniqueViolation(index)
    } else {
        StoreError::Db(err)
    }
}

/// The production store, backed by MongoDB. Uniqueness is enforced by the
/// indexes created in [`ensure_indexes_exist`].
#[derive(Clone)]
pub struct MongoStore {
    voters: Coll<Voter>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    votes: Coll<Vote>,
    sessions: Coll<VotingSession>,
}

impl MongoStore {
    /// Wrap the given database, ensuring the required indexes exist.
    pub async fn connect(db: &Database) -> Result<Self, DbError> {
        ensure_indexes_exist(db).await?;
        Ok(Self {
            voters: Coll::from_db(db),
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            ballots: Coll::from_db(db),
            votes: Coll::from_db(db),
            sessions: Coll::from_db(db),
        })
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_voter(&self, voter: &Voter) -> StoreResult<()> {
        self.voters
            .insert_one(voter, None)
            .await
            .map_err(|e| on_insert(e, VOTER_NUMBER_INDEX))?;
        Ok(())
    }

    async fn voter(&self, id: Id) -> StoreResult<Option<Voter>> {
        Ok(self.voters.find_one(id.as_doc(), None).await?)
    }

    async fn count_eligible_voters(&self) -> StoreResult<u64> {
        Ok(self
            .voters
            .count_documents(doc! { "can_vote": true }, None)
            .await?)
    }

    async fn insert_election(&self, election: &Election) -> StoreResult<()> {
        self.elections.insert_one(election, None).await?;
        Ok(())
    }

    async fn election(&self, id: Id) -> StoreResult<Option<Election>> {
        Ok(self.elections.find_one(id.as_doc(), None).await?)
    }

    async fn elections(&self) -> StoreResult<Vec<Election>> {
        let options = FindOptions::builder()
            .sort(doc! { "start_time": -1 })
            .build();
        Ok(self
            .elections
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn transition_status(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<bool> {
        let filter = doc! {
            "_id": id,
            "status": from,
        };
        let update = doc! {
            "$set": { "status": to }
        };
        let result = self.elections.update_one(filter, update, None).await?;
        Ok(result.modified_count == 1)
    }

    async fn insert_candidate(&self, candidate: &Candidate) -> StoreResult<()> {
        self.candidates
            .insert_one(candidate, None)
            .await
            .map_err(|e| on_insert(e, CANDIDATE_INDEX))?;
        Ok(())
    }

    async fn candidate(&self, id: Id) -> StoreResult<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn candidates_for(&self, election_id: Id) -> StoreResult<Vec<Candidate>> {
        // `_id` breaks ties between candidates created in the same millisecond.
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        Ok(self
            .candidates
            .find(doc! { "election_id": election_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn insert_ballot(&self, ballot: &Ballot) -> StoreResult<()> {
        self.ballots
            .insert_one(ballot, None)
            .await
            .map_err(|e| on_insert(e, BALLOT_INDEX))?;
        Ok(())
    }

    async fn ballot_for(&self, election_id: Id) -> StoreResult<Option<Ballot>> {
        Ok(self
            .ballots
            .find_one(doc! { "election_id": election_id }, None)
            .await?)
    }

    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()> {
        self.votes
            .insert_one(vote, None)
            .await
            .map_err(|e| on_insert(e, VOTE_INDEX))?;
        Ok(())
    }

    async fn vote(&self, id: Id) -> StoreResult<Option<Vote>> {
        Ok(self.votes.find_one(id.as_doc(), None).await?)
    }

    async fn vote_for(&self, voter_id: Id, election_id: Id) -> StoreResult<Option<Vote>> {
        let filter = doc! {
            "voter_id": voter_id,
            "election_id": election_id,
        };
        Ok(self.votes.find_one(filter, None).await?)
    }

    async fn votes_by_voter(&self, voter_id: Id) -> StoreResult<Vec<Vote>> {
        let options = FindOptions::builder().sort(doc! { "cast_at": -1 }).build();
        Ok(self
            .votes
            .find(doc! { "voter_id": voter_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn votes_in_election(&self, election_id: Id) -> StoreResult<Vec<Vote>> {
        let options = FindOptions::builder().sort(doc! { "cast_at": 1 }).build();
        Ok(self
            .votes
            .find(doc! { "election_id": election_id }, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn count_votes(&self, election_id: Id) -> StoreResult<u64> {
        Ok(self
            .votes
            .count_documents(doc! { "election_id": election_id }, None)
            .await?)
    }

    async fn count_all_votes(&self) -> StoreResult<u64> {
        Ok(self.votes.count_documents(None, None).await?)
    }

    async fn tally(
        &self,
        election_id: Id,
        cast_until: DateTime<Utc>,
    ) -> StoreResult<HashMap<Id, u64>> {
        let pipeline = vec![
            doc! {
                "$match": {
                    "election_id": election_id,
                    "cast_at": { "$lte": bson::DateTime::from_chrono(cast_until) },
                }
            },
            doc! {
                "$group": {
                    "_id": "$candidate_id",
                    "count": { "$sum": 1 },
                }
            },
        ];
        let mut cursor = self.votes.aggregate(pipeline, None).await?;
        let mut counts = HashMap::new();
        while let Some(group) = cursor.try_next().await? {
            let candidate_id = group
                .get_object_id("_id")
                .map_err(|e| StoreError::Malformed(format!("tally group id: {e}")))?;
            let count = match group.get("count") {
                Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
                Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
                other => {
                    return Err(StoreError::Malformed(format!(
                        "tally count for {candidate_id}: {other:?}"
                    )))
                }
            };
            counts.insert(Id::from(candidate_id), count);
        }
        Ok(counts)
    }

    async fn mark_verified(&self, vote_id: Id) -> StoreResult<()> {
        let update = doc! {
            "$set": { "verified": true }
        };
        self.votes
            .update_one(vote_id.as_doc(), update, None)
            .await?;
        Ok(())
    }

    async fn insert_session(&self, session: &VotingSession) -> StoreResult<()> {
        self.sessions.insert_one(session, None).await?;
        Ok(())
    }

    async fn session(&self, id: Id) -> StoreResult<Option<VotingSession>> {
        Ok(self.sessions.find_one(id.as_doc(), None).await?)
    }

    async fn update_session(
        &self,
        id: Id,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let filter = doc! {
            "_id": id,
            "status": { "$nin": [SessionStatus::Completed, SessionStatus::Abandoned] },
        };
        let mut set = doc! { "status": status };
        if let Some(at) = completed_at {
            set.insert("completed_at", bson::DateTime::from_chrono(at));
        }
        let result = self
            .sessions
            .update_one(filter, doc! { "$set": set }, None)
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn count_active_sessions(&self) -> StoreResult<u64> {
        let filter = doc! {
            "status": { "$in": [SessionStatus::Started, SessionStatus::InProgress] },
        };
        Ok(self.sessions.count_documents(filter, None).await?)
    }
}
