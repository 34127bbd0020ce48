use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    ballot::Ballot, candidate::Candidate, election::Election, session::VotingSession,
    vote::Vote, voter::Voter,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Voter {
    const NAME: &'static str = "voters";
}

impl MongoCollection for Election {
    const NAME: &'static str = "elections";
}

impl MongoCollection for Candidate {
    const NAME: &'static str = "candidates";
}

impl MongoCollection for Ballot {
    const NAME: &'static str = "ballots";
}

impl MongoCollection for Vote {
    const NAME: &'static str = "votes";
}

impl MongoCollection for VotingSession {
    const NAME: &'static str = "voting_sessions";
}

/// Names of the unique indexes, reported back in constraint violations.
pub const VOTER_NUMBER_INDEX: &str = "voter_number_unique";
pub const CANDIDATE_INDEX: &str = "election_name_party_unique";
pub const BALLOT_INDEX: &str = "ballot_election_unique";
pub const VOTE_INDEX: &str = "one_vote_per_voter_per_election";

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = |name: &str| {
        IndexOptions::builder()
            .unique(true)
            .name(name.to_string())
            .build()
    };

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"voter_number": 1})
        .options(unique(VOTER_NUMBER_INDEX))
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "name": 1, "party": 1})
        .options(unique(CANDIDATE_INDEX))
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Ballot collection: one ballot per election.
    let ballot_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .options(unique(BALLOT_INDEX))
        .build();
    Coll::<Ballot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;

    // Vote collection: the authoritative guard against double voting.
    let vote_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique(VOTE_INDEX))
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Non-unique lookup index for tallies.
    let tally_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "candidate_id": 1, "cast_at": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(tally_index, None)
        .await?;

    Ok(())
}
