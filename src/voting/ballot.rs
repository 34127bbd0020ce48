//! The ballot assembler: the ordered candidate listing for an election.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        ballot::{Ballot, BallotEntry},
        candidate::Candidate,
        election::Election,
    },
    mongodb::Id,
};
use crate::store::{Store, StoreError};

use super::clock;

/// A ballot together with the candidates it lists, in ballot order.
#[derive(Debug, Clone)]
pub struct BallotListing {
    pub election: Election,
    pub ballot: Ballot,
    pub entries: Vec<(BallotEntry, Candidate)>,
}

/// Fetch the election's ballot, creating it from the current candidates on
/// first request.
///
/// Only available while the election accepts votes, whether or not a ballot
/// already exists. Concurrent first requests race on the unique ballot index;
/// the losers read back the winner's ballot.
pub async fn get_or_create_ballot(
    store: &dyn Store,
    election_id: Id,
    now: DateTime<Utc>,
) -> Result<BallotListing> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !clock::can_accept_votes(&election, now) {
        return Err(Error::BallotNotAvailable(format!(
            "Election '{}' is not currently active",
            election.title
        )));
    }

    let ballot = match store.ballot_for(election.id).await? {
        Some(ballot) => ballot,
        None => create_ballot(store, &election).await?,
    };

    let mut entries = Vec::with_capacity(ballot.entries.len());
    for entry in ballot.ordered_entries() {
        match store.candidate(entry.candidate_id).await? {
            Some(candidate) => entries.push((entry, candidate)),
            None => warn!(
                "Ballot {} lists missing candidate {}",
                ballot.id, entry.candidate_id
            ),
        }
    }

    Ok(BallotListing {
        election,
        ballot,
        entries,
    })
}

async fn create_ballot(store: &dyn Store, election: &Election) -> Result<Ballot> {
    let candidates = store.candidates_for(election.id).await?;
    let ballot = Ballot::new(election.id, candidates.iter().map(|c| c.id)).ok_or_else(|| {
        StoreError::Malformed(format!("Election {} lists a candidate twice", election.id))
    })?;

    match store.insert_ballot(&ballot).await {
        Ok(()) => {
            info!(
                "Created ballot {} for election {} with {} candidates",
                ballot.id,
                election.id,
                ballot.entries.len()
            );
            Ok(ballot)
        }
        Err(StoreError::UniqueViolation(_)) => {
            debug!(
                "Ballot for election {} was created concurrently, re-reading",
                election.id
            );
            let winner = store.ballot_for(election.id).await?.ok_or_else(|| {
                StoreError::Malformed(format!(
                    "Ballot for election {} vanished after a conflicting insert",
                    election.id
                ))
            })?;
            Ok(winner)
        }
        Err(e) => Err(e.into()),
    }
}
