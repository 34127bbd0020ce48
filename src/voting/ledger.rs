//! The vote ledger: accepts cast attempts and records at most one vote per
//! voter per election.

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::account::VoterAccount,
    db::{election::Election, vote::Vote},
    mongodb::Id,
};
use crate::store::{Store, StoreError};

use super::{
    cipher::{VoteCipher, VotePayload},
    clock,
};

/// Cast `voter`'s vote for `candidate_id` in `election_id` at `now`.
///
/// All preconditions are checked before anything is written, and a failed
/// cast leaves no vote behind. The read for an existing vote only gives a
/// friendlier early answer; the unique `(voter_id, election_id)` index is what
/// actually rejects a concurrent second vote, and that rejection is reported
/// as the same `DuplicateVote` error.
pub async fn cast_vote(
    store: &dyn Store,
    cipher: &VoteCipher,
    voter: &VoterAccount,
    election_id: Id,
    candidate_id: Id,
    now: DateTime<Utc>,
) -> Result<Vote> {
    let voter = store
        .voter(voter.id())
        .await?
        .ok_or_else(|| Error::IneligibleVoter("Voter is not registered".to_string()))?;
    if !voter.is_eligible() {
        return Err(Error::IneligibleVoter(
            "Voter is not yet verified or not authorised to vote".to_string(),
        ));
    }

    // Always a fresh read: the phase decision must not rest on a cached status.
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !clock::can_accept_votes(&election, now) {
        return Err(Error::ElectionPhase(format!(
            "Election '{}' is not accepting votes (status: {})",
            election.title, election.status
        )));
    }

    let candidate = store
        .candidate(candidate_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    if candidate.election_id != election.id {
        return Err(Error::CandidateMismatch(format!(
            "Candidate '{}' is not standing in election '{}'",
            candidate.name, election.title
        )));
    }

    if store.vote_for(voter.id, election.id).await?.is_some() {
        return Err(duplicate(&election));
    }

    // Stored timestamps only keep millisecond precision.
    let cast_at = now.trunc_subsecs(3);
    let payload = VotePayload {
        voter_id: voter.voter_number.clone(),
        election_id: election.id.to_hex(),
        candidate_id: candidate.id.to_hex(),
        cast_at,
    };
    let encrypted_payload = cipher.encrypt(&payload).map_err(|e| {
        error!("Failed to encrypt vote in election {}: {e}", election.id);
        Error::Encryption(e)
    })?;

    let vote = Vote {
        id: Id::new(),
        voter_id: voter.id,
        election_id: election.id,
        candidate_id: candidate.id,
        encrypted_payload,
        cast_at,
        verified: false,
    };
    match store.insert_vote(&vote).await {
        Ok(()) => {}
        Err(StoreError::UniqueViolation(index)) => {
            warn!(
                "Concurrent duplicate vote by voter {} in election {} rejected by `{index}`",
                voter.id, election.id
            );
            return Err(duplicate(&election));
        }
        Err(e) => return Err(e.into()),
    }

    info!("Recorded vote {} in election {}", vote.id, election.id);
    Ok(vote)
}

fn duplicate(election: &Election) -> Error {
    Error::DuplicateVote(format!(
        "You have already voted in election '{}'",
        election.title
    ))
}
