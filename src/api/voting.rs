use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::api::{path_id, IdParam};
use crate::error::{Error, Result};
use crate::model::{
    api::{
        ballot::BallotDesc,
        receipt::{CastVoteRequest, VerifyRequest, VerifyResponse, VoteHistoryEntry, VoteReceipt},
    },
    common::account::Account,
    mongodb::Id,
};
use crate::store::SharedStore;
use crate::voting::{ballot, ledger, sessions, verifier, VoteCipher};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, get_ballot, verify_vote, vote_history]
}

#[post("/votes", data = "<request>", format = "json")]
async fn cast_vote(
    account: Account,
    request: Json<CastVoteRequest>,
    store: &State<SharedStore>,
    cipher: &State<VoteCipher>,
) -> Result<Json<VoteReceipt>> {
    let voter = account.as_voter()?;
    let store = store.inner().as_ref();
    let now = Utc::now();

    let result = ledger::cast_vote(
        store,
        cipher,
        &voter,
        request.election_id.into(),
        request.candidate_id.into(),
        now,
    )
    .await;

    // Session bookkeeping must never change the outcome of the cast.
    if let Some(session_id) = request.session_id {
        let update = match result {
            Ok(_) => sessions::complete(store, &voter, session_id.into(), now).await,
            Err(_) => sessions::fail(store, &voter, session_id.into()).await,
        };
        if let Err(e) = update {
            warn!("Could not update voting session {session_id}: {e}");
        }
    }

    let vote = result?;
    Ok(Json(VoteReceipt::from(&vote)))
}

#[get("/elections/<election_id>/ballot?<session_id>")]
async fn get_ballot(
    account: Account,
    election_id: IdParam,
    session_id: Option<String>,
    store: &State<SharedStore>,
) -> Result<Json<BallotDesc>> {
    let voter = account.as_voter()?;
    let election_id = path_id(election_id)?;
    let store = store.inner().as_ref();

    let listing = ballot::get_or_create_ballot(store, election_id, Utc::now()).await?;

    if let Some(session_id) = session_id {
        let session_id = session_id
            .parse::<Id>()
            .map_err(|_| Error::Validation(format!("Invalid session ID '{session_id}'")))?;
        if let Err(e) = sessions::progress(store, &voter, session_id).await {
            warn!("Could not update voting session {session_id}: {e}");
        }
    }

    Ok(Json(listing.into()))
}

#[post("/votes/verify", data = "<request>", format = "json")]
async fn verify_vote(
    account: Account,
    request: Json<VerifyRequest>,
    store: &State<SharedStore>,
    cipher: &State<VoteCipher>,
) -> Result<Json<VerifyResponse>> {
    let voter = account.as_voter()?;
    let verified =
        verifier::verify_own_vote(store.inner().as_ref(), cipher, &voter, request.vote_id.into())
            .await?;
    Ok(Json(verified.into()))
}

#[get("/votes/history")]
async fn vote_history(
    account: Account,
    store: &State<SharedStore>,
) -> Result<Json<Vec<VoteHistoryEntry>>> {
    let voter = account.as_voter()?;

    let votes = store.votes_by_voter(voter.id()).await?;
    let mut history = Vec::with_capacity(votes.len());
    for vote in votes {
        let election_title = store
            .election(vote.election_id)
            .await?
            .map(|e| e.title)
            .unwrap_or_else(|| "Unknown election".to_string());
        let candidate_name = store
            .candidate(vote.candidate_id)
            .await?
            .map(|c| c.name)
            .unwrap_or_else(|| "Unknown candidate".to_string());
        history.push(VoteHistoryEntry {
            vote_id: vote.id.into(),
            election_id: vote.election_id.into(),
            election_title,
            candidate_name,
            cast_at: vote.cast_at,
            verified: vote.verified,
        });
    }

    Ok(Json(history))
}
