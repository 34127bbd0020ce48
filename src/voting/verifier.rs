//! The vote verifier: post-hoc integrity checks of stored votes.

use crate::error::{Error, Result};
use crate::model::{
    common::account::VoterAccount,
    db::vote::Vote,
    mongodb::Id,
};
use crate::store::Store;

use super::cipher::VoteCipher;

/// Does the sealed payload decrypt, and does it name exactly these identities?
///
/// Never fails: undecryptable or unparseable payloads simply don't match.
pub fn payload_matches(
    cipher: &VoteCipher,
    sealed: &str,
    voter_number: &str,
    election_id: &str,
    candidate_id: &str,
) -> bool {
    match cipher.decrypt(sealed) {
        Ok(payload) => {
            payload.voter_id == voter_number
                && payload.election_id == election_id
                && payload.candidate_id == candidate_id
        }
        Err(e) => {
            warn!("Vote payload could not be opened: {e}");
            false
        }
    }
}

/// Check a stored vote against its own references, marking it verified if
/// they agree.
///
/// Returns whether the vote verified. A mismatch, a payload that cannot be
/// decrypted, or a reference that no longer resolves all report `false`;
/// only storage failures are errors. Safe to repeat, and never touches any
/// field but `verified`.
pub async fn verify(store: &dyn Store, cipher: &VoteCipher, vote: &Vote) -> Result<bool> {
    let voter = match store.voter(vote.voter_id).await? {
        Some(voter) => voter,
        None => {
            warn!("Vote {} refers to missing voter {}", vote.id, vote.voter_id);
            return Ok(false);
        }
    };

    let verified = payload_matches(
        cipher,
        &vote.encrypted_payload,
        &voter.voter_number,
        &vote.election_id.to_hex(),
        &vote.candidate_id.to_hex(),
    );
    if !verified {
        warn!("Vote {} failed verification", vote.id);
        return Ok(false);
    }

    if !vote.verified {
        store.mark_verified(vote.id).await?;
        info!("Vote {} verified", vote.id);
    }
    Ok(true)
}

/// Verify one of the requesting voter's own votes.
pub async fn verify_own_vote(
    store: &dyn Store,
    cipher: &VoteCipher,
    voter: &VoterAccount,
    vote_id: Id,
) -> Result<bool> {
    let vote = store
        .vote(vote_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote {vote_id}")))?;
    if vote.voter_id != voter.id() {
        return Err(Error::Forbidden(
            "You can only verify your own votes".to_string(),
        ));
    }
    verify(store, cipher, &vote).await
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use data_encoding::BASE64;

    use super::*;
    use crate::voting::{fixtures::Fixture, ledger::cast_vote};

    async fn cast(fx: &Fixture) -> Vote {
        cast_vote(
            &*fx.store,
            &fx.cipher,
            &fx.voter_account(),
            fx.election.id,
            fx.candidates[0].id,
            Utc::now(),
        )
        .await
        .unwrap()
    }

    #[rocket::async_test]
    async fn genuine_vote_verifies_idempotently() {
        let fx = Fixture::ongoing(Utc::now()).await;
        let vote = cast(&fx).await;

        let voter = fx.voter_account();
        assert!(verify_own_vote(&*fx.store, &fx.cipher, &voter, vote.id)
            .await
            .unwrap());
        assert!(verify_own_vote(&*fx.store, &fx.cipher, &voter, vote.id)
            .await
            .unwrap());

        let stored = fx.store.vote(vote.id).await.unwrap().unwrap();
        assert!(stored.verified);
        assert_eq!(
            Vote {
                verified: false,
                ..stored
            },
            vote
        );
    }

    #[rocket::async_test]
    async fn tampered_payload_fails_without_error() {
        let fx = Fixture::ongoing(Utc::now()).await;
        let mut vote = cast(&fx).await;

        let mut bytes = BASE64.decode(vote.encrypted_payload.as_bytes()).unwrap();
        bytes[20] ^= 0x80;
        vote.encrypted_payload = BASE64.encode(&bytes);
        assert!(!verify(&*fx.store, &fx.cipher, &vote).await.unwrap());

        vote.encrypted_payload = "%%%".to_string();
        assert!(!verify(&*fx.store, &fx.cipher, &vote).await.unwrap());

        let stored = fx.store.vote(vote.id).await.unwrap().unwrap();
        assert!(!stored.verified);
    }

    #[rocket::async_test]
    async fn mismatched_references_fail() {
        let fx = Fixture::ongoing(Utc::now()).await;
        let genuine = cast(&fx).await;

        // A payload sealed for one candidate, presented as a vote for another.
        let swapped = Vote {
            candidate_id: fx.candidates[1].id,
            ..genuine.clone()
        };
        assert!(!verify(&*fx.store, &fx.cipher, &swapped).await.unwrap());

        let orphaned = Vote {
            voter_id: Id::new(),
            ..genuine
        };
        assert!(!verify(&*fx.store, &fx.cipher, &orphaned).await.unwrap());
    }

    #[rocket::async_test]
    async fn only_owner_may_verify() {
        let fx = Fixture::ongoing(Utc::now()).await;
        let vote = cast(&fx).await;
        let stranger = fx.add_voter(9).await;

        let result = verify_own_vote(&*fx.store, &fx.cipher, &stranger, vote.id).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        let result = verify_own_vote(&*fx.store, &fx.cipher, &stranger, Id::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
