//! Voting sessions: telemetry on a voter's progress through the voting flow.
//!
//! Sessions are never consulted when accepting a vote.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::{account::VoterAccount, session::SessionStatus},
    db::session::VotingSession,
    mongodb::Id,
};
use crate::store::Store;

/// Open a new session for the voter in the given election.
pub async fn start(
    store: &dyn Store,
    voter: &VoterAccount,
    election_id: Id,
    ip_address: Option<String>,
    user_agent: String,
    now: DateTime<Utc>,
) -> Result<VotingSession> {
    if store.election(election_id).await?.is_none() {
        return Err(Error::not_found(format!("Election {election_id}")));
    }
    let session = VotingSession::new(voter.id(), election_id, ip_address, user_agent, now);
    store.insert_session(&session).await?;
    debug!(
        "Voter {} started session {} in election {election_id}",
        voter.id(),
        session.id
    );
    Ok(session)
}

/// The voter has seen their ballot.
pub async fn progress(store: &dyn Store, voter: &VoterAccount, session_id: Id) -> Result<()> {
    update(store, voter, session_id, SessionStatus::InProgress, None).await
}

/// The voter's vote was recorded.
pub async fn complete(
    store: &dyn Store,
    voter: &VoterAccount,
    session_id: Id,
    now: DateTime<Utc>,
) -> Result<()> {
    update(store, voter, session_id, SessionStatus::Completed, Some(now)).await
}

/// The voter's cast attempt failed.
pub async fn fail(store: &dyn Store, voter: &VoterAccount, session_id: Id) -> Result<()> {
    update(store, voter, session_id, SessionStatus::Error, None).await
}

/// The voter gave up.
pub async fn abandon(
    store: &dyn Store,
    voter: &VoterAccount,
    session_id: Id,
    now: DateTime<Utc>,
) -> Result<()> {
    update(store, voter, session_id, SessionStatus::Abandoned, Some(now)).await
}

async fn update(
    store: &dyn Store,
    voter: &VoterAccount,
    session_id: Id,
    status: SessionStatus,
    completed_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let session = store
        .session(session_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voting session {session_id}")))?;
    if session.voter_id != voter.id() {
        return Err(Error::Forbidden(
            "This voting session belongs to another voter".to_string(),
        ));
    }
    if !store.update_session(session_id, status, completed_at).await? {
        return Err(Error::Validation(format!(
            "Voting session {session_id} is already closed"
        )));
    }
    debug!("Session {session_id} is now {status:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::fixtures::Fixture;

    #[rocket::async_test]
    async fn session_lifecycle() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        let voter = fx.voter_account();

        let session = start(
            &*fx.store,
            &voter,
            fx.election.id,
            Some("10.0.0.7".to_string()),
            "test-agent".to_string(),
            now,
        )
        .await
        .unwrap();
        assert_eq!(session.status, SessionStatus::Started);
        assert_eq!(fx.store.count_active_sessions().await.unwrap(), 1);

        progress(&*fx.store, &voter, session.id).await.unwrap();
        fail(&*fx.store, &voter, session.id).await.unwrap();
        // A failed attempt can still be completed by a later cast.
        complete(&*fx.store, &voter, session.id, now).await.unwrap();

        let stored = fx.store.session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);
        assert_eq!(stored.completed_at, Some(now));
        assert_eq!(stored.ip_address.as_deref(), Some("10.0.0.7"));

        let result = abandon(&*fx.store, &voter, session.id, now).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(fx.store.count_active_sessions().await.unwrap(), 0);
    }

    #[rocket::async_test]
    async fn sessions_are_private() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        let session = start(
            &*fx.store,
            &fx.voter_account(),
            fx.election.id,
            None,
            String::new(),
            now,
        )
        .await
        .unwrap();

        let stranger = fx.add_voter(3).await;
        let result = abandon(&*fx.store, &stranger, session.id, now).await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        let result = abandon(&*fx.store, &stranger, Id::new(), now).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        let result = start(&*fx.store, &stranger, Id::new(), None, String::new(), now).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
