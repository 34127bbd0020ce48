//! The election clock: derives and persists an election's phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{account::AdminAccount, election::ElectionStatus},
    db::election::Election,
    mongodb::Id,
};
use crate::store::Store;

/// The status the election should move to at `now`, if any.
///
/// Only ever moves forward: upcoming elections open once the window has
/// started, ongoing ones close once it has ended. Completed and cancelled
/// elections never move.
pub fn next_status(election: &Election, now: DateTime<Utc>) -> Option<ElectionStatus> {
    match election.status {
        ElectionStatus::Upcoming if election.start_time <= now && now <= election.end_time => {
            Some(ElectionStatus::Ongoing)
        }
        ElectionStatus::Ongoing if now > election.end_time => Some(ElectionStatus::Completed),
        _ => None,
    }
}

/// Can a vote be accepted at `now`? Both window bounds are inclusive.
///
/// Callers must evaluate this against a fresh read of the election for every
/// cast; the persisted status alone may be stale.
pub fn can_accept_votes(election: &Election, now: DateTime<Utc>) -> bool {
    election.status == ElectionStatus::Ongoing
        && election.start_time <= now
        && now <= election.end_time
}

/// Bring the election's persisted status up to date with `now`.
///
/// The write is a compare-and-set on the previous status, so racing
/// evaluations apply each transition at most once. If another writer got
/// there first, `election` is refreshed from the store. Returns whether this
/// call performed a transition.
pub async fn evaluate(
    store: &dyn Store,
    election: &mut Election,
    now: DateTime<Utc>,
) -> Result<bool> {
    let next = match next_status(election, now) {
        Some(next) => next,
        None => return Ok(false),
    };
    if store
        .transition_status(election.id, election.status, next)
        .await?
    {
        info!(
            "Election {} ({}) moved from {} to {next}",
            election.id, election.title, election.status
        );
        election.status = next;
        Ok(true)
    } else {
        debug!("Election {} was transitioned concurrently", election.id);
        if let Some(fresh) = store.election(election.id).await? {
            *election = fresh;
        }
        Ok(false)
    }
}

/// Open an upcoming election now, regardless of its window.
pub async fn start(store: &dyn Store, admin: &AdminAccount, election_id: Id) -> Result<Election> {
    let election = load(store, election_id).await?;
    if election.status != ElectionStatus::Upcoming {
        return Err(Error::ElectionPhase(format!(
            "Election '{}' cannot be started: it is {}",
            election.title, election.status
        )));
    }
    let election = apply(store, election, ElectionStatus::Ongoing).await?;
    info!("Admin {} started election {election_id}", admin.id());
    Ok(election)
}

/// Close an ongoing election now, regardless of its window.
pub async fn end(store: &dyn Store, admin: &AdminAccount, election_id: Id) -> Result<Election> {
    let election = load(store, election_id).await?;
    if election.status != ElectionStatus::Ongoing {
        return Err(Error::ElectionPhase(format!(
            "Election '{}' cannot be ended: it is {}",
            election.title, election.status
        )));
    }
    let election = apply(store, election, ElectionStatus::Completed).await?;
    info!("Admin {} ended election {election_id}", admin.id());
    Ok(election)
}

/// Call off an election that has not yet completed.
pub async fn cancel(store: &dyn Store, admin: &AdminAccount, election_id: Id) -> Result<Election> {
    let election = load(store, election_id).await?;
    if election.status.is_terminal() {
        return Err(Error::ElectionPhase(format!(
            "Election '{}' cannot be cancelled: it is {}",
            election.title, election.status
        )));
    }
    let election = apply(store, election, ElectionStatus::Cancelled).await?;
    warn!("Admin {} cancelled election {election_id}", admin.id());
    Ok(election)
}

/// Outcome of a status sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Number of elections evaluated.
    pub checked: usize,
    /// Number of elections whose status changed.
    pub updated: usize,
}

/// Evaluate every election against `now`.
pub async fn sweep(store: &dyn Store, now: DateTime<Utc>) -> Result<SweepReport> {
    let elections = store.elections().await?;
    let checked = elections.len();
    let mut updated = 0;
    for mut election in elections {
        if evaluate(store, &mut election, now).await? {
            updated += 1;
        }
    }
    debug!("Status sweep checked {checked} elections, updated {updated}");
    Ok(SweepReport { checked, updated })
}

/// The next instant at which the clock would change this election's status,
/// if it can still change automatically after being evaluated at `now`.
pub fn next_boundary(election: &Election, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match election.status {
        // An upcoming election whose window has passed never opens by itself.
        ElectionStatus::Upcoming if now <= election.end_time => Some(election.start_time),
        // Closing happens strictly after the end time.
        ElectionStatus::Ongoing => Some(election.end_time + chrono::Duration::milliseconds(1)),
        _ => None,
    }
}

async fn load(store: &dyn Store, election_id: Id) -> Result<Election> {
    store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Compare-and-set from the election's current status to `to`.
async fn apply(store: &dyn Store, mut election: Election, to: ElectionStatus) -> Result<Election> {
    if !store
        .transition_status(election.id, election.status, to)
        .await?
    {
        return Err(Error::ElectionPhase(format!(
            "Election '{}' changed status concurrently, please retry",
            election.title
        )));
    }
    election.status = to;
    Ok(election)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::common::account::{Account, AccountKind};
    use crate::store::MemoryStore;

    fn admin() -> AdminAccount {
        Account::new(AccountKind::Admin, Id::new()).as_admin().unwrap()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        let election = Election::ongoing_example(now);
        assert!(can_accept_votes(&election, election.start_time));
        assert!(can_accept_votes(&election, election.end_time));
        assert!(!can_accept_votes(
            &election,
            election.start_time - Duration::milliseconds(1)
        ));
        assert!(!can_accept_votes(
            &election,
            election.end_time + Duration::milliseconds(1)
        ));

        // Inside the window, but with a stale persisted status.
        let mut upcoming = election.clone();
        upcoming.status = ElectionStatus::Upcoming;
        assert!(!can_accept_votes(&upcoming, now));
    }

    #[test]
    fn transitions_only_move_forward() {
        let now = Utc::now();
        let mut election = Election::ongoing_example(now);

        election.status = ElectionStatus::Upcoming;
        assert_eq!(next_status(&election, now), Some(ElectionStatus::Ongoing));
        assert_eq!(
            next_status(&election, election.start_time - Duration::seconds(1)),
            None
        );

        election.status = ElectionStatus::Ongoing;
        assert_eq!(next_status(&election, election.end_time), None);
        assert_eq!(
            next_status(&election, election.end_time + Duration::seconds(1)),
            Some(ElectionStatus::Completed)
        );

        election.status = ElectionStatus::Cancelled;
        assert_eq!(next_status(&election, now), None);
        election.status = ElectionStatus::Completed;
        assert_eq!(next_status(&election, now - Duration::minutes(5)), None);
    }

    #[rocket::async_test]
    async fn evaluate_persists_status_only() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut election = Election::upcoming_example(now);
        store.insert_election(&election).await.unwrap();

        assert!(!evaluate(&store, &mut election, now).await.unwrap());
        let opening = election.start_time;
        assert!(evaluate(&store, &mut election, opening).await.unwrap());
        assert_eq!(election.status, ElectionStatus::Ongoing);

        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored, election);

        // A stale copy loses the race and picks up the winner's status.
        let mut stale = election.clone();
        stale.status = ElectionStatus::Upcoming;
        assert!(!evaluate(&store, &mut stale, opening).await.unwrap());
        assert_eq!(stale.status, ElectionStatus::Ongoing);
    }

    #[rocket::async_test]
    async fn manual_transitions() {
        let store = MemoryStore::new();
        let admin = admin();
        let now = Utc::now();
        let election = Election::upcoming_example(now);
        store.insert_election(&election).await.unwrap();

        let result = end(&store, &admin, election.id).await;
        assert!(matches!(result, Err(Error::ElectionPhase(_))));

        let started = start(&store, &admin, election.id).await.unwrap();
        assert_eq!(started.status, ElectionStatus::Ongoing);
        let result = start(&store, &admin, election.id).await;
        assert!(matches!(result, Err(Error::ElectionPhase(_))));

        let ended = end(&store, &admin, election.id).await.unwrap();
        assert_eq!(ended.status, ElectionStatus::Completed);
        let result = cancel(&store, &admin, election.id).await;
        assert!(matches!(result, Err(Error::ElectionPhase(_))));

        let result = start(&store, &admin, Id::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[rocket::async_test]
    async fn cancelled_is_terminal() {
        let store = MemoryStore::new();
        let admin = admin();
        let now = Utc::now();
        let election = Election::upcoming_example(now);
        store.insert_election(&election).await.unwrap();

        let cancelled = cancel(&store, &admin, election.id).await.unwrap();
        assert_eq!(cancelled.status, ElectionStatus::Cancelled);
        assert_eq!(next_boundary(&cancelled, now), None);

        let report = sweep(&store, election.start_time).await.unwrap();
        assert_eq!(report, SweepReport { checked: 1, updated: 0 });
        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Cancelled);
    }

    #[rocket::async_test]
    async fn sweep_counts_updates() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let mut opening = Election::ongoing_example(now);
        opening.status = ElectionStatus::Upcoming;
        let mut closing = Election::completed_example(now);
        closing.status = ElectionStatus::Ongoing;
        let later = Election::upcoming_example(now);
        for election in [&opening, &closing, &later] {
            store.insert_election(election).await.unwrap();
        }

        let report = sweep(&store, now).await.unwrap();
        assert_eq!(report, SweepReport { checked: 3, updated: 2 });
        let report = sweep(&store, now).await.unwrap();
        assert_eq!(report, SweepReport { checked: 3, updated: 0 });

        let status = |id| {
            let store = &store;
            async move { store.election(id).await.unwrap().unwrap().status }
        };
        assert_eq!(status(opening.id).await, ElectionStatus::Ongoing);
        assert_eq!(status(closing.id).await, ElectionStatus::Completed);
        assert_eq!(status(later.id).await, ElectionStatus::Upcoming);
    }
}
