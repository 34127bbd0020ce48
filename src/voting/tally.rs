//! The tally engine: vote counts, turnout and statistics.
//!
//! Final and live results are each only available in one phase. Asking in
//! the wrong phase is an error, never an empty tally.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::{account::StaffAccount, election::ElectionStatus},
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
};
use crate::store::Store;

/// One candidate's count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCount {
    pub candidate: Candidate,
    pub votes: u64,
}

/// Results of an election still in progress.
#[derive(Debug, Clone)]
pub struct LiveTally {
    pub election: Election,
    /// Highest count first; equal counts keep candidate creation order.
    pub counts: Vec<CandidateCount>,
    pub total_votes: u64,
    pub generated_at: DateTime<Utc>,
}

/// Election-wide voting statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total_votes: u64,
    pub eligible_voters: u64,
    /// Percentage of eligible voters who have cast any vote, to 2 dp.
    pub turnout: f64,
    /// Total votes per election title.
    pub votes_by_election: BTreeMap<String, u64>,
    pub active_sessions: u64,
}

/// Final results of a completed election: candidate name to vote count.
///
/// Only votes cast no later than the election's end are counted. Every
/// candidate appears, including those with no votes; candidates sharing a
/// name have their counts combined.
pub async fn final_results(store: &dyn Store, election_id: Id) -> Result<BTreeMap<String, u64>> {
    let election = load(store, election_id).await?;
    if election.status != ElectionStatus::Completed {
        return Err(Error::ElectionPhase(format!(
            "Results for '{}' are only available once it has completed (status: {})",
            election.title, election.status
        )));
    }

    let mut results = BTreeMap::new();
    for count in count_candidates(store, &election).await? {
        *results.entry(count.candidate.name).or_insert(0) += count.votes;
    }
    debug!("Computed final results for election {election_id}");
    Ok(results)
}

/// Running results of an ongoing election.
pub async fn live_results(
    store: &dyn Store,
    election_id: Id,
    now: DateTime<Utc>,
) -> Result<LiveTally> {
    let election = load(store, election_id).await?;
    if election.status != ElectionStatus::Ongoing {
        return Err(Error::ElectionPhase(format!(
            "Live results for '{}' are only available while it is ongoing (status: {})",
            election.title, election.status
        )));
    }

    let mut counts = count_candidates(store, &election).await?;
    // Stable, so ties keep creation order.
    counts.sort_by(|a, b| b.votes.cmp(&a.votes));
    let total_votes = counts.iter().map(|c| c.votes).sum();

    Ok(LiveTally {
        election,
        counts,
        total_votes,
        generated_at: now,
    })
}

/// Votes cast in the election as a percentage of voters allowed to vote.
pub async fn turnout(store: &dyn Store, election_id: Id) -> Result<f64> {
    let election = load(store, election_id).await?;
    let votes = store.count_votes(election.id).await?;
    let eligible = store.count_eligible_voters().await?;
    Ok(percentage(votes, eligible))
}

/// Voting statistics across all elections.
pub async fn statistics(store: &dyn Store, staff: &StaffAccount) -> Result<Statistics> {
    let total_votes = store.count_all_votes().await?;
    let eligible_voters = store.count_eligible_voters().await?;

    let mut votes_by_election = BTreeMap::new();
    for election in store.elections().await? {
        let votes = store.count_votes(election.id).await?;
        *votes_by_election.entry(election.title).or_insert(0) += votes;
    }

    let active_sessions = store.count_active_sessions().await?;
    debug!(
        "Statistics requested by {} {}",
        staff.account().kind(),
        staff.account().id()
    );
    Ok(Statistics {
        total_votes,
        eligible_voters,
        turnout: percentage(total_votes, eligible_voters),
        votes_by_election,
        active_sessions,
    })
}

/// `part / whole` as a percentage rounded to 2 dp, or 0 if `whole` is 0.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

async fn load(store: &dyn Store, election_id: Id) -> Result<Election> {
    store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Count votes cast up to the election's end for each of its candidates, in
/// candidate creation order.
async fn count_candidates(store: &dyn Store, election: &Election) -> Result<Vec<CandidateCount>> {
    let tally = store.tally(election.id, election.end_time).await?;
    let candidates = store.candidates_for(election.id).await?;
    Ok(candidates
        .into_iter()
        .map(|candidate| {
            let votes = tally.get(&candidate.id).copied().unwrap_or(0);
            CandidateCount { candidate, votes }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::{
        common::account::{Account, AccountKind},
        db::{vote::Vote, voter::Voter},
    };
    use crate::voting::{clock, fixtures::Fixture, ledger::cast_vote};

    /// Cast `n` votes for `candidate` from fresh voters numbered from `first`.
    async fn cast_many(fx: &Fixture, first: u32, n: u32, candidate: Id, now: DateTime<Utc>) {
        for i in first..first + n {
            let voter = fx.add_voter(i).await;
            cast_vote(&*fx.store, &fx.cipher, &voter, fx.election.id, candidate, now)
                .await
                .unwrap();
        }
    }

    fn admin() -> crate::model::common::account::AdminAccount {
        Account::new(AccountKind::Admin, Id::new()).as_admin().unwrap()
    }

    #[rocket::async_test]
    async fn final_results_need_completed_election() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        let (a, b) = (&fx.candidates[0], &fx.candidates[1]);

        cast_vote(
            &*fx.store,
            &fx.cipher,
            &fx.voter_account(),
            fx.election.id,
            a.id,
            now,
        )
        .await
        .unwrap();
        let result = cast_vote(
            &*fx.store,
            &fx.cipher,
            &fx.voter_account(),
            fx.election.id,
            b.id,
            now,
        )
        .await;
        assert!(matches!(result, Err(Error::DuplicateVote(_))));

        let result = final_results(&*fx.store, fx.election.id).await;
        assert!(matches!(result, Err(Error::ElectionPhase(_))));

        clock::end(&*fx.store, &admin(), fx.election.id).await.unwrap();
        let results = final_results(&*fx.store, fx.election.id).await.unwrap();
        assert_eq!(results.get(&a.name), Some(&1));
        assert_eq!(results.get(&b.name), Some(&0));
        assert_eq!(results.values().sum::<u64>(), 1);
    }

    #[rocket::async_test]
    async fn final_results_ignore_late_votes() {
        let now = Utc::now();
        let fx = Fixture::with_election(Election::completed_example(now)).await;
        let candidate = fx.candidates[2].id;

        for (n, cast_at) in [
            (1, fx.election.end_time),
            (2, fx.election.end_time + Duration::seconds(3)),
        ] {
            let voter = Voter::example_numbered(n);
            fx.store.insert_voter(&voter).await.unwrap();
            let vote = Vote {
                id: Id::new(),
                voter_id: voter.id,
                election_id: fx.election.id,
                candidate_id: candidate,
                encrypted_payload: String::new(),
                cast_at,
                verified: false,
            };
            fx.store.insert_vote(&vote).await.unwrap();
        }

        let results = final_results(&*fx.store, fx.election.id).await.unwrap();
        assert_eq!(results.get("Musa Bello"), Some(&1));
        assert_eq!(results.len(), 3);
    }

    #[rocket::async_test]
    async fn live_results_sorted_and_stable() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        let (a, b, c) = (
            fx.candidates[0].id,
            fx.candidates[1].id,
            fx.candidates[2].id,
        );
        cast_many(&fx, 1, 1, a, now).await;
        cast_many(&fx, 10, 3, b, now).await;
        cast_many(&fx, 20, 1, c, now).await;

        let live = live_results(&*fx.store, fx.election.id, now).await.unwrap();
        let order = live
            .counts
            .iter()
            .map(|c| (c.candidate.id, c.votes))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![(b, 3), (a, 1), (c, 1)]);
        assert_eq!(live.total_votes, 5);
        assert_eq!(live.generated_at, now);

        let again = live_results(&*fx.store, fx.election.id, now).await.unwrap();
        assert_eq!(again.counts, live.counts);

        clock::end(&*fx.store, &admin(), fx.election.id).await.unwrap();
        let result = live_results(&*fx.store, fx.election.id, now).await;
        assert!(matches!(result, Err(Error::ElectionPhase(_))));
    }

    #[rocket::async_test]
    async fn turnout_rounds_and_never_divides_by_zero() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        cast_many(&fx, 1, 1, fx.candidates[0].id, now).await;
        // Two more eligible voters who have not voted.
        fx.add_voter(50).await;
        fx.add_voter(51).await;

        // 1 vote out of 4 eligible voters (the fixture's voter included).
        assert_eq!(turnout(&*fx.store, fx.election.id).await.unwrap(), 25.0);
        fx.add_voter(52).await;
        fx.add_voter(53).await;
        // 1 out of 6.
        assert_eq!(turnout(&*fx.store, fx.election.id).await.unwrap(), 16.67);

        let empty = crate::store::MemoryStore::new();
        let election = Election::ongoing_example(now);
        empty.insert_election(&election).await.unwrap();
        assert_eq!(turnout(&empty, election.id).await.unwrap(), 0.0);

        let result = turnout(&empty, Id::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[rocket::async_test]
    async fn statistics_summarise_all_elections() {
        let now = Utc::now();
        let fx = Fixture::ongoing(now).await;
        cast_many(&fx, 1, 2, fx.candidates[0].id, now).await;
        let quiet = Election::upcoming_example(now);
        fx.store.insert_election(&quiet).await.unwrap();

        let staff = Account::new(AccountKind::InecOfficial, Id::new())
            .as_staff()
            .unwrap();
        let stats = statistics(&*fx.store, &staff).await.unwrap();
        assert_eq!(stats.total_votes, 2);
        assert_eq!(stats.eligible_voters, 3);
        assert_eq!(stats.turnout, 66.67);
        assert_eq!(stats.votes_by_election.get(&fx.election.title), Some(&2));
        assert_eq!(stats.votes_by_election.get(&quiet.title), Some(&0));
        assert_eq!(stats.active_sessions, 0);
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(3, 3), 100.0);
    }
}
