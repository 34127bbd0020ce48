use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::api::{path_id, IdParam};
use crate::error::Result;
use crate::model::{api::statistics::StatisticsDesc, common::account::Account};
use crate::store::SharedStore;
use crate::voting::{audit, audit::AuditExport, tally};

pub fn routes() -> Vec<Route> {
    routes![statistics, audit_export]
}

#[get("/statistics")]
async fn statistics(account: Account, store: &State<SharedStore>) -> Result<Json<StatisticsDesc>> {
    let staff = account.as_staff()?;
    let stats = tally::statistics(store.inner().as_ref(), &staff).await?;
    Ok(Json(stats.into()))
}

#[get("/elections/<election_id>/audit")]
async fn audit_export(
    account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
) -> Result<Json<AuditExport>> {
    let staff = account.as_staff()?;
    let election_id = path_id(election_id)?;
    let export = audit::export(store.inner().as_ref(), &staff, election_id, Utc::now()).await?;
    Ok(Json(export))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use super::*;
    use crate::model::db::{candidate::Candidate, election::Election, voter::Voter};
    use crate::store::{MemoryStore, Store};
    use crate::voting::{ledger, VoteCipher};

    /// An ongoing election with one vote per voter, `voters` of whom exist.
    async fn populate(client: &Client, store: &MemoryStore, voters: u32, votes: u32) -> Election {
        let now = Utc::now();
        let election = Election::ongoing_example(now);
        store.insert_election(&election).await.unwrap();
        let candidate = Candidate::example_a(election.id);
        store.insert_candidate(&candidate).await.unwrap();

        let cipher = client.rocket().state::<VoteCipher>().unwrap();
        for n in 1..=voters {
            let voter = Voter::example_numbered(n);
            store.insert_voter(&voter).await.unwrap();
            if n <= votes {
                let account = Account::Voter(voter.id).as_voter().unwrap();
                ledger::cast_vote(store, cipher, &account, election.id, candidate.id, now)
                    .await
                    .unwrap();
            }
        }
        election
    }

    #[backend_test(official)]
    async fn officials_see_statistics(client: Client, store: Arc<MemoryStore>) {
        let election = populate(&client, &store, 6, 1).await;

        let response = client.get(uri!(statistics)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let stats: StatisticsDesc =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(stats.total_votes, 1);
        assert_eq!(stats.eligible_voters, 6);
        assert_eq!(stats.turnout_percentage, 16.67);
        assert_eq!(stats.votes_by_election.get(&election.title), Some(&1));
        assert_eq!(stats.active_sessions, 0);
    }

    #[backend_test(admin)]
    async fn audit_export_verifies(client: Client, store: Arc<MemoryStore>) {
        let election = populate(&client, &store, 3, 3).await;

        let response = client.get(uri!(audit_export(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let export: AuditExport =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(export.election_id, election.id.to_hex());
        assert_eq!(export.votes.len(), 3);

        let cipher = client.rocket().state::<VoteCipher>().unwrap();
        let report = export.audit(cipher);
        assert!(report.all_verified());
        assert_eq!(report.verified, 3);
    }

    #[backend_test(voter)]
    async fn voters_see_neither(client: Client, store: Arc<MemoryStore>) {
        let election = populate(&client, &store, 2, 0).await;

        let response = client.get(uri!(statistics)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client.get(uri!(audit_export(election.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
