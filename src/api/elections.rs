use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::api::{path_id, IdParam};
use crate::error::Result;
use crate::model::{
    api::election::{ElectionSummary, SweepDesc},
    common::{account::Account, election::ElectionStatus},
};
use crate::store::SharedStore;
use crate::voting::{clock, ElectionTransitions};

pub fn routes() -> Vec<Route> {
    routes![
        active_elections,
        start_election,
        end_election,
        cancel_election,
        check_status,
    ]
}

#[get("/elections/active")]
async fn active_elections(
    _account: Account,
    store: &State<SharedStore>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let store = store.inner().as_ref();
    clock::sweep(store, Utc::now()).await?;

    let active = store
        .elections()
        .await?
        .into_iter()
        .filter(|election| election.status == ElectionStatus::Ongoing)
        .map(ElectionSummary::from)
        .collect();
    Ok(Json(active))
}

#[post("/elections/<election_id>/start")]
async fn start_election(
    account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
    transitions: &State<ElectionTransitions>,
) -> Result<Json<ElectionSummary>> {
    let admin = account.as_admin()?;
    let election_id = path_id(election_id)?;
    let election = clock::start(store.inner().as_ref(), &admin, election_id).await?;
    transitions.schedule_election(&election).await;
    Ok(Json(election.into()))
}

#[post("/elections/<election_id>/end")]
async fn end_election(
    account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
    transitions: &State<ElectionTransitions>,
) -> Result<Json<ElectionSummary>> {
    let admin = account.as_admin()?;
    let election_id = path_id(election_id)?;
    let election = clock::end(store.inner().as_ref(), &admin, election_id).await?;
    transitions.schedule_election(&election).await;
    Ok(Json(election.into()))
}

#[post("/elections/<election_id>/cancel")]
async fn cancel_election(
    account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
    transitions: &State<ElectionTransitions>,
) -> Result<Json<ElectionSummary>> {
    let admin = account.as_admin()?;
    let election_id = path_id(election_id)?;
    let election = clock::cancel(store.inner().as_ref(), &admin, election_id).await?;
    transitions.schedule_election(&election).await;
    Ok(Json(election.into()))
}

#[post("/elections/check-status")]
async fn check_status(account: Account, store: &State<SharedStore>) -> Result<Json<SweepDesc>> {
    let admin = account.as_admin()?;
    let report = clock::sweep(store.inner().as_ref(), Utc::now()).await?;
    info!(
        "Admin {} ran a status check: {} of {} elections updated",
        admin.id(),
        report.updated,
        report.checked
    );
    Ok(Json(report.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::{http::Status, local::asynchronous::Client, serde::json::serde_json};

    use super::*;
    use crate::error::{ErrorBody, ErrorKind};
    use crate::model::{db::election::Election, mongodb::Id};
    use crate::store::{MemoryStore, Store};

    #[backend_test(voter)]
    async fn active_elections_are_swept_first(client: Client, store: Arc<MemoryStore>) {
        let now = Utc::now();
        // Inside its window but never opened.
        let mut stale = Election::ongoing_example(now);
        stale.status = ElectionStatus::Upcoming;
        let upcoming = Election::upcoming_example(now);
        for election in [&stale, &upcoming] {
            store.insert_election(election).await.unwrap();
        }

        let response = client.get(uri!(active_elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let active: Vec<ElectionSummary> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(*active[0].id, stale.id);
        assert_eq!(active[0].status, ElectionStatus::Ongoing);
    }

    #[backend_test(admin)]
    async fn admin_drives_phases(client: Client, store: Arc<MemoryStore>) {
        let election = Election::upcoming_example(Utc::now());
        store.insert_election(&election).await.unwrap();

        let response = client.post(uri!(end_election(election.id))).dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
        let body: ErrorBody = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.kind, ErrorKind::ElectionPhase);

        let response = client.post(uri!(start_election(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let summary: ElectionSummary =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(summary.status, ElectionStatus::Ongoing);

        let response = client.post(uri!(cancel_election(election.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Cancelled);

        let response = client.post(uri!(start_election(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn check_status_reports_sweep(client: Client, store: Arc<MemoryStore>) {
        let now = Utc::now();
        let mut closing = Election::completed_example(now);
        closing.status = ElectionStatus::Ongoing;
        store.insert_election(&closing).await.unwrap();
        store
            .insert_election(&Election::upcoming_example(now))
            .await
            .unwrap();

        let response = client.post(uri!(check_status)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let report: SweepDesc = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(report, SweepDesc { checked: 2, updated: 1 });
    }

    #[backend_test(voter)]
    async fn voters_cannot_change_phases(client: Client, store: Arc<MemoryStore>) {
        let election = Election::upcoming_example(Utc::now());
        store.insert_election(&election).await.unwrap();

        let response = client.post(uri!(start_election(election.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let response = client.post(uri!(check_status)).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let stored = store.election(election.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ElectionStatus::Upcoming);
    }
}
