use std::collections::BTreeMap;

use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::api::{path_id, IdParam};
use crate::error::Result;
use crate::model::{
    api::election::{LiveResults, TurnoutDesc},
    common::account::Account,
};
use crate::store::SharedStore;
use crate::voting::tally;

pub fn routes() -> Vec<Route> {
    routes![final_results, live_results, turnout]
}

#[get("/elections/<election_id>/results")]
async fn final_results(
    _account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
) -> Result<Json<BTreeMap<String, u64>>> {
    let election_id = path_id(election_id)?;
    let results = tally::final_results(store.inner().as_ref(), election_id).await?;
    Ok(Json(results))
}

#[get("/elections/<election_id>/results/live")]
async fn live_results(
    _account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
) -> Result<Json<LiveResults>> {
    let election_id = path_id(election_id)?;
    let tally = tally::live_results(store.inner().as_ref(), election_id, Utc::now()).await?;
    Ok(Json(tally.into()))
}

#[get("/elections/<election_id>/turnout")]
async fn turnout(
    _account: Account,
    election_id: IdParam,
    store: &State<SharedStore>,
) -> Result<Json<TurnoutDesc>> {
    let election_id = path_id(election_id)?;
    let turnout = tally::turnout(store.inner().as_ref(), election_id).await?;
    Ok(Json(TurnoutDesc {
        election_id: election_id.into(),
        turnout,
    }))
}
