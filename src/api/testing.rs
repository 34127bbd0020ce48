//! Test-only login: issues an auth cookie for any account, standing in for
//! the external login system.

use rocket::{
    http::{ContentType, CookieJar, Status},
    local::asynchronous::Client,
    serde::json::{json, Json},
    Route, State,
};

use crate::config::Config;
use crate::error::Result;
use crate::model::{api::auth::AuthToken, common::account::Account, db::voter::Voter};
use crate::store::{MemoryStore, Store};

pub fn routes() -> Vec<Route> {
    routes![login]
}

#[post("/testing/login", data = "<token>", format = "json")]
fn login(token: Json<AuthToken>, cookies: &CookieJar<'_>, config: &State<Config>) -> Result<()> {
    cookies.add(token.into_inner().into_cookie(config)?);
    Ok(())
}

/// Log the client in as the given account.
pub async fn log_in(client: &Client, account: Account) {
    let response = client
        .post(uri!(login))
        .header(ContentType::JSON)
        .body(json!(AuthToken::new(account)).to_string())
        .dispatch()
        .await;
    assert_eq!(Status::Ok, response.status());
}

/// Register the example voter and log the client in as them.
pub async fn log_in_voter(client: &Client, store: &MemoryStore) -> Voter {
    let voter = Voter::example();
    store.insert_voter(&voter).await.unwrap();
    log_in(client, Account::Voter(voter.id)).await;
    voter
}
