use std::net::IpAddr;

use chrono::Utc;
use rocket::{
    request::{FromRequest, Outcome},
    serde::json::Json,
    Request, Route, State,
};

use crate::api::{path_id, IdParam};
use crate::error::Result;
use crate::model::{
    api::session::{SessionDesc, StartSessionRequest},
    common::account::Account,
};
use crate::store::SharedStore;
use crate::voting::sessions;

pub fn routes() -> Vec<Route> {
    routes![start_session, abandon_session]
}

/// The client's `User-Agent` header, or an empty string.
pub struct UserAgent(String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserAgent {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let agent = req.headers().get_one("User-Agent").unwrap_or_default();
        Outcome::Success(Self(agent.to_string()))
    }
}

#[post("/sessions", data = "<request>", format = "json")]
pub async fn start_session(
    account: Account,
    request: Json<StartSessionRequest>,
    ip: Option<IpAddr>,
    user_agent: UserAgent,
    store: &State<SharedStore>,
) -> Result<Json<SessionDesc>> {
    let voter = account.as_voter()?;
    let session = sessions::start(
        store.inner().as_ref(),
        &voter,
        request.election_id.into(),
        ip.map(|ip| ip.to_string()),
        user_agent.0,
        Utc::now(),
    )
    .await?;
    Ok(Json(session.into()))
}

#[post("/sessions/<session_id>/abandon")]
async fn abandon_session(
    account: Account,
    session_id: IdParam,
    store: &State<SharedStore>,
) -> Result<()> {
    let voter = account.as_voter()?;
    let session_id = path_id(session_id)?;
    sessions::abandon(store.inner().as_ref(), &voter, session_id, Utc::now()).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use super::*;
    use crate::model::{common::session::SessionStatus, db::election::Election, mongodb::Id};
    use crate::store::{MemoryStore, Store};

    #[backend_test(voter)]
    async fn start_and_abandon(client: Client, store: Arc<MemoryStore>) {
        let election = Election::ongoing_example(Utc::now());
        store.insert_election(&election).await.unwrap();

        let response = client
            .post(uri!(start_session))
            .header(ContentType::JSON)
            .header(Header::new("User-Agent", "ballot-kiosk/2.1"))
            .body(json!({ "election_id": election.id.to_hex() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let session: SessionDesc =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        let stored = store.session(*session.id).await.unwrap().unwrap();
        assert_eq!(stored.user_agent, "ballot-kiosk/2.1");
        assert_eq!(store.count_active_sessions().await.unwrap(), 1);

        let response = client
            .post(uri!(abandon_session(*session.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let stored = store.session(*session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Abandoned);
        assert_eq!(store.count_active_sessions().await.unwrap(), 0);

        // Closed sessions stay closed.
        let response = client
            .post(uri!(abandon_session(*session.id)))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(voter)]
    async fn unknown_election_has_no_session(client: Client) {
        let response = client
            .post(uri!(start_session))
            .header(ContentType::JSON)
            .body(json!({ "election_id": Id::new().to_hex() }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }
}
