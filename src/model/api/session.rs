use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId, common::session::SessionStatus, db::session::VotingSession,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub election_id: ApiId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDesc {
    pub id: ApiId,
    pub election_id: ApiId,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<VotingSession> for SessionDesc {
    fn from(session: VotingSession) -> Self {
        Self {
            id: session.id.into(),
            election_id: session.election_id.into(),
            status: session.status,
            started_at: session.started_at,
            completed_at: session.completed_at,
        }
    }
}
