use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::vote::Vote};

/// A request to cast a vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    /// The voting session this attempt belongs to, if the client opened one.
    #[serde(default)]
    pub session_id: Option<ApiId>,
}

/// Returned on a successful cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<&Vote> for VoteReceipt {
    fn from(vote: &Vote) -> Self {
        Self {
            vote_id: vote.id.into(),
            election_id: vote.election_id.into(),
            cast_at: vote.cast_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub vote_id: ApiId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub message: String,
}

impl From<bool> for VerifyResponse {
    fn from(verified: bool) -> Self {
        let message = if verified {
            "Vote verified successfully"
        } else {
            "Vote verification failed"
        };
        Self {
            verified,
            message: message.to_string(),
        }
    }
}

/// One entry of a voter's own voting history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteHistoryEntry {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub election_title: String,
    pub candidate_name: String,
    pub cast_at: DateTime<Utc>,
    pub verified: bool,
}
