use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A cast vote, as stored in the database.
///
/// Votes are append-only: after insertion only `verified` may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: Id,
    pub election_id: Id,
    pub candidate_id: Id,
    /// Encrypted `VotePayload`, see `crate::voting::cipher`.
    pub encrypted_payload: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
    #[serde(default)]
    pub verified: bool,
}
