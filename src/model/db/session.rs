use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::session::SessionStatus, mongodb::Id};

/// Telemetry for one attempt by a voter to go through the voting flow.
/// Never consulted when deciding whether a vote is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSession {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: Id,
    pub election_id: Id,
    pub status: SessionStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(default, with = "optional_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: String,
}

impl VotingSession {
    pub fn new(
        voter_id: Id,
        election_id: Id,
        ip_address: Option<String>,
        user_agent: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Id::new(),
            voter_id,
            election_id,
            status: SessionStatus::Started,
            started_at: now,
            completed_at: None,
            ip_address,
            user_agent,
        }
    }
}

/// `chrono_datetime_as_bson_datetime` for optional fields.
mod optional_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(bson::DateTime::from_chrono)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<bson::DateTime>::deserialize(deserializer)?;
        Ok(value.map(|dt| dt.to_chrono()))
    }
}
