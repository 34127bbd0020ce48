use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::election::{ElectionStatus, ElectionType},
    mongodb::Id,
};

/// An election, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    pub title: String,
    pub election_type: ElectionType,
    #[serde(default)]
    pub description: String,
    /// Voting opens at this instant (inclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes at this instant (inclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Persisted phase; only ever written by the election clock.
    pub status: ElectionStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Election {
    /// Create a new, upcoming election. The window must be non-empty.
    pub fn new(
        title: String,
        election_type: ElectionType,
        description: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self> {
        if end_time <= start_time {
            return Err(Error::Validation(format!(
                "Election '{title}' must end after it starts"
            )));
        }
        Ok(Self {
            id: Id::new(),
            title,
            election_type,
            description,
            start_time,
            end_time,
            status: ElectionStatus::Upcoming,
            created_at: Utc::now(),
        })
    }
}
