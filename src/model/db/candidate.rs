use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A candidate standing in exactly one election.
/// `(election_id, name, party)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub name: String,
    pub party: String,
    /// The office label, e.g. "President".
    pub position: String,
    #[serde(default)]
    pub biography: String,
    /// Candidates are enumerated in creation order.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(election_id: Id, name: String, party: String, position: String) -> Self {
        Self {
            id: Id::new(),
            election_id,
            name,
            party,
            position,
            biography: String::new(),
            created_at: Utc::now(),
        }
    }
}
