use std::collections::HashSet;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// The ordered candidate listing for one election, as stored in the database.
///
/// The entries are embedded so that a ballot is created atomically with its
/// whole listing. There is at most one ballot per election (unique index on
/// `election_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    pub election_id: Id,
    pub entries: Vec<BallotEntry>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// One candidate's position on a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntry {
    pub candidate_id: Id,
    pub order: u32,
}

impl Ballot {
    /// Create a ballot listing the given candidates in iteration order,
    /// numbered from 1. Can only fail if a candidate is listed twice.
    pub fn new(election_id: Id, candidates: impl IntoIterator<Item = Id>) -> Option<Self> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (candidate_id, order) in candidates.into_iter().zip(1..) {
            if !seen.insert(candidate_id) {
                return None;
            }
            entries.push(BallotEntry {
                candidate_id,
                order,
            });
        }
        Some(Self {
            id: Id::new(),
            election_id,
            entries,
            created_at: Utc::now(),
        })
    }

    /// The entries sorted by their `order` field.
    pub fn ordered_entries(&self) -> Vec<BallotEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|entry| entry.order);
        entries
    }

    /// Are candidates and orders each unique across the ballot?
    pub fn is_well_formed(&self) -> bool {
        let candidates = self
            .entries
            .iter()
            .map(|e| e.candidate_id)
            .collect::<HashSet<_>>();
        let orders = self.entries.iter().map(|e| e.order).collect::<HashSet<_>>();
        candidates.len() == self.entries.len() && orders.len() == self.entries.len()
    }
}
