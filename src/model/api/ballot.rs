use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;
use crate::voting::ballot::BallotListing;

/// The ballot presented to a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotDesc {
    pub ballot_id: ApiId,
    pub election_id: ApiId,
    pub election_title: String,
    /// Candidates in ballot order.
    pub candidates: Vec<BallotCandidate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCandidate {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub position: String,
    pub order: u32,
}

impl From<BallotListing> for BallotDesc {
    fn from(listing: BallotListing) -> Self {
        Self {
            ballot_id: listing.ballot.id.into(),
            election_id: listing.election.id.into(),
            election_title: listing.election.title,
            candidates: listing
                .entries
                .into_iter()
                .map(|(entry, candidate)| BallotCandidate {
                    id: candidate.id.into(),
                    name: candidate.name,
                    party: candidate.party,
                    position: candidate.position,
                    order: entry.order,
                })
                .collect(),
            created_at: listing.ballot.created_at,
        }
    }
}
