use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::{ElectionStatus, ElectionType},
};
use crate::voting::tally::LiveTally;

/// Running results of an ongoing election, highest count first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveResults {
    pub election_id: ApiId,
    pub election_title: String,
    pub election_type: ElectionType,
    pub status: ElectionStatus,
    pub total_votes: u64,
    pub results: Vec<CandidateResult>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: ApiId,
    pub name: String,
    pub party: String,
    pub position: String,
    pub vote_count: u64,
}

impl From<LiveTally> for LiveResults {
    fn from(tally: LiveTally) -> Self {
        Self {
            election_id: tally.election.id.into(),
            election_title: tally.election.title,
            election_type: tally.election.election_type,
            status: tally.election.status,
            total_votes: tally.total_votes,
            results: tally
                .counts
                .into_iter()
                .map(|count| CandidateResult {
                    candidate_id: count.candidate.id.into(),
                    name: count.candidate.name,
                    party: count.candidate.party,
                    position: count.candidate.position,
                    vote_count: count.votes,
                })
                .collect(),
            generated_at: tally.generated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoutDesc {
    pub election_id: ApiId,
    /// Percentage of eligible voters, to 2 dp.
    pub turnout: f64,
}
