use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::voting::tally::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsDesc {
    pub total_votes: u64,
    pub eligible_voters: u64,
    pub turnout_percentage: f64,
    pub votes_by_election: BTreeMap<String, u64>,
    pub active_sessions: u64,
}

impl From<Statistics> for StatisticsDesc {
    fn from(stats: Statistics) -> Self {
        Self {
            total_votes: stats.total_votes,
            eligible_voters: stats.eligible_voters,
            turnout_percentage: stats.turnout,
            votes_by_election: stats.votes_by_election,
            active_sessions: stats.active_sessions,
        }
    }
}
