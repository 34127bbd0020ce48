use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::{ElectionStatus, ElectionType},
    db::election::Election,
};
use crate::voting::clock::SweepReport;

/// An API-friendly summary of an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ApiId,
    pub title: String,
    pub election_type: ElectionType,
    pub status: ElectionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            title: election.title,
            election_type: election.election_type,
            status: election.status,
            start_time: election.start_time,
            end_time: election.end_time,
        }
    }
}

/// Result of a manual status check across all elections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepDesc {
    pub checked: usize,
    pub updated: usize,
}

impl From<SweepReport> for SweepDesc {
    fn from(report: SweepReport) -> Self {
        Self {
            checked: report.checked,
            updated: report.updated,
        }
    }
}
