use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Phases in the Election lifecycle.
///
/// Transitions only ever move forward (`Upcoming` -> `Ongoing` -> `Completed`),
/// except for a manual cancel, and `Cancelled` is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    /// Created, voting window not yet open.
    Upcoming,
    /// Voting window open.
    Ongoing,
    /// Voting closed, final results available.
    Completed,
    /// Called off; never transitions again.
    Cancelled,
}

impl ElectionStatus {
    /// Is this a status the clock will never move away from?
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// The kind of office being contested.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionType {
    Presidential,
    Gubernatorial,
    Senatorial,
    #[serde(rename = "house_of_reps")]
    HouseOfRepresentatives,
    HouseOfAssembly,
    LocalGovernment,
}
