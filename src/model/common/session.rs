use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Progress of a voter through the voting flow for one election.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Started,
    InProgress,
    Completed,
    Abandoned,
    Error,
}

impl SessionStatus {
    /// Completed and abandoned sessions are closed for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Is the voter still expected to come back to this session?
    pub fn is_active(self) -> bool {
        matches!(self, Self::Started | Self::InProgress)
    }
}

impl From<SessionStatus> for Bson {
    fn from(status: SessionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
