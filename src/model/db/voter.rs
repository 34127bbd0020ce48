use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A voter, as stored in the database.
///
/// Voters are registered and authorised elsewhere; the voting core only ever
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    /// The voter's unique external identifier, as printed on their voter card.
    pub voter_number: String,
    pub name: String,
    /// Has the voter's registration been checked by an official?
    pub registration_verified: bool,
    /// Is the voter currently permitted to vote?
    pub can_vote: bool,
}

impl Voter {
    /// Eligibility is the conjunction of both authorisation flags.
    pub fn is_eligible(&self) -> bool {
        self.registration_verified && self.can_vote
    }
}
