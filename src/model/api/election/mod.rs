mod desc;
mod results;

pub use desc::{ElectionSummary, SweepDesc};
pub use results::{CandidateResult, LiveResults, TurnoutDesc};
