//! The vote casting and tallying core.
//!
//! Every operation takes the store and an explicit `now`, so that phase
//! decisions are made against a single instant and can be tested at exact
//! window boundaries.

pub mod audit;
pub mod ballot;
pub mod cipher;
pub mod clock;
pub mod ledger;
pub mod sessions;
pub mod tally;
pub mod transitions;
pub mod verifier;

pub use cipher::{CipherError, VoteCipher, VotePayload};
pub use transitions::{ClockFairing, ElectionTransitions};

/// Shared setup for the core's unit tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use crate::model::{
        common::account::{Account, AccountKind, VoterAccount},
        db::{candidate::Candidate, election::Election, voter::Voter},
    };
    use crate::store::{MemoryStore, Store};

    use super::cipher::{tests::TEST_SECRET, VoteCipher};

    /// A store holding one eligible voter and an ongoing election with three
    /// candidates, created in the order A, B, C.
    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub cipher: Arc<VoteCipher>,
        pub voter: Voter,
        pub election: Election,
        pub candidates: Vec<Candidate>,
    }

    impl Fixture {
        pub async fn ongoing(now: DateTime<Utc>) -> Self {
            Self::with_election(Election::ongoing_example(now)).await
        }

        pub async fn with_election(election: Election) -> Self {
            let store = Arc::new(MemoryStore::new());
            let voter = Voter::example();
            store.insert_voter(&voter).await.unwrap();
            store.insert_election(&election).await.unwrap();
            let candidates = vec![
                Candidate::example_a(election.id),
                Candidate::example_b(election.id),
                Candidate::example_c(election.id),
            ];
            for candidate in &candidates {
                store.insert_candidate(candidate).await.unwrap();
            }
            Self {
                store,
                cipher: Arc::new(VoteCipher::from_secret(TEST_SECRET).unwrap()),
                voter,
                election,
                candidates,
            }
        }

        pub fn voter_account(&self) -> VoterAccount {
            Account::new(AccountKind::Voter, self.voter.id)
                .as_voter()
                .unwrap()
        }

        /// Register another eligible voter and return their account.
        pub async fn add_voter(&self, n: u32) -> VoterAccount {
            let voter = Voter::example_numbered(n);
            self.store.insert_voter(&voter).await.unwrap();
            Account::new(AccountKind::Voter, voter.id)
                .as_voter()
                .unwrap()
        }
    }
}
