//! Audit exports: a self-contained dump of an election's votes that can be
//! checked offline by anyone holding the vote secret.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::account::StaffAccount, db::vote::Vote, mongodb::Id};
use crate::store::Store;

use super::{cipher::VoteCipher, verifier::payload_matches};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditExport {
    pub election_id: String,
    pub election_title: String,
    pub exported_at: DateTime<Utc>,
    pub votes: Vec<AuditRecord>,
}

/// One vote, with its references resolved to the identities sealed in its
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub vote_id: String,
    pub voter_number: String,
    pub election_id: String,
    pub candidate_id: String,
    pub encrypted_payload: String,
    pub cast_at: DateTime<Utc>,
    pub verified: bool,
}

impl AuditRecord {
    /// Check the sealed payload against the record's identities.
    pub fn verify(&self, cipher: &VoteCipher) -> bool {
        payload_matches(
            cipher,
            &self.encrypted_payload,
            &self.voter_number,
            &self.election_id,
            &self.candidate_id,
        )
    }
}

/// Outcome of checking every record of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub verified: usize,
    /// IDs of the votes that failed.
    pub failed: Vec<String>,
}

impl AuditReport {
    pub fn all_verified(&self) -> bool {
        self.failed.is_empty()
    }
}

impl AuditExport {
    /// Verify every record offline.
    pub fn audit(&self, cipher: &VoteCipher) -> AuditReport {
        let mut report = AuditReport::default();
        for record in &self.votes {
            if record.verify(cipher) {
                report.verified += 1;
            } else {
                report.failed.push(record.vote_id.clone());
            }
        }
        report
    }
}

/// Export every vote of an election, oldest first.
pub async fn export(
    store: &dyn Store,
    staff: &StaffAccount,
    election_id: Id,
    now: DateTime<Utc>,
) -> Result<AuditExport> {
    let election = store
        .election(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;

    let votes = store.votes_in_election(election.id).await?;
    let mut records = Vec::with_capacity(votes.len());
    for vote in votes {
        let voter_number = match store.voter(vote.voter_id).await? {
            Some(voter) => voter.voter_number,
            None => {
                warn!("Vote {} refers to missing voter {}", vote.id, vote.voter_id);
                String::new()
            }
        };
        records.push(record(vote, voter_number));
    }

    info!(
        "{} {} exported {} votes of election {election_id}",
        staff.account().kind(),
        staff.account().id(),
        records.len()
    );
    Ok(AuditExport {
        election_id: election.id.to_hex(),
        election_title: election.title,
        exported_at: now,
        votes: records,
    })
}

fn record(vote: Vote, voter_number: String) -> AuditRecord {
    AuditRecord {
        vote_id: vote.id.to_hex(),
        voter_number,
        election_id: vote.election_id.to_hex(),
        candidate_id: vote.candidate_id.to_hex(),
        encrypted_payload: vote.encrypted_payload,
        cast_at: vote.cast_at,
        verified: vote.verified,
    }
}
