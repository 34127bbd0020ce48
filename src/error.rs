use jsonwebtoken::errors::Error as JwtError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request, Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::RequestId;
use crate::store::StoreError;
use crate::voting::cipher::CipherError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Ineligible voter: {0}")]
    IneligibleVoter(String),
    #[error("Election phase error: {0}")]
    ElectionPhase(String),
    #[error("Candidate mismatch: {0}")]
    CandidateMismatch(String),
    #[error("Duplicate vote: {0}")]
    DuplicateVote(String),
    #[error("Ballot not available: {0}")]
    BallotNotAvailable(String),
    #[error("Encryption failure: {0}")]
    Encryption(#[from] CipherError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

impl Error {
    /// Shorthand for a `NotFound` error about the described entity.
    pub fn not_found(what: impl AsRef<str>) -> Self {
        Self::NotFound(format!("{} not found", what.as_ref()))
    }

    /// The stable, machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::IneligibleVoter(_) => ErrorKind::IneligibleVoter,
            Self::ElectionPhase(_) => ErrorKind::ElectionPhase,
            Self::CandidateMismatch(_) => ErrorKind::CandidateMismatch,
            Self::DuplicateVote(_) => ErrorKind::DuplicateVote,
            Self::BallotNotAvailable(_) => ErrorKind::BallotNotAvailable,
            Self::Encryption(_) => ErrorKind::EncryptionFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) | Self::Jwt(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self.kind() {
            ErrorKind::Validation
            | ErrorKind::ElectionPhase
            | ErrorKind::CandidateMismatch
            | ErrorKind::BallotNotAvailable => Status::BadRequest,
            ErrorKind::IneligibleVoter | ErrorKind::Forbidden => Status::Forbidden,
            ErrorKind::DuplicateVote => Status::Conflict,
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Unauthorized => Status::Unauthorized,
            ErrorKind::EncryptionFailure | ErrorKind::Internal => Status::InternalServerError,
        }
    }

    /// The message shown to clients. Internal failures are deliberately opaque:
    /// the details are logged, never returned.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg)
            | Self::IneligibleVoter(msg)
            | Self::ElectionPhase(msg)
            | Self::CandidateMismatch(msg)
            | Self::DuplicateVote(msg)
            | Self::BallotNotAvailable(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::Jwt(_) => "Invalid or expired authentication token".to_string(),
            Self::Encryption(_) => {
                "The vote could not be recorded securely; please contact support".to_string()
            }
            Self::Store(_) => "Internal server error".to_string(),
        }
    }
}

/// Stable error kinds, as reported in the `kind` field of error responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    IneligibleVoter,
    ElectionPhase,
    CandidateMismatch,
    DuplicateVote,
    BallotNotAvailable,
    EncryptionFailure,
    NotFound,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    /// What the caller should do about an error of this kind.
    pub fn disposition(self) -> Disposition {
        match self {
            Self::ElectionPhase | Self::BallotNotAvailable => Disposition::RetryLater,
            Self::EncryptionFailure | Self::Internal => Disposition::ContactSupport,
            _ => Disposition::DoNotRetry,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    RetryLater,
    DoNotRetry,
    ContactSupport,
}

/// The JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    pub disposition: Disposition,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let kind = err.kind();
        Self {
            kind,
            message: err.public_message(),
            disposition: kind.disposition(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = req.local_cache(RequestId::next);
        if status.code >= 500 {
            error!("req{id}: {self}");
        } else {
            debug!("req{id}: {self}");
        }
        let body = ErrorBody::from(&self);
        Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_opaque() {
        let err = Error::Encryption(CipherError::Aead);
        let body = ErrorBody::from(&err);
        assert_eq!(body.kind, ErrorKind::EncryptionFailure);
        assert_eq!(body.disposition, Disposition::ContactSupport);
        assert!(!body.message.contains("aead"));
        assert_eq!(err.status(), Status::InternalServerError);
    }

    #[test]
    fn dispositions() {
        assert_eq!(
            ErrorKind::ElectionPhase.disposition(),
            Disposition::RetryLater
        );
        assert_eq!(
            ErrorKind::DuplicateVote.disposition(),
            Disposition::DoNotRetry
        );
        assert_eq!(
            ErrorKind::CandidateMismatch.disposition(),
            Disposition::DoNotRetry
        );
        assert_eq!(
            Error::DuplicateVote("again".to_string()).status(),
            Status::Conflict
        );
        assert_eq!(
            Error::not_found("Vote 'x'").public_message(),
            "Vote 'x' not found"
        );
    }
}
