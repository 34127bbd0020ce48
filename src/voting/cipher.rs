//! Symmetric encryption of vote payloads at rest.
//!
//! The key is derived once from the configured secret with Argon2id and a
//! fixed, domain-separating salt, so the same secret always yields the same
//! key. Each payload gets a fresh random nonce; the stored form is
//! `base64(nonce || AES-256-GCM ciphertext)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Config as Argon2Config, Variant};
use chrono::{DateTime, Utc};
use data_encoding::BASE64;
use rand::RngCore;
use rocket::serde::json::serde_json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_SALT: &[u8] = b"evoting-backend/vote-payload-key/v1";
const KEY_LEN: u32 = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("the vote encryption secret is empty")]
    EmptySecret,
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] argon2::Error),
    #[error("derived key has the wrong length")]
    KeyLength,
    #[error("payload (de)serialisation failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] data_encoding::DecodeError),
    #[error("ciphertext is too short to contain a nonce")]
    Truncated,
    #[error("authenticated encryption failed")]
    Aead,
}

/// The plaintext sealed inside every stored vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    /// The voter's external voter number.
    pub voter_id: String,
    /// The election ID in hex form.
    pub election_id: String,
    /// The candidate ID in hex form.
    pub candidate_id: String,
    pub cast_at: DateTime<Utc>,
}

/// The process-wide vote cipher. Read-only after construction, so it can be
/// shared between request handlers without locking.
pub struct VoteCipher {
    aead: Aes256Gcm,
}

impl VoteCipher {
    /// Derive the cipher key from a configured secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CipherError> {
        if secret.is_empty() {
            return Err(CipherError::EmptySecret);
        }
        let config = Argon2Config {
            variant: Variant::Argon2id,
            hash_length: KEY_LEN,
            ..Argon2Config::default()
        };
        let key = argon2::hash_raw(secret, KEY_SALT, &config)?;
        let aead = Aes256Gcm::new_from_slice(&key).map_err(|_| CipherError::KeyLength)?;
        Ok(Self { aead })
    }

    /// Seal a payload, returning the storable ciphertext.
    pub fn encrypt(&self, payload: &VotePayload) -> Result<String, CipherError> {
        let plaintext = serde_json::to_vec(payload)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext.as_ref())
            .map_err(|_| CipherError::Aead)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&sealed))
    }

    /// Open a stored ciphertext. Fails on any tampering.
    pub fn decrypt(&self, sealed: &str) -> Result<VotePayload, CipherError> {
        let sealed = BASE64.decode(sealed.as_bytes())?;
        if sealed.len() <= NONCE_LEN {
            return Err(CipherError::Truncated);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Aead)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
