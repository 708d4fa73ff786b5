//! Election keys and sealed ballots.
//!
//! Ballots submitted through the external ledger are sealed to the election's
//! X25519 public key. The matching private key is kept in the secret store,
//! locked under a passphrase. Everything crossing a text boundary is armored.

use rocket::serde::json::serde_json;
use thiserror::Error;

mod armor;
mod ballot;
mod keys;

pub use armor::{armor, dearmor};
pub use ballot::{open_ballot, seal_ballot, BALLOT_LABEL};
pub use keys::{ElectionPrivateKey, ElectionPublicKey, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Malformed armor: {0}")]
    Armor(String),
    #[error(transparent)]
    Base64(#[from] data_encoding::DecodeError),
    #[error("Key derivation failed: {0}")]
    Kdf(#[from] argon2::Error),
    #[error("Authentication failed: wrong key or corrupted data")]
    Aead,
    #[error("Malformed key: {0}")]
    Key(String),
    #[error("Malformed ballot payload: {0}")]
    Payload(#[from] serde_json::Error),
}
