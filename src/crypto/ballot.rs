use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hmac::{Hmac, Mac};
use rocket::serde::json::serde_json;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::crypto::{armor, dearmor, CryptoError, ElectionPrivateKey, ElectionPublicKey};
use crate::model::common::voter::{Origin, VoterRecord};

pub const BALLOT_LABEL: &str = "LIQUID BALLOT";

const KDF_CONTEXT: &[u8] = b"liquid-ballot-v1";
const PUBLIC_LEN: usize = 32;
const NONCE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

/// Seal a voter record to an election's public key.
///
/// The armored body is `ephemeral public key || nonce || ciphertext`.
pub fn seal_ballot(
    record: &VoterRecord,
    election_key: &ElectionPublicKey,
) -> Result<String, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_public = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(election_key.as_x25519());

    let cipher = ballot_cipher(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        election_key.as_x25519().as_bytes(),
    )?;
    let nonce: [u8; NONCE_LEN] = rand::random();
    let plaintext = serde_json::to_vec(record)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| CryptoError::Aead)?;

    let mut bytes = Vec::with_capacity(PUBLIC_LEN + NONCE_LEN + ciphertext.len());
    bytes.extend_from_slice(ephemeral_public.as_bytes());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&ciphertext);
    Ok(armor(BALLOT_LABEL, &bytes))
}

/// Open a sealed ballot with the election's private key.
///
/// The returned record is always marked as coming from the ledger, whatever
/// the sealed payload claimed.
pub fn open_ballot(armored: &str, election_key: &ElectionPrivateKey) -> Result<VoterRecord, CryptoError> {
    let bytes = dearmor(BALLOT_LABEL, armored)?;
    if bytes.len() < PUBLIC_LEN + NONCE_LEN {
        return Err(CryptoError::Armor("ballot is too short".to_string()));
    }
    let (ephemeral_public, rest) = bytes.split_at(PUBLIC_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let mut public = [0; PUBLIC_LEN];
    public.copy_from_slice(ephemeral_public);
    let shared = election_key.diffie_hellman(&PublicKey::from(public));

    let cipher = ballot_cipher(
        shared.as_bytes(),
        ephemeral_public,
        election_key.public_key().as_x25519().as_bytes(),
    )?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Aead)?;

    let mut record: VoterRecord = serde_json::from_slice(&plaintext)?;
    record.origin = Some(Origin::Ledger);
    Ok(record)
}

/// Derive the per-ballot cipher, binding both public keys into the key.
fn ballot_cipher(
    shared: &[u8],
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> Result<ChaCha20Poly1305, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(KDF_CONTEXT)
        .map_err(|e| CryptoError::Key(e.to_string()))?;
    mac.update(shared);
    mac.update(ephemeral_public);
    mac.update(recipient_public);
    let key = mac.finalize().into_bytes();
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}
