use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};

use crate::crypto::{armor, dearmor, CryptoError};

pub const PUBLIC_KEY_LABEL: &str = "LIQUID ELECTION PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "LIQUID ELECTION PRIVATE KEY";

/// Leading byte of a locked private key, bumped if the layout ever changes.
const LOCKED_KEY_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// The public half of an election keypair. Voters seal ledger ballots to this.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElectionPublicKey(PublicKey);

impl ElectionPublicKey {
    pub fn to_armored(&self) -> String {
        armor(PUBLIC_KEY_LABEL, self.0.as_bytes())
    }

    pub fn from_armored(armored: &str) -> Result<Self, CryptoError> {
        let bytes = dearmor(PUBLIC_KEY_LABEL, armored)?;
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::Key("public key must be 32 bytes".to_string()))?;
        Ok(Self(PublicKey::from(bytes)))
    }

    pub(super) fn as_x25519(&self) -> &PublicKey {
        &self.0
    }
}

/// The private half of an election keypair. Only the tally ever unlocks this.
pub struct ElectionPrivateKey(StaticSecret);

impl ElectionPrivateKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    pub fn public_key(&self) -> ElectionPublicKey {
        ElectionPublicKey(PublicKey::from(&self.0))
    }

    /// Encrypt this key under `passphrase` and armor the result, ready for the secret store.
    pub fn lock(&self, passphrase: &str) -> Result<String, CryptoError> {
        let salt: [u8; SALT_LEN] = rand::random();
        let nonce: [u8; NONCE_LEN] = rand::random();
        let cipher = lock_cipher(passphrase, &salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), self.0.to_bytes().as_slice())
            .map_err(|_| CryptoError::Aead)?;

        let mut bytes = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + ciphertext.len());
        bytes.push(LOCKED_KEY_VERSION);
        bytes.extend_from_slice(&salt);
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&ciphertext);
        Ok(armor(PRIVATE_KEY_LABEL, &bytes))
    }

    /// Recover a key produced by [`ElectionPrivateKey::lock`].
    /// A wrong passphrase fails authentication rather than yielding a bad key.
    pub fn unlock(armored: &str, passphrase: &str) -> Result<Self, CryptoError> {
        let bytes = dearmor(PRIVATE_KEY_LABEL, armored)?;
        let (version, rest) = bytes
            .split_first()
            .ok_or_else(|| CryptoError::Key("empty private key".to_string()))?;
        if *version != LOCKED_KEY_VERSION {
            return Err(CryptoError::Key(format!(
                "unsupported private key version {version}"
            )));
        }
        if rest.len() < SALT_LEN + NONCE_LEN {
            return Err(CryptoError::Key("truncated private key".to_string()));
        }
        let (salt, rest) = rest.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let cipher = lock_cipher(passphrase, salt)?;
        let secret = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Aead)?;
        let secret: [u8; KEY_LEN] = secret
            .try_into()
            .map_err(|_| CryptoError::Key("private key must be 32 bytes".to_string()))?;
        Ok(Self(StaticSecret::from(secret)))
    }

    pub(super) fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
        self.0.diffie_hellman(their_public)
    }
}

/// Derive the cipher protecting a locked key from its passphrase.
fn lock_cipher(passphrase: &str, salt: &[u8]) -> Result<ChaCha20Poly1305, CryptoError> {
    let config = argon2::Config {
        hash_length: KEY_LEN as u32,
        ..argon2::Config::default()
    };
    let key = argon2::hash_raw(passphrase.as_bytes(), salt, &config)?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key)))
}
