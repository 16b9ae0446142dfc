use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A well-formed sealed value (zero nonce, zero body) that no key opens. Login runs
/// `matches` against it for unknown usernames so both failure paths pay for a GCM check.
pub const DECOY_CIPHERTEXT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// CodecError
///
/// Failures of the password codec. Login never surfaces these to the caller:
/// a ciphertext that cannot be opened is treated exactly like a wrong password.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext is not valid base64")]
    Encoding,
    #[error("ciphertext is too short")]
    Truncated,
    #[error("decryption failed")]
    Decrypt,
    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// CredentialCodec
///
/// Reversible encryption of account passwords at rest (AES-256-GCM).
///
/// The key is the SHA-256 digest of the `PASS_SEC` secret. Every call to
/// `encrypt` draws a fresh random nonce, so the same password never produces
/// the same ciphertext twice. The stored form is base64(`nonce || ciphertext`).
///
/// Rotating `PASS_SEC` makes every stored password unrecoverable.
#[derive(Clone)]
pub struct CredentialCodec {
    cipher: Aes256Gcm,
}

impl CredentialCodec {
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Encrypts a plaintext password into its storable string form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CodecError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(sealed))
    }

    /// Decrypts a stored ciphertext back into the plaintext password.
    ///
    /// Fails on malformed input and on a key mismatch (the GCM tag will not verify).
    pub fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>, CodecError> {
        let sealed = STANDARD
            .decode(ciphertext)
            .map_err(|_| CodecError::Encoding)?;

        if sealed.len() <= NONCE_SIZE {
            return Err(CodecError::Truncated);
        }

        let (nonce_bytes, body) = sealed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|_| CodecError::Decrypt)?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| CodecError::Utf8)
    }

    /// matches
    ///
    /// The comparison path used at login: opens the stored ciphertext and compares
    /// it with the candidate in constant time. Any decryption failure is a mismatch.
    pub fn matches(&self, ciphertext: &str, candidate: &str) -> bool {
        match self.decrypt(ciphertext) {
            Ok(stored) => stored.as_bytes().ct_eq(candidate.as_bytes()).into(),
            Err(e) => {
                tracing::debug!("stored credential could not be opened: {}", e);
                false
            }
        }
    }
}
