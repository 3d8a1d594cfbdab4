//! Reversible secret store for datasource credentials
//!
//! Encrypted secrets carry the `ENC:` prefix followed by base64(nonce || ciphertext),
//! sealed with AES-256-GCM under a key derived from the configured passphrase.

use crate::contract::EngineError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Marker prefix of an encrypted secret
pub const ENCRYPTED_PREFIX: &str = "ENC:";

const NONCE_LEN: usize = 12;

pub fn is_encrypted(stored: &str) -> bool {
    stored.starts_with(ENCRYPTED_PREFIX)
}

/// Reversible encryption of stored credentials
pub trait SecretCipher: Send + Sync {
    /// Seal a plain secret; the result carries the encryption prefix
    fn encrypt(&self, plain: &str) -> Result<String, EngineError>;

    /// Open a sealed payload (prefix already stripped)
    fn decrypt(&self, sealed: &str) -> Result<String, EngineError>;

    /// Return the usable secret: prefixed values are decrypted, others pass through
    fn reveal(&self, stored: &str) -> Result<String, EngineError> {
        match stored.strip_prefix(ENCRYPTED_PREFIX) {
            Some(sealed) => self.decrypt(sealed),
            None => Ok(stored.to_string()),
        }
    }
}

/// AES-256-GCM cipher keyed by SHA-256 of a passphrase
pub struct AesGcmSecretCipher {
    key: [u8; 32],
}

impl AesGcmSecretCipher {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, EngineError> {
        Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| EngineError::Internal(format!("invalid secret key: {e}")))
    }
}

impl std::fmt::Debug for AesGcmSecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmSecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher for AesGcmSecretCipher {
    fn encrypt(&self, plain: &str) -> Result<String, EngineError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plain.as_bytes())
            .map_err(|e| EngineError::Internal(format!("secret encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(format!("{ENCRYPTED_PREFIX}{}", STANDARD.encode(out)))
    }

    fn decrypt(&self, sealed: &str) -> Result<String, EngineError> {
        let bytes = STANDARD
            .decode(sealed.trim())
            .map_err(|e| EngineError::Validation {
                message: format!("encrypted secret is not valid base64: {e}"),
            })?;
        if bytes.len() <= NONCE_LEN {
            return Err(EngineError::Validation {
                message: "encrypted secret too small".to_string(),
            });
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EngineError::Validation {
                message: "encrypted secret could not be decrypted".to_string(),
            })?;
        String::from_utf8(plain).map_err(|_| EngineError::Validation {
            message: "decrypted secret is not valid UTF-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_reveal() {
        let cipher = AesGcmSecretCipher::from_passphrase("correct horse");
        let sealed = cipher.encrypt("s3cr3t").unwrap();
        assert!(is_encrypted(&sealed));
        assert!(!sealed.contains("s3cr3t"));
        assert_eq!(cipher.reveal(&sealed).unwrap(), "s3cr3t");
    }

    #[test]
    fn plain_secrets_pass_through() {
        let cipher = AesGcmSecretCipher::from_passphrase("k");
        assert_eq!(cipher.reveal("plain").unwrap(), "plain");
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let sealed = AesGcmSecretCipher::from_passphrase("a").encrypt("x").unwrap();
        let err = AesGcmSecretCipher::from_passphrase("b")
            .reveal(&sealed)
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
    }

    #[test]
    fn nonces_differ_per_encryption() {
        let cipher = AesGcmSecretCipher::from_passphrase("k");
        assert_ne!(cipher.encrypt("x").unwrap(), cipher.encrypt("x").unwrap());
    }
}
