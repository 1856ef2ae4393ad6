//! Machine-bound symmetric encryption for credential records.

use aes_gcm::aead::generic_array::{typenum, GenericArray};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Vault header marker, kept for format identification even though there is
/// no password component to name in it.
const VAULT_HEADER: &str = "$MOLECTL_VAULT;1.0;AES256";

/// Fixed namespace folded into the key derivation so the same hostname and
/// username pair used for some other purpose can't collide with this one.
const KEY_NAMESPACE: &str = "molectl.credentials.v1";

/// A vault bound to a specific machine identity, used to encrypt and decrypt
/// credential records.
pub struct Vault {
    key: GenericArray<u8, typenum::U32>,
}

impl Vault {
    /// Builds a vault for the current machine, deriving the key from the
    /// local hostname and username.
    pub fn for_current_machine() -> Result<Self> {
        let hostname = hostname::get()
            .map_err(|e| Error::KeyDerivation(format!("failed to read hostname: {e}")))?
            .to_string_lossy()
            .into_owned();
        let username = whoami_username()?;
        Self::new(&hostname, &username)
    }

    /// Builds a vault from an explicit (hostname, username) pair. Exposed for
    /// testing key determinism without depending on the actual machine.
    pub fn new(hostname: &str, username: &str) -> Result<Self> {
        if hostname.is_empty() || username.is_empty() {
            return Err(Error::KeyDerivation(
                "hostname and username must both be non-empty".into(),
            ));
        }
        let material = format!("{hostname}:{username}:{KEY_NAMESPACE}");
        let digest = Sha256::digest(material.as_bytes());
        Ok(Self {
            key: GenericArray::clone_from_slice(&digest),
        })
    }

    /// Encrypts plaintext, returning a header-prefixed base64 blob.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce_bytes: [u8; 12] = rand::random();
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::CredentialEncryption {
                name: String::new(),
                message: e.to_string(),
            })?;

        let mut blob = Vec::with_capacity(12 + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);

        Ok(format!("{}\n{}", VAULT_HEADER, BASE64.encode(&blob)))
    }

    /// Decrypts a blob produced by [`Vault::encrypt`].
    pub fn decrypt(&self, content: &str) -> Result<Vec<u8>> {
        let mut lines = content.lines();
        let header = lines.next().unwrap_or_default();
        if !header.starts_with("$MOLECTL_VAULT") {
            return Err(Error::CredentialDecryption {
                name: String::new(),
                message: "not a molectl vault blob".into(),
            });
        }

        let body: String = lines.collect();
        let blob = BASE64
            .decode(body.trim())
            .map_err(|e| Error::CredentialDecryption {
                name: String::new(),
                message: format!("base64 decode failed: {e}"),
            })?;

        if blob.len() < 12 {
            return Err(Error::CredentialDecryption {
                name: String::new(),
                message: "truncated ciphertext".into(),
            });
        }
        let (nonce_bytes, ciphertext) = blob.split_at(12);
        let nonce = GenericArray::from_slice(nonce_bytes);

        let cipher = Aes256Gcm::new(&self.key);
        cipher.decrypt(nonce, ciphertext).map_err(|_| Error::CredentialDecryption {
            name: String::new(),
            message: "authentication failed (wrong machine identity or corrupted file)".into(),
        })
    }
}

fn whoami_username() -> Result<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .map_err(|_| Error::KeyDerivation("could not determine current username".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_plaintext() {
        let vault = Vault::new("build-host", "ci").unwrap();
        let plaintext = b"s3cr3t-token!@#";
        let encrypted = vault.encrypt(plaintext).unwrap();
        let decrypted = vault.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn fails_to_decrypt_with_mismatched_key() {
        let a = Vault::new("host-a", "alice").unwrap();
        let b = Vault::new("host-b", "bob").unwrap();
        let encrypted = a.encrypt(b"hello").unwrap();
        assert!(b.decrypt(&encrypted).is_err());
    }

    #[test]
    fn key_derivation_is_deterministic() {
        let a = Vault::new("host", "user").unwrap();
        let b = Vault::new("host", "user").unwrap();
        assert_eq!(a.key, b.key);
    }

    #[test]
    fn rejects_empty_components() {
        assert!(Vault::new("", "user").is_err());
        assert!(Vault::new("host", "").is_err());
    }

    #[test]
    fn rejects_malformed_blob() {
        let vault = Vault::new("host", "user").unwrap();
        assert!(vault.decrypt("not a vault blob").is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trip_holds_for_arbitrary_bytes(bytes in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let vault = Vault::new("host", "user").unwrap();
            let encrypted = vault.encrypt(&bytes).unwrap();
            let decrypted = vault.decrypt(&encrypted).unwrap();
            proptest::prop_assert_eq!(decrypted, bytes);
        }
    }
}
