//! Encrypted session storage
//!
//! The platform API token is kept on disk between launches so the messaging
//! centre can resume without a fresh sign-in. Tokens are encrypted at rest
//! with AES-256-GCM; the key is derived with Argon2id from a per-install
//! random secret plus the OS username.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, ParamsBuilder};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::types::error::{Result, SparkError};
use crate::types::Session;

/// Application-specific salt for key derivation
const APP_SALT: &[u8] = b"sparkmate.v1.session.salt";

/// Nonce size for AES-GCM (96 bits / 12 bytes)
const NONCE_SIZE: usize = 12;

/// Size of the per-install random secret
const INSTALL_SECRET_SIZE: usize = 32;

fn storage_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .ok_or_else(|| SparkError::Credential("Could not determine data directory".to_string()))?
        .join("sparkmate");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn session_path() -> Result<PathBuf> {
    Ok(storage_dir()?.join("session.enc"))
}

fn install_secret_path() -> Result<PathBuf> {
    Ok(storage_dir()?.join("install.key"))
}

/// Session store: encrypts and persists the active [`Session`].
pub struct SessionStore {
    cipher: Aes256Gcm,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        let key = derive_key()?;
        let cipher = Aes256Gcm::new(&key.into());
        debug!("Initialised session encryption");
        Ok(Self { cipher })
    }

    /// Persist a session, replacing any previous one.
    pub fn store(&self, session: &Session) -> Result<()> {
        let plaintext = serde_json::to_string(session)?;
        let encrypted = self.encrypt(&plaintext)?;
        fs::write(session_path()?, encrypted)?;
        info!("Stored session for user {}", session.user.user_id);
        Ok(())
    }

    /// Load the persisted session, if any. A corrupt or undecryptable file
    /// is treated as "no session" so a stale install never blocks sign-in.
    pub fn load(&self) -> Option<Session> {
        let path = session_path().ok()?;
        let raw = fs::read_to_string(path).ok()?;
        let plaintext = self.decrypt(raw.trim()).ok()?;
        serde_json::from_str(&plaintext).ok()
    }

    /// Remove the persisted session. Idempotent.
    pub fn clear(&self) -> Result<()> {
        let path = session_path()?;
        if path.exists() {
            fs::remove_file(path)?;
            info!("Cleared stored session");
        }
        Ok(())
    }

    /// Encrypt a plaintext string.
    ///
    /// Returns a base64-encoded string containing: nonce || ciphertext
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        use aes_gcm::aead::rand_core::RngCore;
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| SparkError::Credential(format!("Encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a base64-encoded nonce || ciphertext string.
    fn decrypt(&self, encoded: &str) -> Result<String> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|e| SparkError::Credential(format!("Invalid encrypted data: {}", e)))?;

        if combined.len() <= NONCE_SIZE {
            return Err(SparkError::Credential(
                "Encrypted data too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SparkError::Credential(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| SparkError::Credential(format!("Invalid UTF-8 in session: {}", e)))
    }
}

/// Derive the encryption key from the per-install secret and OS username.
fn derive_key() -> Result<[u8; 32]> {
    let secret = load_or_create_install_secret()?;

    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "default".to_string());

    let mut key_material = Vec::new();
    key_material.extend_from_slice(&secret);
    key_material.extend_from_slice(username.as_bytes());
    key_material.extend_from_slice(APP_SALT);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MiB memory
        .t_cost(3)
        .p_cost(4)
        .build()
        .map_err(|e| SparkError::Credential(format!("Failed to build Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output_key = [0u8; 32];
    argon2
        .hash_password_into(&key_material, APP_SALT, &mut output_key)
        .map_err(|e| SparkError::Credential(format!("Key derivation failed: {}", e)))?;

    Ok(output_key)
}

/// The per-install secret ties stored sessions to this installation without
/// needing a hardware identifier.
fn load_or_create_install_secret() -> Result<Vec<u8>> {
    let path = install_secret_path()?;

    if let Ok(encoded) = fs::read_to_string(&path) {
        if let Ok(secret) = BASE64.decode(encoded.trim()) {
            if secret.len() == INSTALL_SECRET_SIZE {
                return Ok(secret);
            }
        }
    }

    let mut secret = vec![0u8; INSTALL_SECRET_SIZE];
    rand::Rng::fill(&mut rand::thread_rng(), &mut secret[..]);
    fs::write(&path, BASE64.encode(&secret))?;
    info!("Created new install secret");
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::KeyInit;

    fn test_store() -> SessionStore {
        // Fixed key; no filesystem involved for the crypto round-trips.
        let key = [7u8; 32];
        SessionStore {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let store = test_store();
        let encrypted = store.encrypt("super-secret-token").unwrap();
        assert_ne!(encrypted, "super-secret-token");
        assert_eq!(store.decrypt(&encrypted).unwrap(), "super-secret-token");
    }

    #[test]
    fn unique_nonce_per_encryption() {
        let store = test_store();
        let a = store.encrypt("token").unwrap();
        let b = store.encrypt("token").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_garbage() {
        let store = test_store();
        assert!(store.decrypt("not base64 at all!").is_err());
        assert!(store.decrypt(&BASE64.encode(b"short")).is_err());
    }
}
