//! User identity and the symmetric encryption applied to stored data.
//!
//! An identity provider knows who the user is on one backend and can
//! encrypt data for them. The first provider to log on becomes the
//! primary provider; its identifier prefixes every local storage key.

use crate::error::StorageError;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::{Arc, RwLock};

/// Length of the AES-GCM nonce prepended to each ciphertext.
const NONCE_LEN: usize = 12;

/// Identity of the current user on one backend.
pub trait IdentityProvider: Send + Sync {
    /// Stable identifier of the user on this backend, usable as a
    /// storage key prefix.
    fn identifier(&self) -> String;

    fn is_authenticated(&self) -> bool;

    fn encrypt(&self, plaintext: &str) -> Result<String, StorageError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, StorageError>;
}

/// Password-based identity: the identifier is the SHA-256 hash of the
/// password, and stored data is encrypted with AES-256-GCM under a key
/// derived from the same digest. The password itself never leaves memory.
pub struct PasswordIdentity {
    key: [u8; 32],
    identifier: String,
}

impl PasswordIdentity {
    pub fn new(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self {
            key,
            identifier: hex::encode(digest),
        }
    }
}

impl IdentityProvider for PasswordIdentity {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, StorageError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| StorageError::Decrypt)?;
        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(hex::encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, StorageError> {
        let blob = hex::decode(ciphertext).map_err(|_| StorageError::Decrypt)?;
        if blob.len() < NONCE_LEN {
            return Err(StorageError::Decrypt);
        }
        let (nonce, payload) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), payload)
            .map_err(|_| StorageError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| StorageError::Decrypt)
    }
}

/// Tracks the providers the user has logged on with.
///
/// The first successful provider becomes the primary one and stays
/// primary until logoff.
#[derive(Default)]
pub struct IdentityService {
    providers: RwLock<Vec<Arc<dyn IdentityProvider>>>,
    primary: RwLock<Option<Arc<dyn IdentityProvider>>>,
}

impl IdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider. Returns false when the provider is not
    /// authenticated.
    pub fn logon(&self, provider: Arc<dyn IdentityProvider>) -> bool {
        if !provider.is_authenticated() {
            return false;
        }
        self.providers.write().expect("identity lock").push(provider.clone());
        let mut primary = self.primary.write().expect("identity lock");
        if primary.is_none() {
            *primary = Some(provider);
        }
        true
    }

    pub fn logoff(&self) {
        self.providers.write().expect("identity lock").clear();
        *self.primary.write().expect("identity lock") = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.primary
            .read()
            .expect("identity lock")
            .as_ref()
            .map(|p| p.is_authenticated())
            .unwrap_or(false)
    }

    pub fn primary(&self) -> Option<Arc<dyn IdentityProvider>> {
        self.primary.read().expect("identity lock").clone()
    }

    /// The primary provider, or `NotAuthenticated`.
    pub fn require_primary(&self) -> Result<Arc<dyn IdentityProvider>, StorageError> {
        self.primary().ok_or(StorageError::NotAuthenticated)
    }
}
