use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chacha20poly1305::{ChaCha20Poly1305, Key, aead::KeyInit};
use common::AggregateId;
use rand::{RngCore, rngs::OsRng};
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Key size for ChaCha20-Poly1305 (256 bits).
pub const KEY_SIZE: usize = 32;

/// Symmetric key owned by one data subject.
///
/// Key material is zeroized when the last copy is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generates a fresh key from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub(crate) fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Storage for per-subject encryption keys.
///
/// Destruction is irreversible: once a subject's key is destroyed, the store
/// keeps a tombstone and refuses to issue a new key for that subject.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Returns the subject's key, creating one on first use.
    ///
    /// Fails with [`CryptoError::KeyDestroyed`] for a forgotten subject.
    async fn get_or_create_key(&self, subject: AggregateId) -> Result<EncryptionKey>;

    /// Returns the subject's key, or None if it was never created or has
    /// been destroyed.
    async fn get_key(&self, subject: AggregateId) -> Result<Option<EncryptionKey>>;

    /// Destroys the subject's key. Idempotent.
    async fn destroy_key(&self, subject: AggregateId) -> Result<()>;

    /// Returns true if the subject currently has a usable key.
    async fn has_key(&self, subject: AggregateId) -> Result<bool>;
}

#[derive(Debug)]
enum KeyRecord {
    Active(EncryptionKey),
    Destroyed,
}

/// In-memory key store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<AggregateId, KeyRecord>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the subject's key was destroyed.
    pub async fn is_destroyed(&self, subject: AggregateId) -> bool {
        matches!(
            self.keys.read().await.get(&subject),
            Some(KeyRecord::Destroyed)
        )
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get_or_create_key(&self, subject: AggregateId) -> Result<EncryptionKey> {
        if let Some(record) = self.keys.read().await.get(&subject) {
            return match record {
                KeyRecord::Active(key) => Ok(key.clone()),
                KeyRecord::Destroyed => Err(CryptoError::KeyDestroyed(subject)),
            };
        }

        let mut keys = self.keys.write().await;
        // Another writer may have won the race between the two locks.
        match keys
            .entry(subject)
            .or_insert_with(|| KeyRecord::Active(EncryptionKey::generate()))
        {
            KeyRecord::Active(key) => {
                tracing::debug!(%subject, "encryption key ready");
                Ok(key.clone())
            }
            KeyRecord::Destroyed => Err(CryptoError::KeyDestroyed(subject)),
        }
    }

    async fn get_key(&self, subject: AggregateId) -> Result<Option<EncryptionKey>> {
        match self.keys.read().await.get(&subject) {
            Some(KeyRecord::Active(key)) => Ok(Some(key.clone())),
            _ => Ok(None),
        }
    }

    async fn destroy_key(&self, subject: AggregateId) -> Result<()> {
        let previous = self
            .keys
            .write()
            .await
            .insert(subject, KeyRecord::Destroyed);

        if matches!(previous, Some(KeyRecord::Active(_))) {
            metrics::counter!("crypto_keys_destroyed").increment(1);
            tracing::info!(%subject, "encryption key destroyed");
        }
        Ok(())
    }

    async fn has_key(&self, subject: AggregateId) -> Result<bool> {
        Ok(matches!(
            self.keys.read().await.get(&subject),
            Some(KeyRecord::Active(_))
        ))
    }
}
