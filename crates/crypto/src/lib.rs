//! Crypto-shredding for event payloads.
//!
//! Designated fields of an event are encrypted under a key owned by a data
//! subject. Destroying that key makes every ciphertext written under it
//! unrecoverable, which is how a subject is forgotten in an append-only log.

pub mod codec;
pub mod error;
pub mod key;

pub use codec::{CryptoShreddingCodec, Decryption, FieldEncryption};
pub use error::{CryptoError, Result};
pub use key::{EncryptionKey, InMemoryKeyStore, KeyStore};
