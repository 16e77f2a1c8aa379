use common::AggregateId;
use thiserror::Error;

/// Errors raised while encrypting or decrypting event fields.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The subject was forgotten; a new key must never be issued for it.
    #[error("Encryption key for subject {0} has been destroyed")]
    KeyDestroyed(AggregateId),

    /// The payload does not carry the field naming the key owner.
    #[error("Key identifier field '{0}' is missing from the payload")]
    MissingKeyIdentifier(String),

    /// The key identifier field does not hold a subject id.
    #[error("Key identifier field '{field}' holds an invalid subject id: {value}")]
    InvalidKeyIdentifier { field: String, value: String },

    /// The stored value of an encrypted field cannot be decoded.
    #[error("Malformed ciphertext in field '{field}': {reason}")]
    MalformedCiphertext { field: String, reason: String },

    /// Authentication failed: the ciphertext was altered or the key is wrong.
    #[error("Failed to decrypt field '{0}'")]
    Decryption(String),

    #[error("Failed to encrypt field '{0}'")]
    Encryption(String),

    /// The key store backend could not complete the operation.
    #[error("Key store unavailable: {0}")]
    KeyStoreUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
