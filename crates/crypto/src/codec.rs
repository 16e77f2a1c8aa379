use std::sync::Arc;

use base64::prelude::*;
use chacha20poly1305::{Nonce, aead::Aead};
use common::AggregateId;
use event_store::EventEnvelope;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CryptoError, EncryptionKey, KeyStore, Result};

/// Prefix marking an encrypted field value.
pub const CIPHERTEXT_PREFIX: &str = "enc:v1:";

/// Metadata key under which the encryption spec is recorded.
pub const ENCRYPTION_METADATA_KEY: &str = "encryption";

/// Nonce size for ChaCha20-Poly1305 (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Declares which payload fields of an event are personal data and which
/// field names the subject owning them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEncryption {
    pub key_identifier_field: String,
    pub encrypted_fields: Vec<String>,
}

impl FieldEncryption {
    pub fn new<I, S>(key_identifier_field: impl Into<String>, encrypted_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_identifier_field: key_identifier_field.into(),
            encrypted_fields: encrypted_fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of decrypting an envelope.
#[derive(Debug, Clone)]
pub enum Decryption {
    /// The event carried no encrypted fields.
    Plain(EventEnvelope),
    /// All encrypted fields were restored.
    Decrypted(EventEnvelope),
    /// The subject was forgotten. The listed fields are now JSON null.
    Redacted {
        envelope: EventEnvelope,
        fields: Vec<String>,
    },
}

impl Decryption {
    pub fn envelope(&self) -> &EventEnvelope {
        match self {
            Self::Plain(envelope) | Self::Decrypted(envelope) => envelope,
            Self::Redacted { envelope, .. } => envelope,
        }
    }

    pub fn into_envelope(self) -> EventEnvelope {
        match self {
            Self::Plain(envelope) | Self::Decrypted(envelope) => envelope,
            Self::Redacted { envelope, .. } => envelope,
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self, Self::Redacted { .. })
    }
}

/// Encrypts and decrypts designated event fields with per-subject keys.
#[derive(Clone)]
pub struct CryptoShreddingCodec {
    keys: Arc<dyn KeyStore>,
}

impl CryptoShreddingCodec {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.keys
    }

    /// Replaces the designated fields with ciphertext and records the field list in
    /// the envelope metadata. Null and absent fields are left untouched.
    pub async fn encrypt_fields(
        &self,
        mut envelope: EventEnvelope,
        spec: &FieldEncryption,
    ) -> Result<EventEnvelope> {
        let subject = key_identifier(&envelope.payload, &spec.key_identifier_field)?;
        let key = self.keys.get_or_create_key(subject).await?;

        if let Some(fields) = fields_mut(&mut envelope.payload) {
            for name in &spec.encrypted_fields {
                let Some(value) = fields.get_mut(name) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                *value = Value::String(seal(&key, name, value)?);
            }
        }

        envelope.metadata.insert(
            ENCRYPTION_METADATA_KEY.to_string(),
            serde_json::to_value(spec)?,
        );
        tracing::trace!(%subject, event_type = %envelope.event_type, "fields encrypted");
        Ok(envelope)
    }

    /// Restores the encrypted fields of an envelope.
    ///
    /// A destroyed key yields [`Decryption::Redacted`]; tampered or otherwise
    /// undecryptable ciphertext is an error.
    pub async fn decrypt_fields(&self, mut envelope: EventEnvelope) -> Result<Decryption> {
        let Some(raw_spec) = envelope.metadata.get(ENCRYPTION_METADATA_KEY) else {
            return Ok(Decryption::Plain(envelope));
        };
        let spec: FieldEncryption = serde_json::from_value(raw_spec.clone())?;

        let subject = key_identifier(&envelope.payload, &spec.key_identifier_field)?;
        let key = self.keys.get_key(subject).await?;

        let Some(fields) = fields_mut(&mut envelope.payload) else {
            return Ok(Decryption::Decrypted(envelope));
        };
        match key {
            Some(key) => {
                for name in &spec.encrypted_fields {
                    if let Some(value) = fields.get_mut(name)
                        && let Value::String(sealed) = value
                    {
                        let restored = open(&key, name, sealed)?;
                        *value = restored;
                    }
                }
                Ok(Decryption::Decrypted(envelope))
            }
            None => {
                let mut redacted = Vec::new();
                for name in &spec.encrypted_fields {
                    if let Some(value) = fields.get_mut(name)
                        && !value.is_null()
                    {
                        *value = Value::Null;
                        redacted.push(name.clone());
                    }
                }
                metrics::counter!("crypto_fields_redacted").increment(redacted.len() as u64);
                tracing::debug!(%subject, fields = ?redacted, "subject forgotten, fields redacted");
                Ok(Decryption::Redacted {
                    envelope,
                    fields: redacted,
                })
            }
        }
    }

    /// Forgets a subject by destroying its key. Irreversible and idempotent.
    pub async fn destroy_key(&self, subject: AggregateId) -> Result<()> {
        self.keys.destroy_key(subject).await
    }
}

/// Events serialized with an adjacent tag keep their fields under `data`.
fn fields(payload: &Value) -> Option<&Map<String, Value>> {
    match payload.get("data") {
        Some(Value::Object(data)) => Some(data),
        _ => payload.as_object(),
    }
}

fn fields_mut(payload: &mut Value) -> Option<&mut Map<String, Value>> {
    let nested = matches!(payload.get("data"), Some(Value::Object(_)));
    let target = if nested {
        payload.get_mut("data")?
    } else {
        payload
    };
    target.as_object_mut()
}

fn key_identifier(payload: &Value, field: &str) -> Result<AggregateId> {
    let value = fields(payload)
        .and_then(|fields| fields.get(field))
        .ok_or_else(|| CryptoError::MissingKeyIdentifier(field.to_string()))?;

    value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| CryptoError::InvalidKeyIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn seal(key: &EncryptionKey, field: &str, value: &Value) -> Result<String> {
    let plaintext = serde_json::to_vec(value)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext.as_slice())
        .map_err(|_| CryptoError::Encryption(field.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(format!("{CIPHERTEXT_PREFIX}{}", BASE64_STANDARD.encode(sealed)))
}

fn open(key: &EncryptionKey, field: &str, sealed: &str) -> Result<Value> {
    let malformed = |reason: &str| CryptoError::MalformedCiphertext {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let encoded = sealed
        .strip_prefix(CIPHERTEXT_PREFIX)
        .ok_or_else(|| malformed("missing ciphertext prefix"))?;
    let bytes = BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| malformed(&e.to_string()))?;
    if bytes.len() <= NONCE_SIZE {
        return Err(malformed("ciphertext too short"));
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
    let plaintext = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Decryption(field.to_string()))?;

    Ok(serde_json::from_slice(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use event_store::Version;
    use serde_json::json;

    use super::*;
    use crate::InMemoryKeyStore;

    fn spec() -> FieldEncryption {
        FieldEncryption::new("submitted_by", ["submission_notes"])
    }

    fn entry_envelope(submitted_by: AggregateId, notes: Value) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Competition")
            .event_type("PhotoEnteredIntoCompetition")
            .version(Version::first())
            .payload_raw(json!({
                "type": "PhotoEnteredIntoCompetition",
                "data": {
                    "photo_id": "photo-1",
                    "submitted_by": submitted_by.to_string(),
                    "submission_notes": notes,
                }
            }))
            .build()
    }

    fn codec() -> (CryptoShreddingCodec, InMemoryKeyStore) {
        let keys = InMemoryKeyStore::new();
        (CryptoShreddingCodec::new(Arc::new(keys.clone())), keys)
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt_restores_plaintext() {
        let (codec, _) = codec();
        let user = AggregateId::new();
        let envelope = entry_envelope(user, json!("shot at dawn"));

        let encrypted = codec.encrypt_fields(envelope, &spec()).await.unwrap();
        let stored = &encrypted.payload["data"]["submission_notes"];
        assert!(stored.as_str().unwrap().starts_with(CIPHERTEXT_PREFIX));
        assert_eq!(encrypted.payload["data"]["photo_id"], "photo-1");
        assert!(encrypted.metadata.contains_key(ENCRYPTION_METADATA_KEY));

        let decrypted = codec.decrypt_fields(encrypted).await.unwrap();
        assert!(matches!(decrypted, Decryption::Decrypted(_)));
        assert_eq!(
            decrypted.envelope().payload["data"]["submission_notes"],
            "shot at dawn"
        );
    }

    #[tokio::test]
    async fn test_key_comes_from_identifier_field_not_aggregate() {
        let (codec, keys) = codec();
        let user = AggregateId::new();
        let envelope = entry_envelope(user, json!("notes"));
        let aggregate_id = envelope.aggregate_id;

        codec.encrypt_fields(envelope, &spec()).await.unwrap();

        assert!(keys.has_key(user).await.unwrap());
        assert!(!keys.has_key(aggregate_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_null_fields_are_left_alone() {
        let (codec, _) = codec();
        let envelope = entry_envelope(AggregateId::new(), Value::Null);

        let encrypted = codec.encrypt_fields(envelope, &spec()).await.unwrap();
        assert!(encrypted.payload["data"]["submission_notes"].is_null());
    }

    #[tokio::test]
    async fn test_destroyed_key_redacts_fields() {
        let (codec, _) = codec();
        let user = AggregateId::new();
        let encrypted = codec
            .encrypt_fields(entry_envelope(user, json!("private")), &spec())
            .await
            .unwrap();

        codec.destroy_key(user).await.unwrap();

        let result = codec.decrypt_fields(encrypted).await.unwrap();
        let Decryption::Redacted { envelope, fields } = result else {
            panic!("expected redaction");
        };
        assert_eq!(fields, vec!["submission_notes".to_string()]);
        assert!(envelope.payload["data"]["submission_notes"].is_null());
        assert_eq!(envelope.payload["data"]["photo_id"], "photo-1");
    }

    #[tokio::test]
    async fn test_forgotten_subject_cannot_be_encrypted_again() {
        let (codec, _) = codec();
        let user = AggregateId::new();
        codec.destroy_key(user).await.unwrap();

        let result = codec
            .encrypt_fields(entry_envelope(user, json!("again")), &spec())
            .await;
        assert!(matches!(result, Err(CryptoError::KeyDestroyed(_))));
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_is_an_error_not_redaction() {
        let (codec, _) = codec();
        let user = AggregateId::new();
        let mut encrypted = codec
            .encrypt_fields(entry_envelope(user, json!("private")), &spec())
            .await
            .unwrap();

        let sealed = encrypted.payload["data"]["submission_notes"]
            .as_str()
            .unwrap()
            .to_string();
        let mut bytes = BASE64_STANDARD
            .decode(sealed.trim_start_matches(CIPHERTEXT_PREFIX))
            .unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        encrypted.payload["data"]["submission_notes"] = Value::String(format!(
            "{CIPHERTEXT_PREFIX}{}",
            BASE64_STANDARD.encode(bytes)
        ));

        let result = codec.decrypt_fields(encrypted).await;
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[tokio::test]
    async fn test_events_without_metadata_pass_through() {
        let (codec, _) = codec();
        let envelope = entry_envelope(AggregateId::new(), json!("clear"));

        let result = codec.decrypt_fields(envelope).await.unwrap();
        assert!(matches!(result, Decryption::Plain(_)));
        assert_eq!(result.envelope().payload["data"]["submission_notes"], "clear");
    }

    #[tokio::test]
    async fn test_missing_identifier_field_is_rejected() {
        let (codec, _) = codec();
        let envelope = EventEnvelope::builder()
            .aggregate_id(AggregateId::new())
            .aggregate_type("Competition")
            .event_type("PhotoEnteredIntoCompetition")
            .version(Version::first())
            .payload_raw(json!({"submission_notes": "notes"}))
            .build();

        let result = codec.encrypt_fields(envelope, &spec()).await;
        assert!(matches!(result, Err(CryptoError::MissingKeyIdentifier(_))));
    }

    #[tokio::test]
    async fn test_structured_values_round_trip() {
        let (codec, _) = codec();
        let user = AggregateId::new();
        let notes = json!({"lens": "50mm", "tags": ["dawn", "fog"]});

        let encrypted = codec
            .encrypt_fields(entry_envelope(user, notes.clone()), &spec())
            .await
            .unwrap();
        let decrypted = codec.decrypt_fields(encrypted).await.unwrap();

        assert_eq!(decrypted.envelope().payload["data"]["submission_notes"], notes);
    }
}
