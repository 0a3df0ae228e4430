//! Classification crypto router
//!
//! Resolves a label to its crypto domain, fetches the domain key, and
//! performs authenticated encryption with a fresh random nonce per call.
//! The record's classification metadata travels as associated data, so a
//! ciphertext moved under a different label, record id, or timestamp
//! fails authentication instead of decrypting.

use crate::cipher::EnvelopeCipher;
use crate::domain::crypto_domain;
use crate::keyring::Keyring;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cordon_core::{CordonError, Effects, Result, SecurityLabel};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Self-describing authenticated ciphertext bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// AEAD algorithm that produced this envelope
    pub algorithm: String,
    /// Public fingerprint of the domain key
    pub key_id: String,
    /// Per-call random nonce
    #[serde(with = "b64")]
    pub nonce: Vec<u8>,
    /// Ciphertext without the authentication tag
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// AEAD authentication tag
    #[serde(with = "b64")]
    pub auth_tag: Vec<u8>,
}

/// Metadata bound into every envelope as associated data.
///
/// `written_at` doubles as the freshness token: replaying an old envelope
/// under a rewritten row changes the reconstructed AAD and fails
/// authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedData {
    /// Label the payload was classified under at encrypt time
    pub label: SecurityLabel,
    /// Physical record identifier
    pub record_id: String,
    /// Unix timestamp of the write
    pub written_at: u64,
}

impl AssociatedData {
    /// Canonical byte encoding.
    ///
    /// Field order is fixed and compartments are already sorted inside
    /// the label, so equal metadata always produces equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let compartments: Vec<&str> = self.label.compartments.iter().map(String::as_str).collect();
        bincode::serialize(&(
            self.label.level.as_str(),
            compartments,
            self.record_id.as_str(),
            self.written_at,
        ))
        .map_err(|e| CordonError::serialization(format!("Failed to encode associated data: {e}")))
    }
}

/// Label-driven envelope encryption over one statically selected cipher
pub struct ClassificationCrypto {
    keyring: std::sync::Arc<Keyring>,
    cipher: std::sync::Arc<dyn EnvelopeCipher>,
    effects: Effects,
}

impl ClassificationCrypto {
    /// Create a router over a keyring and a cipher chosen at load time
    pub fn new(
        keyring: std::sync::Arc<Keyring>,
        cipher: std::sync::Arc<dyn EnvelopeCipher>,
        effects: Effects,
    ) -> Self {
        ClassificationCrypto {
            keyring,
            cipher,
            effects,
        }
    }

    /// Name of the cipher this router seals with
    pub fn algorithm(&self) -> &'static str {
        self.cipher.algorithm()
    }

    /// Seal a payload under the label's domain key, binding `aad`
    pub fn encrypt(
        &self,
        label: &SecurityLabel,
        plaintext: &[u8],
        aad: &AssociatedData,
    ) -> Result<EncryptedEnvelope> {
        let domain = crypto_domain(label);
        let key = self.keyring.symmetric_key(&domain)?;
        let mut nonce = vec![0u8; self.cipher.nonce_len()];
        self.effects.random.fill_bytes(&mut nonce);
        let aad_bytes = aad.to_bytes()?;
        let (ciphertext, auth_tag) = self.cipher.seal(&key, &nonce, plaintext, &aad_bytes)?;
        Ok(EncryptedEnvelope {
            algorithm: self.cipher.algorithm().to_string(),
            key_id: key.key_id().to_string(),
            nonce,
            ciphertext,
            auth_tag,
        })
    }

    /// Open an envelope; `aad` must reconstruct exactly what was bound at
    /// encrypt time or authentication fails.
    pub fn decrypt(
        &self,
        label: &SecurityLabel,
        envelope: &EncryptedEnvelope,
        aad: &AssociatedData,
    ) -> Result<Vec<u8>> {
        if envelope.algorithm != self.cipher.algorithm() {
            return Err(CordonError::crypto_authentication(format!(
                "Envelope algorithm {:?} does not match configured cipher {:?}",
                envelope.algorithm,
                self.cipher.algorithm()
            )));
        }
        let domain = crypto_domain(label);
        let key = self.keyring.symmetric_key(&domain)?;
        if envelope.key_id != key.key_id() {
            return Err(CordonError::crypto_authentication(format!(
                "Envelope key id {:?} does not match domain {domain:?}",
                envelope.key_id
            )));
        }
        let aad_bytes = aad.to_bytes()?;
        self.cipher.open(
            &key,
            &envelope.nonce,
            &envelope.ciphertext,
            &envelope.auth_tag,
            &aad_bytes,
        )
    }
}

impl std::fmt::Debug for ClassificationCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationCrypto")
            .field("algorithm", &self.cipher.algorithm())
            .finish()
    }
}

/// Base64 serde for byte fields so envelopes stay JSON-friendly in rows
mod b64 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::AesGcmCipher;
    use cordon_core::ClassificationLevel;
    use std::sync::Arc;

    fn router() -> ClassificationCrypto {
        let effects = Effects::test();
        ClassificationCrypto::new(
            Arc::new(Keyring::new(effects.clone())),
            Arc::new(AesGcmCipher),
            effects,
        )
    }

    fn aad(label: &SecurityLabel) -> AssociatedData {
        AssociatedData {
            label: label.clone(),
            record_id: "doc-1".into(),
            written_at: 1_735_689_600,
        }
    }

    #[test]
    fn roundtrip() {
        let router = router();
        let label = SecurityLabel::new(ClassificationLevel::Secret, ["alpha"]);
        let envelope = router.encrypt(&label, b"payload", &aad(&label)).unwrap();
        assert_eq!(envelope.algorithm, "aes-256-gcm");
        let plaintext = router.decrypt(&label, &envelope, &aad(&label)).unwrap();
        assert_eq!(plaintext, b"payload");
    }

    #[test]
    fn metadata_substitution_fails_authentication() {
        let router = router();
        let label = SecurityLabel::new(ClassificationLevel::Secret, ["alpha"]);
        let envelope = router.encrypt(&label, b"payload", &aad(&label)).unwrap();

        let mut wrong_id = aad(&label);
        wrong_id.record_id = "doc-2".into();
        assert!(router.decrypt(&label, &envelope, &wrong_id).is_err());

        let mut wrong_time = aad(&label);
        wrong_time.written_at += 1;
        assert!(router.decrypt(&label, &envelope, &wrong_time).is_err());
    }

    #[test]
    fn wrong_label_fails_before_decryption() {
        let router = router();
        let label = SecurityLabel::new(ClassificationLevel::Secret, ["alpha"]);
        let other = SecurityLabel::new(ClassificationLevel::Secret, ["bravo"]);
        let envelope = router.encrypt(&label, b"payload", &aad(&label)).unwrap();
        let result = router.decrypt(&other, &envelope, &aad(&other));
        assert!(matches!(
            result,
            Err(CordonError::CryptoAuthentication { .. })
        ));
    }

    #[test]
    fn envelope_serializes_with_base64_bytes() {
        let router = router();
        let label = SecurityLabel::uncompartmented(ClassificationLevel::Confidential);
        let envelope = router.encrypt(&label, b"payload", &aad(&label)).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json["nonce"].is_string());
        assert!(json["ciphertext"].is_string());
        let back: EncryptedEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn fresh_nonce_per_call() {
        let router = router();
        let label = SecurityLabel::uncompartmented(ClassificationLevel::Secret);
        let a = router.encrypt(&label, b"payload", &aad(&label)).unwrap();
        let b = router.encrypt(&label, b"payload", &aad(&label)).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}
