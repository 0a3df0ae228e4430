//! Envelope cipher implementations
//!
//! One trait, three statically distinguishable implementations: two real
//! AEAD ciphers and a demo passthrough. The storage loader selects exactly
//! one at construction time; nothing branches on a mode flag per call, so
//! demo behavior cannot leak into a security-sensitive path.

use crate::keyring::DomainKey;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use cordon_core::{CordonError, Result};

/// AEAD tag length shared by both real ciphers
const TAG_LEN: usize = 16;

/// Authenticated envelope cipher over raw byte payloads.
///
/// `seal` returns ciphertext and tag separately so the envelope stays
/// self-describing; `open` fails on any ciphertext, tag, or associated
/// data mismatch and never yields partial plaintext.
pub trait EnvelopeCipher: Send + Sync {
    /// Canonical algorithm name stamped into envelopes
    fn algorithm(&self) -> &'static str;

    /// Nonce length this cipher expects
    fn nonce_len(&self) -> usize;

    /// Authenticated encryption of `plaintext` binding `aad`
    fn seal(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)>;

    /// Authenticated decryption; `aad` must match what was bound at seal
    fn open(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;
}

/// AES-256-GCM cipher (basic security profile)
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl EnvelopeCipher for AesGcmCipher {
    fn algorithm(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn nonce_len(&self) -> usize {
        12
    }

    fn seal(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CordonError::crypto("AES-GCM encryption failed"))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        Ok((sealed, tag))
    }

    fn open(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
        let mut sealed = Vec::with_capacity(ciphertext.len() + tag.len());
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);
        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: &sealed,
                    aad,
                },
            )
            .map_err(|_| {
                CordonError::crypto_authentication(
                    "AES-GCM authentication failed: ciphertext or associated data mismatch",
                )
            })
    }
}

/// XChaCha20-Poly1305 cipher (high-security and NATO profiles).
///
/// The extended nonce removes any practical collision concern for
/// long-lived domain keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaChaCipher;

impl EnvelopeCipher for XChaChaCipher {
    fn algorithm(&self) -> &'static str {
        "xchacha20-poly1305"
    }

    fn nonce_len(&self) -> usize {
        24
    }

    fn seal(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.bytes()));
        let mut sealed = cipher
            .encrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CordonError::crypto("XChaCha20-Poly1305 encryption failed"))?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);
        Ok((sealed, tag))
    }

    fn open(
        &self,
        key: &DomainKey,
        nonce: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.bytes()));
        let mut sealed = Vec::with_capacity(ciphertext.len() + tag.len());
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);
        cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: &sealed,
                    aad,
                },
            )
            .map_err(|_| {
                CordonError::crypto_authentication(
                    "XChaCha20-Poly1305 authentication failed: ciphertext or associated data mismatch",
                )
            })
    }
}

/// Passthrough cipher for demo stacks. NOT encryption: payloads are
/// stored verbatim and nothing is authenticated. Only the demo profile
/// ever constructs this.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoCipher;

impl EnvelopeCipher for DemoCipher {
    fn algorithm(&self) -> &'static str {
        "demo-identity"
    }

    fn nonce_len(&self) -> usize {
        0
    }

    fn seal(
        &self,
        _key: &DomainKey,
        _nonce: &[u8],
        plaintext: &[u8],
        _aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((plaintext.to_vec(), Vec::new()))
    }

    fn open(
        &self,
        _key: &DomainKey,
        _nonce: &[u8],
        ciphertext: &[u8],
        _tag: &[u8],
        _aad: &[u8],
    ) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::Keyring;
    use cordon_core::Effects;

    fn test_key() -> std::sync::Arc<DomainKey> {
        Keyring::new(Effects::test())
            .symmetric_key("secret|alpha")
            .unwrap()
    }

    #[test]
    fn aes_gcm_roundtrip_and_tamper() {
        let cipher = AesGcmCipher;
        let key = test_key();
        let nonce = [7u8; 12];
        let (ct, tag) = cipher.seal(&key, &nonce, b"payload", b"aad").unwrap();
        assert_eq!(tag.len(), TAG_LEN);

        let pt = cipher.open(&key, &nonce, &ct, &tag, b"aad").unwrap();
        assert_eq!(pt, b"payload");

        assert!(cipher.open(&key, &nonce, &ct, &tag, b"other-aad").is_err());
        let mut bad_ct = ct.clone();
        bad_ct[0] ^= 1;
        assert!(cipher.open(&key, &nonce, &bad_ct, &tag, b"aad").is_err());
        let mut bad_tag = tag;
        bad_tag[0] ^= 1;
        assert!(cipher.open(&key, &nonce, &ct, &bad_tag, b"aad").is_err());
    }

    #[test]
    fn xchacha_roundtrip_and_tamper() {
        let cipher = XChaChaCipher;
        let key = test_key();
        let nonce = [9u8; 24];
        let (ct, tag) = cipher.seal(&key, &nonce, b"payload", b"aad").unwrap();

        let pt = cipher.open(&key, &nonce, &ct, &tag, b"aad").unwrap();
        assert_eq!(pt, b"payload");
        assert!(cipher.open(&key, &nonce, &ct, &tag, b"tampered").is_err());
    }

    #[test]
    fn tamper_failure_is_authentication_error() {
        let cipher = AesGcmCipher;
        let key = test_key();
        let nonce = [7u8; 12];
        let (ct, tag) = cipher.seal(&key, &nonce, b"payload", b"aad").unwrap();
        let result = cipher.open(&key, &nonce, &ct, &tag, b"other");
        assert!(matches!(
            result,
            Err(cordon_core::CordonError::CryptoAuthentication { .. })
        ));
    }
}
