//! Per-domain key material
//!
//! Keys are created lazily the first time a domain is seen and cached for
//! the process lifetime. Nothing here is ever persisted; production key
//! custody is out of scope and keys are zeroized when dropped.

use crate::domain::domain_fingerprint;
use cordon_core::{CordonError, Effects, Result};
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key for one crypto domain
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DomainKey {
    bytes: [u8; 32],
    #[zeroize(skip)]
    key_id: String,
}

impl DomainKey {
    /// Raw key bytes
    pub fn bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Public identifier stamped into envelopes sealed under this key
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl std::fmt::Debug for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes never reach logs
        f.debug_struct("DomainKey")
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Ed25519 keypair derived for a `(purpose, domain)` pair
#[derive(Debug)]
pub struct SigningKeypair {
    signing: SigningKey,
}

impl SigningKeypair {
    /// The signing half
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing
    }

    /// The public verification half
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }
}

/// Lazily populated cache of per-domain key material.
///
/// Symmetric keys and derived signing keypairs live in separate
/// namespaces; both have get-or-create semantics and return the same
/// `Arc` for the same lookup key across the process lifetime.
pub struct Keyring {
    effects: Effects,
    symmetric: Mutex<HashMap<String, Arc<DomainKey>>>,
    derived: Mutex<HashMap<(String, String), Arc<SigningKeypair>>>,
}

impl Keyring {
    /// Create an empty keyring
    pub fn new(effects: Effects) -> Self {
        Keyring {
            effects,
            symmetric: Mutex::new(HashMap::new()),
            derived: Mutex::new(HashMap::new()),
        }
    }

    /// Symmetric key for a domain, generating a fresh random key the
    /// first time the domain is seen.
    pub fn symmetric_key(&self, domain: &str) -> Result<Arc<DomainKey>> {
        let mut keys = self
            .symmetric
            .lock()
            .map_err(|e| CordonError::internal(format!("Keyring lock poisoned: {e}")))?;
        if let Some(key) = keys.get(domain) {
            return Ok(Arc::clone(key));
        }
        debug!(domain, "generating symmetric key for new crypto domain");
        let key = Arc::new(DomainKey {
            bytes: self.effects.random_bytes(),
            key_id: domain_fingerprint(domain),
        });
        keys.insert(domain.to_string(), Arc::clone(&key));
        Ok(key)
    }

    /// Keypair for a non-symmetric purpose (e.g. signing), cached per
    /// `(purpose, domain)` in its own namespace.
    pub fn derive(&self, purpose: &str, domain: &str) -> Result<Arc<SigningKeypair>> {
        let mut pairs = self
            .derived
            .lock()
            .map_err(|e| CordonError::internal(format!("Keyring lock poisoned: {e}")))?;
        let cache_key = (purpose.to_string(), domain.to_string());
        if let Some(pair) = pairs.get(&cache_key) {
            return Ok(Arc::clone(pair));
        }
        debug!(purpose, domain, "deriving keypair for new purpose/domain");
        let mut rng = self.effects.rng();
        let pair = Arc::new(SigningKeypair {
            signing: SigningKey::generate(&mut rng),
        });
        pairs.insert(cache_key, Arc::clone(&pair));
        Ok(pair)
    }

    /// Number of symmetric domains seen so far
    pub fn domain_count(&self) -> usize {
        self.symmetric.lock().map(|keys| keys.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for Keyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyring")
            .field("domains", &self.domain_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_domain_returns_same_key() {
        let keyring = Keyring::new(Effects::test());
        let first = keyring.symmetric_key("secret|alpha").unwrap();
        let second = keyring.symmetric_key("secret|alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(keyring.domain_count(), 1);
    }

    #[test]
    fn distinct_domains_get_distinct_keys() {
        let keyring = Keyring::new(Effects::test());
        let a = keyring.symmetric_key("secret|alpha").unwrap();
        let b = keyring.symmetric_key("secret|bravo").unwrap();
        assert_ne!(a.bytes(), b.bytes());
        assert_ne!(a.key_id(), b.key_id());
    }

    #[test]
    fn derived_namespace_is_separate_per_purpose() {
        let keyring = Keyring::new(Effects::test());
        let signing = keyring.derive("signing", "secret|alpha").unwrap();
        let attest = keyring.derive("attestation", "secret|alpha").unwrap();
        let signing_again = keyring.derive("signing", "secret|alpha").unwrap();
        assert!(Arc::ptr_eq(&signing, &signing_again));
        assert_ne!(
            signing.verifying_key().to_bytes(),
            attest.verifying_key().to_bytes()
        );
    }
}
