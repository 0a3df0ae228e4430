//! Cordon Crypto - envelope encryption keyed by classification domain
//!
//! Every security label maps to a canonical crypto domain string; every
//! domain lazily gets its own symmetric key. Payloads are sealed with
//! authenticated encryption that binds the record's classification
//! metadata as associated data, so moving a ciphertext under a different
//! label or record id makes decryption fail outright.
//!
//! ## Core Components
//!
//! - **Domain derivation**: deterministic `label -> domain` mapping,
//!   independent of time and randomness.
//! - **Keyring**: get-or-create per-domain symmetric keys plus a separate
//!   `(purpose, domain)` namespace for signing keypairs; keys live only in
//!   process memory and are zeroized on drop.
//! - **Ciphers**: statically distinguishable AEAD implementations
//!   (AES-256-GCM, XChaCha20-Poly1305) and an explicitly insecure
//!   `DemoCipher`, selected once at construction.
//! - **Router**: label in, `EncryptedEnvelope` out; exact associated-data
//!   reconstruction required to decrypt.

#![forbid(unsafe_code)]

/// Canonical crypto-domain derivation from labels
pub mod domain;

/// Per-domain key material cache
pub mod keyring;

/// AEAD cipher implementations behind one trait
pub mod cipher;

/// Label-driven encrypt/decrypt of record payloads
pub mod router;

pub use cipher::{AesGcmCipher, DemoCipher, EnvelopeCipher, XChaChaCipher};
pub use domain::{crypto_domain, domain_fingerprint};
pub use keyring::{DomainKey, Keyring, SigningKeypair};
pub use router::{AssociatedData, ClassificationCrypto, EncryptedEnvelope};
