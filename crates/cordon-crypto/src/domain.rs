//! Crypto domain derivation
//!
//! A crypto domain is the canonical string identifying one classification
//! and compartment combination. It is a pure function of the label: same
//! label, same domain, regardless of compartment order, with no time or
//! randomness involved. The domain is the keyring's lookup key; its
//! fingerprint is the public key id stamped into envelopes.

use cordon_core::SecurityLabel;

/// Version prefix for domain-separated fingerprint hashing
const FINGERPRINT_CONTEXT: &[u8] = b"cordon-domain-fingerprint-v1:";

/// Canonical domain string for a label: `{level}|{comp_a}+{comp_b}+...`
///
/// Compartments come out sorted and lowercased because `SecurityLabel`
/// normalizes them into a `BTreeSet`; identical labels always yield the
/// same domain. (A label without a level is unrepresentable here; rows
/// whose level string fails to parse never become labels.)
pub fn crypto_domain(label: &SecurityLabel) -> String {
    let compartments: Vec<&str> = label.compartments.iter().map(String::as_str).collect();
    format!("{}|{}", label.level.as_str(), compartments.join("+"))
}

/// Short public fingerprint of a domain, used as the envelope key id.
///
/// Domain-separated blake3, hex-encoded and truncated; reveals nothing
/// about the key material.
pub fn domain_fingerprint(domain: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(FINGERPRINT_CONTEXT);
    hasher.update(domain.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest.as_bytes()[..8])
}
