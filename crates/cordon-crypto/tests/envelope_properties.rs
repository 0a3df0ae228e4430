//! Property Tests: Envelope Encryption
//!
//! Round-trip, tamper, and domain-determinism properties across arbitrary
//! payloads and labels.

use cordon_core::{ClassificationLevel, Effects, SecurityLabel};
use cordon_crypto::{
    crypto_domain, AesGcmCipher, AssociatedData, ClassificationCrypto, Keyring, XChaChaCipher,
};
use proptest::prelude::*;
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = ClassificationLevel> {
    prop::sample::select(ClassificationLevel::ALL.to_vec())
}

fn any_label() -> impl Strategy<Value = SecurityLabel> {
    (
        any_level(),
        prop::collection::btree_set(
            prop::sample::select(vec!["alpha", "bravo", "crypto", "delta"]),
            0..3,
        ),
    )
        .prop_map(|(level, tags)| SecurityLabel::new(level, tags))
}

fn router_aes() -> ClassificationCrypto {
    let effects = Effects::test();
    ClassificationCrypto::new(
        Arc::new(Keyring::new(effects.clone())),
        Arc::new(AesGcmCipher),
        effects,
    )
}

fn router_xchacha() -> ClassificationCrypto {
    let effects = Effects::test();
    ClassificationCrypto::new(
        Arc::new(Keyring::new(effects.clone())),
        Arc::new(XChaChaCipher),
        effects,
    )
}

fn aad_for(label: &SecurityLabel, record_id: &str, written_at: u64) -> AssociatedData {
    AssociatedData {
        label: label.clone(),
        record_id: record_id.to_string(),
        written_at,
    }
}

proptest! {
    #[test]
    fn roundtrip_any_payload_any_label(
        payload in prop::collection::vec(any::<u8>(), 0..512),
        label in any_label(),
        written_at in 0u64..u64::MAX / 2,
    ) {
        for router in [router_aes(), router_xchacha()] {
            let aad = aad_for(&label, "rec-1", written_at);
            let envelope = router.encrypt(&label, &payload, &aad).unwrap();
            let plaintext = router.decrypt(&label, &envelope, &aad).unwrap();
            prop_assert_eq!(&plaintext, &payload);
        }
    }

    #[test]
    fn ciphertext_bitflip_fails(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        label in any_label(),
        flip_bit in 0usize..8,
    ) {
        let router = router_aes();
        let aad = aad_for(&label, "rec-1", 42);
        let mut envelope = router.encrypt(&label, &payload, &aad).unwrap();
        let idx = envelope.ciphertext.len() / 2;
        envelope.ciphertext[idx] ^= 1 << flip_bit;
        prop_assert!(router.decrypt(&label, &envelope, &aad).is_err());
    }

    #[test]
    fn aad_change_fails(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        label in any_label(),
    ) {
        let router = router_aes();
        let aad = aad_for(&label, "rec-1", 42);
        let envelope = router.encrypt(&label, &payload, &aad).unwrap();
        let moved = aad_for(&label, "rec-2", 42);
        prop_assert!(router.decrypt(&label, &envelope, &moved).is_err());
        let replayed = aad_for(&label, "rec-1", 43);
        prop_assert!(router.decrypt(&label, &envelope, &replayed).is_err());
    }

    #[test]
    fn domain_is_deterministic_and_order_independent(
        level in any_level(),
        mut tags in prop::collection::vec(
            prop::sample::select(vec!["alpha", "bravo", "crypto", "delta"]),
            0..4,
        ),
    ) {
        let forward = SecurityLabel::new(level, tags.clone());
        tags.reverse();
        let reversed = SecurityLabel::new(level, tags);
        prop_assert_eq!(crypto_domain(&forward), crypto_domain(&reversed));
    }

    #[test]
    fn distinct_labels_never_share_a_domain(a in any_label(), b in any_label()) {
        if a != b {
            prop_assert_ne!(crypto_domain(&a), crypto_domain(&b));
        }
    }
}
