//! Bell-LaPadula MAC engine
//!
//! Pure label comparisons: a subject may read only objects its label
//! dominates (no read-up) and may write only objects whose label dominates
//! its own (no write-down). Deletion is modeled as a write against the
//! existing object's label.

use cordon_core::{CordonError, Result, SecurityLabel};
use tracing::debug;

/// Stateless Bell-LaPadula checks over security labels
#[derive(Debug, Clone, Copy, Default)]
pub struct MacEngine;

impl MacEngine {
    /// True iff the subject may read the object: the subject's level
    /// dominates the object's level and the subject holds every
    /// compartment on the object.
    pub fn can_read(subject: &SecurityLabel, object: &SecurityLabel) -> bool {
        subject.dominates(object)
    }

    /// True iff the subject may write the object: the object's level
    /// dominates the subject's level and the subject's compartments are a
    /// subset of the object's.
    pub fn can_write(subject: &SecurityLabel, object: &SecurityLabel) -> bool {
        object.dominates(subject)
    }

    /// Enforce the read rule, raising a MAC read denial on violation
    pub fn enforce_read(subject: &SecurityLabel, object: &SecurityLabel) -> Result<()> {
        if Self::can_read(subject, object) {
            Ok(())
        } else {
            debug!(subject = %subject, object = %object, "MAC read denied");
            Err(CordonError::mac_deny_read(format!(
                "subject {subject} does not dominate object {object}"
            )))
        }
    }

    /// Enforce the write rule, raising a MAC write denial on violation
    pub fn enforce_write(subject: &SecurityLabel, object: &SecurityLabel) -> Result<()> {
        if Self::can_write(subject, object) {
            Ok(())
        } else {
            debug!(subject = %subject, object = %object, "MAC write denied");
            Err(CordonError::mac_deny_write(format!(
                "object {object} does not dominate subject {subject}"
            )))
        }
    }

    /// Enforce deletion of an existing object.
    ///
    /// You may only delete what you could legitimately overwrite; the
    /// denial is distinguishable from a plain write denial for auditing.
    pub fn enforce_delete(subject: &SecurityLabel, object: &SecurityLabel) -> Result<()> {
        if Self::can_write(subject, object) {
            Ok(())
        } else {
            debug!(subject = %subject, object = %object, "MAC delete denied");
            Err(CordonError::mac_deny_delete(format!(
                "object {object} does not dominate subject {subject}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cordon_core::ClassificationLevel;

    fn label(level: ClassificationLevel, tags: &[&str]) -> SecurityLabel {
        SecurityLabel::new(level, tags.iter().copied())
    }

    #[test]
    fn no_read_up() {
        let subject = label(ClassificationLevel::Confidential, &[]);
        let object = label(ClassificationLevel::Secret, &[]);
        assert!(!MacEngine::can_read(&subject, &object));
        assert!(MacEngine::can_read(&object, &subject));
    }

    #[test]
    fn read_requires_all_compartments() {
        let subject = label(ClassificationLevel::TopSecret, &["alpha"]);
        let object = label(ClassificationLevel::Secret, &["alpha", "bravo"]);
        assert!(!MacEngine::can_read(&subject, &object));
    }

    #[test]
    fn no_write_down() {
        let subject = label(ClassificationLevel::Secret, &[]);
        let object = label(ClassificationLevel::Confidential, &[]);
        assert!(!MacEngine::can_write(&subject, &object));
        assert!(MacEngine::can_write(&object, &subject));
    }

    #[test]
    fn compartmented_subject_cannot_write_uncompartmented_object() {
        // Boundary case for the subset direction: {alpha} is not a subset
        // of {}, so the write is denied even though levels would allow it.
        let subject = label(ClassificationLevel::Secret, &["alpha"]);
        let object = label(ClassificationLevel::Confidential, &[]);
        assert!(!MacEngine::can_write(&subject, &object));

        let uplevel_object = label(ClassificationLevel::TopSecret, &[]);
        assert!(!MacEngine::can_write(&subject, &uplevel_object));

        let compartmented_object = label(ClassificationLevel::TopSecret, &["alpha", "bravo"]);
        assert!(MacEngine::can_write(&subject, &compartmented_object));
    }

    #[test]
    fn enforce_variants_raise_distinct_denials() {
        let subject = label(ClassificationLevel::Public, &[]);
        let object = label(ClassificationLevel::Secret, &[]);

        assert!(matches!(
            MacEngine::enforce_read(&subject, &object),
            Err(CordonError::MacDenyRead { .. })
        ));
        let high = label(ClassificationLevel::Secret, &[]);
        let low = label(ClassificationLevel::Public, &[]);
        assert!(matches!(
            MacEngine::enforce_write(&high, &low),
            Err(CordonError::MacDenyWrite { .. })
        ));
        assert!(matches!(
            MacEngine::enforce_delete(&high, &low),
            Err(CordonError::MacDenyDelete { .. })
        ));
    }
}
