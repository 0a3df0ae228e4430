//! Security labels
//!
//! A label is a `(level, compartments)` pair attached to subjects and
//! stored objects. Dominance over labels is the single relation every
//! MAC decision reduces to.

use crate::lattice::{self, ClassificationLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Classification label: a level plus a set of compartment tags
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityLabel {
    /// Classification level
    pub level: ClassificationLevel,
    /// Compartment tags, case-normalized and canonically sorted
    pub compartments: BTreeSet<String>,
}

impl SecurityLabel {
    /// Create a label, normalizing compartment tags
    pub fn new<I, S>(level: ClassificationLevel, compartments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            level,
            compartments: lattice::normalize_compartments(compartments),
        }
    }

    /// Label with a level and no compartments
    pub fn uncompartmented(level: ClassificationLevel) -> Self {
        Self {
            level,
            compartments: BTreeSet::new(),
        }
    }

    /// The least-privileged label: public, no compartments.
    ///
    /// This is what an absent or expired security context degrades to,
    /// never an implicit superuser.
    pub fn least_privileged() -> Self {
        Self::uncompartmented(ClassificationLevel::Public)
    }

    /// Label dominance: this level >= other level and these compartments
    /// contain all of the other's.
    pub fn dominates(&self, other: &SecurityLabel) -> bool {
        lattice::dominates(self.level, other.level)
            && lattice::superset_of(&self.compartments, &other.compartments)
    }
}

impl fmt::Display for SecurityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.compartments.is_empty() {
            write!(f, "{}", self.level)
        } else {
            let tags: Vec<&str> = self.compartments.iter().map(String::as_str).collect();
            write!(f, "{}/{{{}}}", self.level, tags.join(","))
        }
    }
}
