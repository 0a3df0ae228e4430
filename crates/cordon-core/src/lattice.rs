//! Classification lattice primitives
//!
//! The lattice is the foundation of every access decision: a totally
//! ordered sequence of classification levels plus unordered compartment
//! tags. All functions here are pure; the only failure mode is an unknown
//! level string, which must fail closed (an explicit error, never a
//! default rank).

use crate::errors::{CordonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Classification levels, ordered from least to most sensitive.
///
/// Variant order is the total order: `rank()` is the declaration index and
/// the derived `Ord` agrees with it. National-caveat tiers sit above
/// `TopSecret`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLevel {
    /// Openly releasable
    Public,
    /// Organization-internal
    Internal,
    /// Restricted distribution
    Restricted,
    /// Confidential
    Confidential,
    /// Secret
    Secret,
    /// Top secret
    TopSecret,
    /// NATO restricted
    NatoRestricted,
    /// NATO confidential
    NatoConfidential,
    /// NATO secret
    NatoSecret,
    /// Cosmic top secret
    CosmicTopSecret,
}

impl ClassificationLevel {
    /// All levels in ascending order of sensitivity
    pub const ALL: [ClassificationLevel; 10] = [
        ClassificationLevel::Public,
        ClassificationLevel::Internal,
        ClassificationLevel::Restricted,
        ClassificationLevel::Confidential,
        ClassificationLevel::Secret,
        ClassificationLevel::TopSecret,
        ClassificationLevel::NatoRestricted,
        ClassificationLevel::NatoConfidential,
        ClassificationLevel::NatoSecret,
        ClassificationLevel::CosmicTopSecret,
    ];

    /// Rank of this level: its index in the ordered sequence
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Canonical lowercase name used in serialized labels and crypto domains
    pub fn as_str(self) -> &'static str {
        match self {
            ClassificationLevel::Public => "public",
            ClassificationLevel::Internal => "internal",
            ClassificationLevel::Restricted => "restricted",
            ClassificationLevel::Confidential => "confidential",
            ClassificationLevel::Secret => "secret",
            ClassificationLevel::TopSecret => "top_secret",
            ClassificationLevel::NatoRestricted => "nato_restricted",
            ClassificationLevel::NatoConfidential => "nato_confidential",
            ClassificationLevel::NatoSecret => "nato_secret",
            ClassificationLevel::CosmicTopSecret => "cosmic_top_secret",
        }
    }

    /// True if this level belongs to the NATO caveat tiers
    pub fn is_nato_tier(self) -> bool {
        self >= ClassificationLevel::NatoRestricted
    }
}

impl fmt::Display for ClassificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationLevel {
    type Err = CordonError;

    /// Parse a level name, case-insensitively.
    ///
    /// Unknown strings are unrankable and must fail closed: the error
    /// propagates instead of defaulting to any rank.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(ClassificationLevel::Public),
            "internal" => Ok(ClassificationLevel::Internal),
            "restricted" => Ok(ClassificationLevel::Restricted),
            "confidential" => Ok(ClassificationLevel::Confidential),
            "secret" => Ok(ClassificationLevel::Secret),
            "top_secret" => Ok(ClassificationLevel::TopSecret),
            "nato_restricted" => Ok(ClassificationLevel::NatoRestricted),
            "nato_confidential" => Ok(ClassificationLevel::NatoConfidential),
            "nato_secret" => Ok(ClassificationLevel::NatoSecret),
            "cosmic_top_secret" => Ok(ClassificationLevel::CosmicTopSecret),
            other => Err(CordonError::invalid(format!(
                "Unrankable classification level: {other:?}"
            ))),
        }
    }
}

/// `a` dominates `b` when `rank(a) >= rank(b)`
pub fn dominates(a: ClassificationLevel, b: ClassificationLevel) -> bool {
    a.rank() >= b.rank()
}

/// True when `a` contains every compartment in `b`
pub fn superset_of(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.is_superset(b)
}

/// True when every compartment in `a` is contained in `b`
pub fn subset_of(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.is_subset(b)
}

/// Normalize compartment tags: trim, lowercase, drop empties.
///
/// Compartments are unordered for comparison; the BTreeSet keeps them
/// canonically sorted for serialization and domain derivation.
pub fn normalize_compartments<I, S>(compartments: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compartments
        .into_iter()
        .map(|c| c.as_ref().trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
