//! Shared district-resolution types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A canonical district (dong) entry from the reference table.
///
/// Immutable once handed to [`Registry::load`](crate::Registry::load).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRecord {
    /// Stable external identifier, e.g. the administrative dong code.
    pub id: String,
    /// Official name, e.g. `"종로구 청운동"`.
    pub name: String,
    /// Alternate surface forms: historical names, abbreviations.
    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

impl DistrictRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }
}

/// Confidence tier of a successful resolution.
///
/// Ordered so that `Exact > Substring > Fuzzy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Fuzzy,
    Substring,
    Exact,
}

impl Tier {
    /// Tiers in the order the resolver consults them.
    pub const CONSULT_ORDER: [Tier; 3] = [Tier::Exact, Tier::Substring, Tier::Fuzzy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record could not be attributed to a district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Nothing but whitespace, punctuation, or numbers after normalisation.
    EmptyOrNoise,
    /// No tier produced a single district with enough confidence.
    NoConfidentMatch,
}

impl UnmatchedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyOrNoise => "empty_or_noise",
            Self::NoConfidentMatch => "no_confident_match",
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one raw evalNm string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionResult {
    Matched { district_id: String, tier: Tier },
    Unmatched { reason: UnmatchedReason },
}

impl ResolutionResult {
    pub fn matched(district_id: impl Into<String>, tier: Tier) -> Self {
        Self::Matched {
            district_id: district_id.into(),
            tier,
        }
    }

    pub fn unmatched(reason: UnmatchedReason) -> Self {
        Self::Unmatched { reason }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn district_id(&self) -> Option<&str> {
        match self {
            Self::Matched { district_id, .. } => Some(district_id),
            Self::Unmatched { .. } => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Matched { tier, .. } => Some(*tier),
            Self::Unmatched { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<UnmatchedReason> {
        match self {
            Self::Matched { .. } => None,
            Self::Unmatched { reason } => Some(*reason),
        }
    }
}

/// A resolution paired with the raw text it came from.
///
/// Handed to the persistence collaborator; unmatched records are kept for
/// manual review rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub source: String,
    pub normalized: String,
    #[serde(flatten)]
    pub result: ResolutionResult,
    /// Single gu-level area named in the text when no district was
    /// confidently matched. Always `None` for matches and noise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_hint: Option<String>,
}
