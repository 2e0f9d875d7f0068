//! Success-rate accounting for batches of resolutions.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::model::{ResolutionResult, ResolvedRecord, Tier, UnmatchedReason};

/// Success rate a batch must reach before downstream collection proceeds.
pub const DEFAULT_TARGET_RATE: f64 = 0.70;

/// Running counters over a batch of resolutions.
///
/// Cheap to copy around; give each worker its own and [`merge`](Self::merge)
/// them at batch boundaries rather than sharing one behind a lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub attempts: u64,
    pub exact: u64,
    pub substring: u64,
    pub fuzzy: u64,
    pub empty_or_noise: u64,
    pub no_confident_match: u64,
    /// Unmatched records that still named a single gu-level area.
    pub area_only: u64,
}

impl ResolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one resolution outcome.
    pub fn record(&mut self, result: &ResolutionResult) {
        self.attempts += 1;
        match result {
            ResolutionResult::Matched { tier, .. } => match tier {
                Tier::Exact => self.exact += 1,
                Tier::Substring => self.substring += 1,
                Tier::Fuzzy => self.fuzzy += 1,
            },
            ResolutionResult::Unmatched { reason } => match reason {
                UnmatchedReason::EmptyOrNoise => self.empty_or_noise += 1,
                UnmatchedReason::NoConfidentMatch => self.no_confident_match += 1,
            },
        }
    }

    /// Count a resolved record, including its area hint.
    pub fn record_resolved(&mut self, record: &ResolvedRecord) {
        self.record(&record.result);
        if record.area_hint.is_some() && !record.result.is_match() {
            self.area_only += 1;
        }
    }

    /// Matches at any tier.
    pub fn matches(&self) -> u64 {
        self.exact + self.substring + self.fuzzy
    }

    pub fn misses(&self) -> u64 {
        self.empty_or_noise + self.no_confident_match
    }

    /// Matches divided by attempts; `0.0` for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.matches() as f64 / self.attempts as f64
    }

    /// Records placed at least at gu level: every match plus the
    /// area-only misses. `0.0` for an empty batch.
    pub fn area_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (self.matches() + self.area_only) as f64 / self.attempts as f64
    }

    pub fn tier_count(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Exact => self.exact,
            Tier::Substring => self.substring,
            Tier::Fuzzy => self.fuzzy,
        }
    }

    /// Matches per tier, every tier present even when zero.
    pub fn tier_breakdown(&self) -> BTreeMap<Tier, u64> {
        Tier::CONSULT_ORDER
            .iter()
            .map(|&t| (t, self.tier_count(t)))
            .collect()
    }

    /// Misses per reason, every reason present even when zero.
    pub fn miss_breakdown(&self) -> BTreeMap<UnmatchedReason, u64> {
        BTreeMap::from([
            (UnmatchedReason::EmptyOrNoise, self.empty_or_noise),
            (UnmatchedReason::NoConfidentMatch, self.no_confident_match),
        ])
    }

    /// Fold another accumulator's counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.attempts += other.attempts;
        self.exact += other.exact;
        self.substring += other.substring;
        self.fuzzy += other.fuzzy;
        self.empty_or_noise += other.empty_or_noise;
        self.no_confident_match += other.no_confident_match;
        self.area_only += other.area_only;
    }
}

impl AddAssign for ResolutionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl Sum for ResolutionStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

impl<'a> Extend<&'a ResolutionResult> for ResolutionStats {
    fn extend<T: IntoIterator<Item = &'a ResolutionResult>>(&mut self, iter: T) {
        for result in iter {
            self.record(result);
        }
    }
}

/// Verdict on whether a batch met the success-rate acceptance criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceReport {
    pub attempts: u64,
    pub matched: u64,
    pub success_rate: f64,
    pub target: f64,
    pub passed: bool,
    /// Share of matches carried by the fuzzy tier; a pass that leans on
    /// fuzzy matches is weaker than one carried by exact/substring.
    pub fuzzy_share: f64,
    /// Misses that still named one gu; a failing batch with many of these
    /// points at missing dong names rather than noise.
    pub area_only: u64,
    pub area_rate: f64,
}

impl AcceptanceReport {
    pub fn evaluate(stats: &ResolutionStats, target: f64) -> Self {
        let matched = stats.matches();
        let success_rate = stats.success_rate();
        let fuzzy_share = if matched == 0 {
            0.0
        } else {
            stats.fuzzy as f64 / matched as f64
        };
        Self {
            attempts: stats.attempts,
            matched,
            success_rate,
            target,
            passed: stats.attempts > 0 && success_rate >= target,
            fuzzy_share,
            area_only: stats.area_only,
            area_rate: stats.area_rate(),
        }
    }
}
