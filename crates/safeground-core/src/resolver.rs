//! Tiered district resolution: exact, then substring, then fuzzy.
//!
//! Each tier is consulted only when every higher tier failed, so a drop in
//! the batch success rate can be traced to the tier that stopped carrying it.
//! Ambiguity is never resolved by guessing: more than one candidate district
//! at the substring tier falls through to fuzzy, which may not then pick any
//! of those candidates, and a fuzzy tie is a miss.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::model::{ResolutionResult, ResolvedRecord, Tier, UnmatchedReason};
use crate::normalize::{NormalizedText, normalize};
use crate::registry::{Registry, RegistryKey};
use crate::stats::ResolutionStats;

/// Tuning knobs for the resolver, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Normalised Levenshtein similarity a fuzzy match must strictly
    /// exceed. `1.0` disables the fuzzy tier.
    pub fuzzy_threshold: f64,
    /// Shortest key (or input) in characters eligible for substring matching.
    pub min_substring_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.80,
            min_substring_chars: 2,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError(format!(
                "fuzzy_threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.min_substring_chars == 0 {
            return Err(ConfigError("min_substring_chars must be at least 1".into()));
        }
        Ok(())
    }
}

/// Tiers consulted while resolving one input, in consultation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierTrace {
    consulted: Vec<Tier>,
}

impl TierTrace {
    pub fn consulted(&self) -> &[Tier] {
        &self.consulted
    }

    pub fn was_consulted(&self, tier: Tier) -> bool {
        self.consulted.contains(&tier)
    }

    fn enter(&mut self, tier: Tier) {
        self.consulted.push(tier);
    }
}

/// Full outcome of one resolution, including the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub normalized: NormalizedText,
    pub result: ResolutionResult,
    pub trace: TierTrace,
    /// See [`Registry::area_hint`]; only set for `NoConfidentMatch`.
    pub area_hint: Option<String>,
}

/// Resolved records of a batch plus their aggregate counters.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One record per input, in input order.
    pub records: Vec<ResolvedRecord>,
    pub stats: ResolutionStats,
}

impl BatchOutcome {
    /// Unmatched records tagged with their reason, for manual review.
    pub fn review_queue(&self) -> impl Iterator<Item = (&ResolvedRecord, UnmatchedReason)> {
        self.records
            .iter()
            .filter_map(|r| r.result.reason().map(|reason| (r, reason)))
    }
}

enum SubstringOutcome<'a> {
    None,
    Unique(&'a str),
    Ambiguous(Vec<&'a str>),
}

/// Resolves raw evalNm text against a shared, read-only [`Registry`].
///
/// Holds no mutable state; `resolve` can be called from many threads at once.
#[derive(Debug, Clone)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    config: ResolverConfig,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn with_defaults(registry: &'r Registry) -> Self {
        Self {
            registry,
            config: ResolverConfig::default(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve one raw string to at most one district.
    pub fn resolve(&self, raw: &str) -> ResolutionResult {
        self.resolve_traced(raw).result
    }

    /// Resolve one raw string, recording which tiers were consulted.
    pub fn resolve_traced(&self, raw: &str) -> Resolution {
        let normalized = normalize(raw);
        let mut trace = TierTrace::default();

        if normalized.is_empty() || !normalized.has_script_content() {
            return Resolution {
                normalized,
                result: ResolutionResult::unmatched(UnmatchedReason::EmptyOrNoise),
                trace,
                area_hint: None,
            };
        }

        let result = self.run_tiers(&normalized, &mut trace);
        let area_hint = match result {
            ResolutionResult::Unmatched { .. } => {
                self.registry.area_hint(&normalized).map(str::to_string)
            }
            ResolutionResult::Matched { .. } => None,
        };
        Resolution {
            normalized,
            result,
            trace,
            area_hint,
        }
    }

    /// Resolve a batch sequentially.
    pub fn resolve_batch<I, S>(&self, inputs: I) -> BatchOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stats = ResolutionStats::new();
        let records: Vec<ResolvedRecord> = inputs
            .into_iter()
            .map(|raw| {
                let record = self.resolve_record(raw.as_ref());
                stats.record_resolved(&record);
                record
            })
            .collect();

        log_batch(&stats);
        BatchOutcome { records, stats }
    }

    /// Resolve a batch on the rayon pool.
    ///
    /// Each worker counts into its own [`ResolutionStats`]; the partial
    /// accumulators are summed once the workers finish. Output order and
    /// totals are identical to [`resolve_batch`](Self::resolve_batch).
    pub fn par_resolve_batch<S>(&self, inputs: &[S]) -> BatchOutcome
    where
        S: AsRef<str> + Sync,
    {
        let (records, stats) = inputs
            .par_iter()
            .map(|raw| self.resolve_record(raw.as_ref()))
            .fold(
                || (Vec::new(), ResolutionStats::new()),
                |(mut records, mut stats), record| {
                    stats.record_resolved(&record);
                    records.push(record);
                    (records, stats)
                },
            )
            .reduce(
                || (Vec::new(), ResolutionStats::new()),
                |(mut left, mut left_stats), (right, right_stats)| {
                    left.extend(right);
                    left_stats.merge(&right_stats);
                    (left, left_stats)
                },
            );

        log_batch(&stats);
        BatchOutcome { records, stats }
    }

    fn resolve_record(&self, raw: &str) -> ResolvedRecord {
        let resolution = self.resolve_traced(raw);
        ResolvedRecord {
            source: raw.to_string(),
            normalized: resolution.normalized.into_string(),
            result: resolution.result,
            area_hint: resolution.area_hint,
        }
    }

    fn run_tiers(&self, input: &NormalizedText, trace: &mut TierTrace) -> ResolutionResult {
        trace.enter(Tier::Exact);
        if let Some(id) = self.registry.lookup_exact(input) {
            return ResolutionResult::matched(id, Tier::Exact);
        }

        trace.enter(Tier::Substring);
        let ambiguous = match self.substring_match(input) {
            SubstringOutcome::Unique(id) => return ResolutionResult::matched(id, Tier::Substring),
            SubstringOutcome::Ambiguous(candidates) => {
                debug!(
                    input = %input,
                    candidates = candidates.len(),
                    "ambiguous substring match, trying fuzzy"
                );
                candidates
            }
            SubstringOutcome::None => Vec::new(),
        };

        // A fuzzy winner that was one of several embedded districts would be
        // an arbitrary pick between them.
        trace.enter(Tier::Fuzzy);
        match self.fuzzy_match(input) {
            Some(id) if !ambiguous.contains(&id) => ResolutionResult::matched(id, Tier::Fuzzy),
            Some(id) => {
                debug!(input = %input, district = id, "fuzzy winner is an ambiguous candidate");
                ResolutionResult::unmatched(UnmatchedReason::NoConfidentMatch)
            }
            None => ResolutionResult::unmatched(UnmatchedReason::NoConfidentMatch),
        }
    }

    /// Registry keys contained in the input, or the input contained in a key.
    ///
    /// A forward hit whose every occurrence sits inside the occurrence of a
    /// longer forward hit from another district is dropped, so `"성중앙동"`
    /// does not also count as `"중앙동"`.
    fn substring_match(&self, input: &NormalizedText) -> SubstringOutcome<'r> {
        let text = input.as_str();
        let min = self.config.min_substring_chars;
        let reverse_ok = input.char_len() >= min;

        let mut forward: Vec<(&'r RegistryKey, Vec<(usize, usize)>)> = Vec::new();
        let mut candidates: Vec<&'r str> = Vec::new();

        for key in self.registry.keys() {
            let k = key.key.as_str();
            if key.key.char_len() >= min && text.contains(k) {
                let spans = text
                    .match_indices(k)
                    .map(|(start, m)| (start, start + m.len()))
                    .collect();
                forward.push((key, spans));
            } else if reverse_ok && k.contains(text) {
                candidates.push(self.registry.district_of(key));
            }
        }

        for (key, spans) in &forward {
            let id = self.registry.district_of(key);
            let subsumed = spans.iter().all(|&(start, end)| {
                forward.iter().any(|(other, other_spans)| {
                    self.registry.district_of(other) != id
                        && other.key.as_str().len() > key.key.as_str().len()
                        && other_spans.iter().any(|&(s, e)| s <= start && end <= e)
                })
            });
            if !subsumed {
                candidates.push(id);
            }
        }

        candidates.sort_unstable();
        candidates.dedup();
        match candidates.len() {
            0 => SubstringOutcome::None,
            1 => SubstringOutcome::Unique(candidates[0]),
            _ => SubstringOutcome::Ambiguous(candidates),
        }
    }

    /// Best-scoring district by windowed normalised Levenshtein similarity.
    ///
    /// Returns a district only if its score exceeds the threshold and is
    /// strictly higher than every other district's.
    fn fuzzy_match(&self, input: &NormalizedText) -> Option<&'r str> {
        let tokens: Vec<&str> = input.tokens().collect();
        let mut best: BTreeMap<&'r str, f64> = BTreeMap::new();

        for key in self.registry.keys() {
            let score = window_similarity(input.as_str(), &tokens, &key.key);
            let entry = best.entry(self.registry.district_of(key)).or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }

        let mut ranked: Vec<(&'r str, f64)> = best.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (top_id, top_score) = *ranked.first()?;
        let runner_up = ranked.get(1).map(|&(_, s)| s).unwrap_or(0.0);
        if top_score > self.config.fuzzy_threshold && top_score > runner_up {
            Some(top_id)
        } else {
            debug!(
                input = %input,
                top_score,
                runner_up,
                "no confident fuzzy match"
            );
            None
        }
    }
}

/// Highest similarity between `key` and the whole input or any run of
/// input tokens whose length is within one token of the key's.
fn window_similarity(text: &str, tokens: &[&str], key: &NormalizedText) -> f64 {
    let k = key.as_str();
    let mut best = strsim::normalized_levenshtein(text, k);

    let key_tokens = key.tokens().count();
    let lo = key_tokens.saturating_sub(1).max(1);
    let hi = (key_tokens + 1).min(tokens.len());

    for width in lo..=hi {
        for window in tokens.windows(width) {
            let score = strsim::normalized_levenshtein(&window.join(" "), k);
            if score > best {
                best = score;
            }
        }
    }
    best
}

fn log_batch(stats: &ResolutionStats) {
    info!(
        attempts = stats.attempts,
        matched = stats.matches(),
        exact = stats.exact,
        substring = stats.substring,
        fuzzy = stats.fuzzy,
        success_rate = stats.success_rate(),
        "resolved batch"
    );
}
