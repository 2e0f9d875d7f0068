//! Plain-text batch summary for the terminal.

use std::fmt::Write;

use safeground_core::{AcceptanceReport, BatchOutcome, Tier};

/// Render counters, tier breakdown, and the acceptance verdict.
///
/// Lists up to `show_unmatched` review-queue entries.
pub fn render_summary(
    outcome: &BatchOutcome,
    acceptance: &AcceptanceReport,
    show_unmatched: usize,
) -> String {
    let stats = &outcome.stats;
    let mut out = String::new();

    let _ = writeln!(out, "Resolution summary ({} records)", stats.attempts);
    let _ = writeln!(
        out,
        "  success rate   {:>6.1}%  ({} matched, {} unmatched)",
        stats.success_rate() * 100.0,
        stats.matches(),
        stats.misses()
    );
    let _ = writeln!(
        out,
        "  area rate      {:>6.1}%  ({} unmatched named a single gu)",
        stats.area_rate() * 100.0,
        stats.area_only
    );

    let _ = writeln!(out, "\nBy tier");
    for tier in Tier::CONSULT_ORDER {
        let count = stats.tier_count(tier);
        let share = if stats.attempts == 0 {
            0.0
        } else {
            count as f64 / stats.attempts as f64 * 100.0
        };
        let _ = writeln!(out, "  {:<10} {:>6}  ({share:>5.1}%)", tier.as_str(), count);
    }

    let _ = writeln!(out, "\nUnmatched");
    for (reason, count) in stats.miss_breakdown() {
        let _ = writeln!(out, "  {:<19} {:>6}", reason.as_str(), count);
    }

    let queue: Vec<_> = outcome.review_queue().collect();
    if !queue.is_empty() && show_unmatched > 0 {
        let _ = writeln!(
            out,
            "\nReview queue (first {} of {})",
            show_unmatched.min(queue.len()),
            queue.len()
        );
        for (record, reason) in queue.iter().take(show_unmatched) {
            match &record.area_hint {
                Some(area) => {
                    let _ = writeln!(out, "  [{reason}] {} (area {area})", record.source);
                }
                None => {
                    let _ = writeln!(out, "  [{reason}] {}", record.source);
                }
            }
        }
    }

    let _ = writeln!(out, "\nVerdict");
    let verdict = if acceptance.passed { "PASS" } else { "FAIL" };
    let _ = writeln!(
        out,
        "  {verdict}: {:.1}% vs target {:.1}%",
        acceptance.success_rate * 100.0,
        acceptance.target * 100.0
    );
    if acceptance.passed && acceptance.fuzzy_share > 0.5 {
        let _ = writeln!(
            out,
            "  note: {:.1}% of matches are fuzzy; review before relying on this rate",
            acceptance.fuzzy_share * 100.0
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use safeground_core::{DistrictRecord, Registry, Resolver};

    fn summary(inputs: &[&str], target: f64, show: usize) -> String {
        let registry = Registry::load(vec![
            DistrictRecord::new("11110", "종로구 청운동"),
            DistrictRecord::new("11110530", "종로구 사직동"),
        ])
        .unwrap();
        let resolver = Resolver::with_defaults(&registry);
        let outcome = resolver.resolve_batch(inputs);
        let acceptance = AcceptanceReport::evaluate(&outcome.stats, target);
        render_summary(&outcome, &acceptance, show)
    }

    #[test]
    fn passing_batch() {
        let text = summary(&["종로구 청운동", "종로구 사직동 인근", "", "종로구 청운동 일대"], 0.7, 5);
        assert!(text.contains("Resolution summary (4 records)"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("PASS"));
        assert!(text.contains("[empty_or_noise] "));
    }

    #[test]
    fn failing_batch_lists_limited_review_queue() {
        let text = summary(&["하수관 정비", "도로 보수", "종로구 청운동"], 0.7, 1);
        assert!(text.contains("FAIL"));
        assert!(text.contains("Review queue (first 1 of 2)"));
        assert!(text.contains("[no_confident_match] 하수관 정비"));
        assert!(!text.contains("도로 보수"));
    }

    #[test]
    fn area_only_misses_are_reported() {
        let text = summary(&["종로구 역사동 지반침하", "하수관 정비"], 0.7, 5);
        assert!(text.contains("FAIL"));
        assert!(text.contains("(1 unmatched named a single gu)"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("[no_confident_match] 종로구 역사동 지반침하 (area 종로구)"));
        assert!(text.contains("[no_confident_match] 하수관 정비\n"));
    }

    #[test]
    fn fuzzy_heavy_pass_is_flagged() {
        let text = summary(&["종로구 청운둥", "종로구 사직둥"], 0.7, 0);
        assert!(text.contains("PASS"));
        assert!(text.contains("are fuzzy"));
        assert!(!text.contains("Review queue"));
    }
}
