//! Vertical card display for resolved evalNm records.
//!
//! Renders one row of a resolution RecordBatch as a grouped, human-readable
//! card, skipping sections whose columns are all null.

use std::fmt::Write;

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use safeground_core::Tier;

const INPUT: &[&str] = &["source", "normalized"];

const OUTCOME: &[&str] = &["outcome", "district_id", "tier", "reason", "area_hint"];

/// Lookup context the batch itself does not carry.
#[derive(Debug, Default)]
pub struct CardContext<'a> {
    pub district_name: Option<&'a str>,
    pub consulted: &'a [Tier],
}

// ── Public API ──

/// Render row `row` of a resolution batch as a card.
pub fn render_resolution_card(batch: &RecordBatch, row: usize, ctx: &CardContext<'_>) -> String {
    let mut out = String::new();
    let source = get_utf8(batch, "source", row).unwrap_or_default();

    let _ = writeln!(out, "=== {source} ===");
    let _ = writeln!(out);

    render_section(&mut out, batch, row, "Input", INPUT);
    render_section(&mut out, batch, row, "Outcome", OUTCOME);

    if ctx.district_name.is_some() || !ctx.consulted.is_empty() {
        let _ = writeln!(out, "Detail");
        if let Some(name) = ctx.district_name {
            let _ = writeln!(out, "  {:<14} {}", "district_name", name);
        }
        if !ctx.consulted.is_empty() {
            let tiers: Vec<&str> = ctx.consulted.iter().map(Tier::as_str).collect();
            let _ = writeln!(out, "  {:<14} {}", "consulted", tiers.join(" -> "));
        }
    }
    out
}

// ── Section rendering ──

fn render_section(out: &mut String, batch: &RecordBatch, row: usize, header: &str, cols: &[&str]) {
    let values: Vec<(&str, String)> = cols
        .iter()
        .filter_map(|&col| get_utf8(batch, col, row).map(|v| (col, v)))
        .collect();
    if values.is_empty() {
        return;
    }

    let _ = writeln!(out, "{header}");
    for (col, value) in values {
        let shown = if value.is_empty() { "(empty)" } else { value.as_str() };
        let _ = writeln!(out, "  {col:<14} {shown}");
    }
    let _ = writeln!(out);
}

// ── Column helpers ──

fn get_utf8(batch: &RecordBatch, col_name: &str, row: usize) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    let col = batch.column(idx);
    if row >= col.len() || col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use safeground_core::schema::records_to_batch;
    use safeground_core::{DistrictRecord, Registry, Resolver};

    fn batch(inputs: &[&str]) -> RecordBatch {
        let registry =
            Registry::load(vec![DistrictRecord::new("11110", "종로구 청운동")]).unwrap();
        let outcome = Resolver::with_defaults(&registry).resolve_batch(inputs);
        records_to_batch(&outcome.records).unwrap()
    }

    #[test]
    fn matched_card_shows_district_and_trace() {
        let batch = batch(&["서울 종로구 청운동 지반침하"]);
        let ctx = CardContext {
            district_name: Some("종로구 청운동"),
            consulted: &[Tier::Exact, Tier::Substring],
        };
        let card = render_resolution_card(&batch, 0, &ctx);
        assert!(card.starts_with("=== 서울 종로구 청운동 지반침하 ==="));
        assert!(card.contains("district_id    11110"));
        assert!(card.contains("tier           substring"));
        assert!(card.contains("consulted      exact -> substring"));
        assert!(!card.contains("reason"));
    }

    #[test]
    fn unmatched_card_shows_reason_only() {
        let batch = batch(&["", "종로구 청운동"]);
        let card = render_resolution_card(&batch, 0, &CardContext::default());
        assert!(card.contains("source         (empty)"));
        assert!(card.contains("reason         empty_or_noise"));
        assert!(!card.contains("district_id"));
        assert!(!card.contains("Detail"));
    }

    #[test]
    fn unmatched_card_shows_area_hint() {
        let registry = Registry::load(vec![
            DistrictRecord::new("11110", "종로구 청운동"),
            DistrictRecord::new("11680510", "강남구 신사동"),
        ])
        .unwrap();
        let outcome = Resolver::with_defaults(&registry).resolve_batch(["강남구 역삼동 지반침하"]);
        let batch = records_to_batch(&outcome.records).unwrap();
        let card = render_resolution_card(&batch, 0, &CardContext::default());
        assert!(card.contains("reason         no_confident_match"));
        assert!(card.contains("area_hint      강남구"));
    }

    #[test]
    fn out_of_range_row_renders_nothing_but_header() {
        let batch = batch(&["종로구 청운동"]);
        let card = render_resolution_card(&batch, 5, &CardContext::default());
        assert_eq!(card.trim(), "===  ===");
    }
}
