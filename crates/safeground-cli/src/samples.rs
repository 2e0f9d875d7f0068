//! evalNm sample input and resolution report output.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use arrow::ipc::writer::FileWriter;
use safeground_core::schema::{records_to_batch, resolution_schema};
use safeground_core::{AcceptanceReport, BatchOutcome, ResolutionStats, ResolvedRecord, Tier};
use serde::Serialize;
use tracing::info;

/// Load raw evalNm strings from a JSON array.
///
/// `null` entries are kept as empty strings so that every fetched record
/// still shows up in the report.
pub fn load_samples(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let raw: Vec<Option<String>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {} as a JSON array of strings", path.display()))?;
    let samples: Vec<String> = raw.into_iter().map(Option::unwrap_or_default).collect();
    info!(count = samples.len(), path = %path.display(), "loaded evalNm samples");
    Ok(samples)
}

#[derive(Serialize)]
struct ResolutionReport<'a> {
    results: &'a [ResolvedRecord],
    stats: &'a ResolutionStats,
    tier_breakdown: BTreeMap<Tier, u64>,
    acceptance: &'a AcceptanceReport,
    total_count: usize,
}

/// Write the full batch (records, counters, verdict) as pretty JSON.
pub fn write_report(
    path: &Path,
    outcome: &BatchOutcome,
    acceptance: &AcceptanceReport,
) -> anyhow::Result<()> {
    let report = ResolutionReport {
        results: &outcome.records,
        stats: &outcome.stats,
        tier_breakdown: outcome.stats.tier_breakdown(),
        acceptance,
        total_count: outcome.records.len(),
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report).context("serialising report")?;
    writer.flush()?;
    info!(path = %path.display(), "wrote resolution report");
    Ok(())
}

/// Write resolved records as an Arrow IPC file for the storage layer.
pub fn write_arrow(path: &Path, records: &[ResolvedRecord]) -> anyhow::Result<()> {
    let batch = records_to_batch(records).context("building resolution batch")?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = FileWriter::try_new(file, &resolution_schema())?;
    writer.write(&batch)?;
    writer.finish()?;
    info!(rows = batch.num_rows(), path = %path.display(), "wrote arrow file");
    Ok(())
}
