//! Reference district table: `code,gu,dong[,aliases]` CSV (the 424-dong table).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use safeground_core::{DistrictRecord, normalize};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct DongRow {
    #[serde(alias = "id", alias = "adm_cd")]
    code: String,
    #[serde(alias = "district", alias = "sigungu")]
    gu: String,
    #[serde(alias = "name", alias = "adm_nm")]
    dong: String,
    /// `|`-separated alternate names.
    #[serde(default)]
    aliases: Option<String>,
}

/// Load the district table from a CSV file.
pub fn load_districts(path: &Path, bare_dong_aliases: bool) -> anyhow::Result<Vec<DistrictRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let records = read_districts(file, bare_dong_aliases)
        .with_context(|| format!("reading district table {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "read district table");
    Ok(records)
}

/// Parse district rows. Each record's name is `"{gu} {dong}"`.
///
/// With `bare_dong_aliases`, a dong name that occurs once in the whole table
/// is also registered as an alias, so evalNm text that omits the gu can still
/// match. Repeated dong names (e.g. `신사동` in both 강남구 and 관악구) are
/// left out.
pub fn read_districts<R: Read>(
    reader: R,
    bare_dong_aliases: bool,
) -> anyhow::Result<Vec<DistrictRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, row) in rdr.deserialize::<DongRow>().enumerate() {
        // Header is line 1.
        let row = row.with_context(|| format!("line {}", i + 2))?;
        rows.push(row);
    }

    let mut dong_counts: HashMap<String, usize> = HashMap::new();
    if bare_dong_aliases {
        for row in &rows {
            *dong_counts
                .entry(normalize(&row.dong).into_string())
                .or_default() += 1;
        }
    }

    let records = rows
        .into_iter()
        .map(|row| {
            let mut record = DistrictRecord::new(row.code, format!("{} {}", row.gu, row.dong));
            if let Some(aliases) = &row.aliases {
                record.aliases.extend(
                    aliases
                        .split('|')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string),
                );
            }
            if bare_dong_aliases && dong_counts.get(normalize(&row.dong).as_str()) == Some(&1) {
                record.aliases.insert(row.dong);
            }
            record
        })
        .collect();

    Ok(records)
}
