mod display;
mod reference;
mod report;
mod samples;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use safeground_core::schema::records_to_batch;
use safeground_core::{
    AcceptanceReport, DEFAULT_TARGET_RATE, Registry, ResolvedRecord, Resolver, ResolverConfig,
    normalize,
};
use tracing::{info, warn};

use crate::display::CardContext;

#[derive(Parser, Debug)]
#[command(name = "safeground")]
#[command(about = "Resolve evalNm free text to administrative districts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a JSON array of evalNm strings and report the success rate
    Resolve {
        #[command(flatten)]
        reference: Reference,

        /// JSON array of raw evalNm strings
        #[arg(long, short = 'i', value_name = "FILE")]
        input: PathBuf,

        /// Write the full JSON report here
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write resolved rows as an Arrow IPC file
        #[arg(long, value_name = "FILE")]
        arrow: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,

        /// Success rate the batch must reach
        #[arg(long, env = "SAFEGROUND_TARGET_RATE", default_value_t = DEFAULT_TARGET_RATE)]
        target: f64,

        /// Resolve on all cores
        #[arg(long)]
        parallel: bool,

        /// Exit non-zero when the target is missed
        #[arg(long)]
        strict: bool,

        /// Review-queue entries to list
        #[arg(long, value_name = "N", default_value_t = 10)]
        show_unmatched: usize,

        /// Print every resolved row as a table
        #[arg(long)]
        table: bool,
    },

    /// Resolve a single string and show how it was matched
    Lookup {
        #[command(flatten)]
        reference: Reference,

        #[command(flatten)]
        tuning: Tuning,

        /// Raw evalNm text
        text: String,
    },

    /// Print the normalised form of a string
    Normalize {
        /// Raw text
        text: String,
    },
}

#[derive(Args, Debug)]
struct Reference {
    /// District reference table (CSV: code,gu,dong[,aliases])
    #[arg(long, short = 'd', value_name = "CSV")]
    districts: PathBuf,

    /// Also index each dong name that is unique across the table
    #[arg(long)]
    bare_dong_aliases: bool,
}

impl Reference {
    fn load(&self) -> anyhow::Result<Registry> {
        let records = reference::load_districts(&self.districts, self.bare_dong_aliases)?;
        Registry::load(records)
            .with_context(|| format!("building registry from {}", self.districts.display()))
    }
}

#[derive(Args, Debug)]
struct Tuning {
    /// Similarity a fuzzy match must exceed, in (0, 1]; 1.0 disables fuzzy
    #[arg(long, env = "SAFEGROUND_FUZZY_THRESHOLD", default_value_t = 0.80)]
    threshold: f64,

    /// Shortest key or input eligible for substring matching
    #[arg(long, value_name = "N", default_value_t = 2)]
    min_substring_chars: usize,
}

impl Tuning {
    fn config(&self) -> ResolverConfig {
        ResolverConfig {
            fuzzy_threshold: self.threshold,
            min_substring_chars: self.min_substring_chars,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    info!("safeground v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Command::Resolve {
            reference,
            input,
            output,
            arrow,
            tuning,
            target,
            parallel,
            strict,
            show_unmatched,
            table,
        } => {
            let registry = reference.load()?;
            let resolver = Resolver::new(&registry, tuning.config())?;
            let inputs = samples::load_samples(&input)?;

            let outcome = if parallel {
                resolver.par_resolve_batch(&inputs)
            } else {
                resolver.resolve_batch(&inputs)
            };
            let acceptance = AcceptanceReport::evaluate(&outcome.stats, target);

            if table {
                print_table(&outcome.records)?;
            }
            print!("{}", report::render_summary(&outcome, &acceptance, show_unmatched));

            if let Some(path) = output {
                samples::write_report(&path, &outcome, &acceptance)?;
            }
            if let Some(path) = arrow {
                samples::write_arrow(&path, &outcome.records)?;
            }

            if !acceptance.passed {
                warn!(
                    success_rate = acceptance.success_rate,
                    target = acceptance.target,
                    "success rate below target"
                );
                if strict {
                    return Ok(ExitCode::FAILURE);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Lookup {
            reference,
            tuning,
            text,
        } => {
            let registry = reference.load()?;
            let resolver = Resolver::new(&registry, tuning.config())?;
            let resolution = resolver.resolve_traced(&text);

            let district_name = resolution
                .result
                .district_id()
                .and_then(|id| registry.get(id))
                .map(|d| d.name.as_str());
            let record = ResolvedRecord {
                source: text,
                normalized: resolution.normalized.into_string(),
                result: resolution.result,
                area_hint: resolution.area_hint,
            };
            let batch = records_to_batch(std::slice::from_ref(&record))?;
            let ctx = CardContext {
                district_name,
                consulted: resolution.trace.consulted(),
            };
            print!("{}", display::render_resolution_card(&batch, 0, &ctx));
            Ok(ExitCode::SUCCESS)
        }

        Command::Normalize { text } => {
            println!("{}", normalize(&text));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_table(records: &[ResolvedRecord]) -> anyhow::Result<()> {
    let batch = records_to_batch(records)?;
    let table = arrow::util::pretty::pretty_format_batches(&[batch])?;
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_defaults() {
        let cli = Cli::try_parse_from([
            "safeground",
            "resolve",
            "--districts",
            "seoul.csv",
            "--input",
            "samples.json",
        ])
        .unwrap();
        match cli.command {
            Command::Resolve {
                tuning,
                parallel,
                strict,
                show_unmatched,
                ..
            } => {
                assert_eq!(tuning.config(), ResolverConfig::default());
                assert!(!parallel);
                assert!(!strict);
                assert_eq!(show_unmatched, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lookup_takes_tuning_flags() {
        let cli = Cli::try_parse_from([
            "safeground",
            "lookup",
            "-d",
            "seoul.csv",
            "--threshold",
            "0.9",
            "--bare-dong-aliases",
            "종로구 청운동",
        ])
        .unwrap();
        match cli.command {
            Command::Lookup {
                reference,
                tuning,
                text,
            } => {
                assert!(reference.bare_dong_aliases);
                assert_eq!(tuning.threshold, 0.9);
                assert_eq!(text, "종로구 청운동");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn resolve_requires_input() {
        assert!(Cli::try_parse_from(["safeground", "resolve", "-d", "seoul.csv"]).is_err());
    }
}
