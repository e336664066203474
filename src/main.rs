use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};

mod aggregate;
mod config;
mod correction;
mod error;
mod increments;
mod io;
mod iqr;
mod logging;
mod models;
mod pipeline;
mod report;
mod weeks;

use config::{AggregationMode, PipelineConfig};

#[derive(Parser)]
#[command(name = "epiweek-series")]
#[command(about = "Turns weekly cumulative case counts into a clean weekly incremental series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the aggregated table
    #[command(group(
        ArgGroup::new("clipping")
            .args(["clip", "no_clip"])
            .multiple(false)
    ))]
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// YAML pipeline configuration
        #[arg(long = "config")]
        config_path: Option<PathBuf>,
        /// by_time | by_time_and_region
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        clip: bool,
        #[arg(long)]
        no_clip: bool,
        /// Column to clip; repeat for several columns
        #[arg(long = "column")]
        columns: Vec<String>,
        #[arg(long)]
        factor: Option<f64>,
        /// Write a markdown audit report
        #[arg(long = "report")]
        report_path: Option<PathBuf>,
        /// Write the run counters as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Print IQR fences of one column of the corrected table
    Fences {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        column: String,
        #[arg(long, default_value_t = config::DEFAULT_IQR_FACTOR)]
        factor: f64,
    },
    /// Validate the input table without writing anything
    Check {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            out,
            config_path,
            mode,
            clip,
            no_clip,
            columns,
            factor,
            report_path,
            summary_json,
        } => {
            let mut settings = match &config_path {
                Some(path) => PipelineConfig::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(mode) = mode {
                settings.aggregation = AggregationMode::parse(&mode);
            }
            if clip {
                settings.outliers.enabled = true;
            }
            if no_clip {
                settings.outliers.enabled = false;
            }
            if !columns.is_empty() {
                settings.outliers.columns = columns;
            }
            if let Some(factor) = factor {
                settings.outliers.factor = factor;
            }

            let records = load(&input)?;
            let output = pipeline::run(records, &settings).context("pipeline aborted")?;

            if output.rows.is_empty() {
                tracing::warn!(path = %out.display(), "aggregation is empty, output not written");
                println!("No aggregated rows; {} was not written.", out.display());
            } else {
                io::write_aggregated(&out, &output.rows)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Wrote {} rows to {}.", output.rows.len(), out.display());
            }

            if let Some(path) = report_path {
                let body = report::build_report(
                    &input.display().to_string(),
                    &output.audit,
                    &output.rows,
                );
                std::fs::write(&path, body)
                    .with_context(|| format!("failed to write report {}", path.display()))?;
                println!("Report written to {}.", path.display());
            }
            if let Some(path) = summary_json {
                io::write_json(&path, &output.audit)
                    .with_context(|| format!("failed to write summary {}", path.display()))?;
            }
        }
        Commands::Fences {
            input,
            column,
            factor,
        } => {
            let records = load(&input)?;
            let (table, _, _) = pipeline::correct(records).context("pipeline aborted")?;
            let (resolved, stats) = iqr::column_stats(&table, &column, factor)?;
            let outliers = iqr::outlier_indices(&table, resolved, &stats);

            println!("IQR fences for {resolved} (factor {factor}):");
            println!("- Q1 {:.3}, Q3 {:.3}, IQR {:.3}", stats.q1, stats.q3, stats.iqr);
            println!(
                "- lower {:.3}, upper {:.3}",
                stats.lower_fence, stats.upper_fence
            );
            println!("- {} of {} rows outside the fences", outliers.len(), table.len());
        }
        Commands::Check { input } => {
            let records = load(&input)?;
            weeks::validate(&records).context("input failed validation")?;

            let regions: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();
            let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
            println!(
                "{} rows, {} regions, years {}",
                records.len(),
                regions.len(),
                match (years.first(), years.last()) {
                    (Some(first), Some(last)) => format!("{first}-{last}"),
                    _ => "none".to_string(),
                }
            );
        }
    }

    Ok(())
}

fn load(input: &Path) -> anyhow::Result<Vec<models::Record>> {
    io::load_records(input).with_context(|| format!("failed to read {}", input.display()))
}
