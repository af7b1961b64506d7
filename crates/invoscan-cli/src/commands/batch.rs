//! Batch processing command for multiple invoice PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use invoscan_core::{InvoiceRecord, Upload};

use super::process::{OutputFormat, format_record};
use crate::engines::Engines;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input PDFs
    #[arg(required = true)]
    input: String,

    /// Output directory for one record per input file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write summary.json with one entry per file
    #[arg(long)]
    summary: bool,

    /// Number of documents processed at once
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    outcome: Result<InvoiceRecord, String>,
    processing_time_ms: u64,
}

#[derive(Serialize)]
struct SummaryEntry<'a> {
    file: String,
    status: &'static str,
    processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_fields: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    if let Ok(bar_style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
    {
        overall_pb.set_style(bar_style.progress_chars("=>-"));
    }

    let engines = Arc::new(tokio::task::spawn_blocking(move || Engines::new(config)).await??);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut tasks = JoinSet::new();
    for path in files {
        let engines = Arc::clone(&engines);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let file_start = Instant::now();
            let file = path.clone();
            let outcome = tokio::task::spawn_blocking(move || process_file(&engines, &file)).await?;
            anyhow::Ok(FileResult {
                path,
                outcome: outcome.map_err(|e| e.to_string()),
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            })
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined??;
        overall_pb.inc(1);

        match &result.outcome {
            Ok(record) => {
                if let Some(output_dir) = &args.output_dir {
                    let output_path = output_path(output_dir, &result.path, args.format);
                    fs::write(&output_path, format_record(record, args.format)?)?;
                    debug!("Wrote output to {}", output_path.display());
                }
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", result.path.display(), e);
            }
            Err(e) => {
                error!("Failed to process {}: {}", result.path.display(), e);
                overall_pb.abandon();
                anyhow::bail!("Processing failed: {}: {}", result.path.display(), e);
            }
        }

        results.push(result);
    }

    overall_pb.finish_with_message("Complete");
    results.sort_by(|a, b| a.path.cmp(&b.path));

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.json"))
            .unwrap_or_else(|| PathBuf::from("summary.json"));

        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<_> = results.iter().filter(|r| r.outcome.is_err()).collect();
    let successful = results.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Err(e) = &result.outcome {
                println!("  - {}: {}", result.path.display(), e);
            }
        }
    }

    Ok(())
}

fn process_file(engines: &Engines, path: &Path) -> anyhow::Result<InvoiceRecord> {
    let upload = Upload::from_path(path)?;
    Ok(engines.pipeline()?.parse(upload)?)
}

fn output_path(output_dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let entries: Vec<SummaryEntry<'_>> = results
        .iter()
        .map(|result| {
            let file = result
                .path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match &result.outcome {
                Ok(record) => SummaryEntry {
                    file,
                    status: "success",
                    processing_time_ms: result.processing_time_ms,
                    missing_fields: Some(record.missing_fields()),
                    error: None,
                },
                Err(e) => SummaryEntry {
                    file,
                    status: "error",
                    processing_time_ms: result.processing_time_ms,
                    missing_fields: None,
                    error: Some(e.as_str()),
                },
            }
        })
        .collect();

    fs::write(path, serde_json::to_string_pretty(&entries)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_uses_stem_and_format() {
        let path = output_path(Path::new("out"), Path::new("scans/inv-01.pdf"), OutputFormat::Text);
        assert_eq!(path, PathBuf::from("out/inv-01.txt"));
    }
}
