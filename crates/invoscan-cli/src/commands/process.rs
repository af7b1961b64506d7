//! Process command - extract an invoice record from a single PDF.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invoscan_core::{InvoiceRecord, Upload};

use crate::engines::Engines;
use crate::progress::{ProgressObserver, document_bar};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also print the reconstructed document text
    #[arg(long)]
    show_text: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON record
    Json,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let upload = Upload::from_path(&args.input)?;

    let pb = document_bar();
    pb.set_message("Loading engines...");
    let observer = Arc::new(ProgressObserver::new(pb.clone()));

    let record = tokio::task::spawn_blocking(move || -> anyhow::Result<InvoiceRecord> {
        let pipeline = Engines::new(config)?.pipeline()?.with_observer(observer);
        Ok(pipeline.parse(upload)?)
    })
    .await??;

    pb.finish_with_message("Done");

    let output = format_record(&record, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.show_text {
        println!();
        println!("{}", style("Document text:").bold());
        print!("{}", record.invoice_text);
    }

    let missing = record.missing_fields();
    if !missing.is_empty() {
        eprintln!(
            "{} No value for: {}",
            style("ℹ").blue(),
            missing.join(", ")
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_record(record: &InvoiceRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(record)?),
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_text(record: &InvoiceRecord) -> String {
    let invoice = &record.invoice;
    let mut output = String::new();

    output.push_str(&format!("File: {}\n", record.file_name));
    output.push_str(&format!("{}: {}\n", invoice.invoice_title, invoice.invoice_number));
    output.push_str(&format!("Date: {}\n", invoice.invoice_date));
    output.push('\n');

    output.push_str("Bill to:\n");
    output.push_str(&format!("  {}\n", invoice.invoice_destination_name));
    output.push_str(&format!("  {}\n", invoice.invoice_destination_address));
    output.push('\n');

    let items = invoice.invoice_items.as_slice();
    if !items.is_empty() {
        output.push_str("Items:\n");
        for item in items {
            output.push_str(&format!(
                "  {} | {} x {} = {}\n",
                item.description, item.quantity, item.unit_cost, item.total_cost
            ));
        }
        output.push('\n');
    }

    output.push_str("Summary:\n");
    output.push_str(&format!("  Total:       {}\n", invoice.total_cost));
    output.push_str(&format!("  Taxes:       {}\n", invoice.taxes));
    output.push_str(&format!("  Grand total: {}\n", invoice.grand_total));
    output.push_str(&format!("  Payment:     {}\n", invoice.payment_method));

    output
}
