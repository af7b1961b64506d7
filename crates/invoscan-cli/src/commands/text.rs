//! Text command - print the reconstructed document text without calling the model.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;

use crate::engines::Engines;
use crate::progress::{ProgressObserver, document_bar};

/// Arguments for the text command.
#[derive(Args)]
pub struct TextArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let bytes = fs::read(&args.input)?;

    let pb = document_bar();
    pb.set_message("Loading engines...");
    let observer = Arc::new(ProgressObserver::new(pb.clone()));

    let text = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let reader = Engines::new(config)?.reader()?.with_observer(observer);
        Ok(reader.document_text(bytes)?)
    })
    .await??;

    pb.finish_and_clear();

    match &args.output {
        Some(output_path) => {
            fs::write(output_path, &text)?;
            println!("{} Text written to {}", style("✓").green(), output_path.display());
        }
        None => print!("{}", text),
    }

    Ok(())
}
