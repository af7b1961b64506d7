//! Config command - inspect and create pipeline configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use invoscan_core::ScanConfig;
use invoscan_core::models::config::RenderBackend;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Report the effective configuration and whether its inputs are present
    Show(ShowArgs),

    /// Write a configuration file with the default settings
    Init(InitArgs),

    /// Print where the default configuration file lives
    Path,
}

#[derive(Args)]
struct ShowArgs {
    /// Print the raw configuration as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding the OCR model files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// File with the API keys the service accepts
    #[arg(long)]
    api_keys: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show(show_args) => show_config(show_args, config_path),
        ConfigCommand::Init(init_args) => init_config(init_args),
        ConfigCommand::Path => show_path(),
    }
}

/// `<config dir>/invoscan/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invoscan")
        .join("config.json")
}

/// The file the configuration is read from: `--config`, else the default
/// file when it exists. `None` means built-in defaults.
pub fn config_source(config_path: Option<&str>) -> Option<PathBuf> {
    match config_path {
        Some(path) => Some(PathBuf::from(path)),
        None => Some(default_config_path()).filter(|path| path.exists()),
    }
}

fn show_config(args: ShowArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", describe(&config, config_source(config_path).as_deref()));
    }

    Ok(())
}

fn presence(path: &Path) -> &'static str {
    if path.exists() { "found" } else { "missing" }
}

fn backend_name(backend: RenderBackend) -> &'static str {
    match backend {
        RenderBackend::Pdfium => "pdfium",
        RenderBackend::Embedded => "embedded page images",
    }
}

/// Human-readable report of what a run with `config` would use.
fn describe(config: &ScanConfig, source: Option<&Path>) -> String {
    let mut out = String::new();
    let mut row = |label: &str, value: String| out.push_str(&format!("  {:<16}{}\n", label, value));

    let (detection, recognition, dictionary) = config.ocr.model_paths();
    let render = &config.render;
    let completion = &config.completion;

    let header = match source {
        Some(path) => format!("Configuration: {}\n", path.display()),
        None => "Configuration: built-in defaults\n".to_string(),
    };

    row("renderer", format!("{} at {}x", backend_name(render.backend), render.magnification));
    if let Some(library) = &render.pdfium_library {
        row("pdfium library", library.display().to_string());
    }
    row("detection", format!("{} ({})", detection.display(), presence(&detection)));
    row("recognition", format!("{} ({})", recognition.display(), presence(&recognition)));
    row("dictionary", format!("{} ({})", dictionary.display(), presence(&dictionary)));
    let engine = if config.ocr.reuse_engine {
        "shared across documents"
    } else {
        "loaded per document"
    };
    row("ocr engine", engine.to_string());
    row(
        "line tolerance",
        format!(
            "{} px ({} px at 4x, {:?} baseline)",
            config.line_tolerance(),
            config.layout.line_tolerance,
            config.layout.baseline
        ),
    );
    row("model", format!("{} via {}", completion.model, completion.base_url));
    let key_state = if completion.api_key().is_ok() { "set" } else { "not set" };
    row("api key", format!("{} ({})", completion.api_key_env, key_state));
    row(
        "prompt limit",
        match completion.max_prompt_chars {
            0 => "unlimited".to_string(),
            n => format!("{} chars", n),
        },
    );
    row("listen", config.server.addr.to_string());
    row(
        "accepted keys",
        match &config.server.api_keys_file {
            Some(path) => format!("{} ({})", path.display(), presence(path)),
            None => "any request (no key file)".to_string(),
        },
    );

    header + &out
}

fn init_config(args: InitArgs) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut config = ScanConfig::default();
    if let Some(model_dir) = args.model_dir {
        config.ocr.model_dir = model_dir;
    }
    config.server.api_keys_file = args.api_keys;
    config.save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    let (detection, _, _) = config.ocr.model_paths();
    if !detection.exists() {
        println!(
            "{} OCR models not found under {}; set ocr.model_dir before processing.",
            style("!").yellow(),
            config.ocr.model_dir.display()
        );
    }

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Default configuration: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("in use when --config is not given").green());
    } else {
        println!("Status: {}", style("absent, built-in defaults apply").yellow());
        println!();
        println!("Run 'invoscan config init' to write one.");
    }

    Ok(())
}
