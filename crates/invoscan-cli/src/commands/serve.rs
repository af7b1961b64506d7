//! Serve command - run the HTTP extraction service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::{info, warn};

use invoscan_core::{ApiKeyStore, StaticKeyStore};

use crate::engines::Engines;
use crate::server::{self, AppState};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (default from configuration)
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// File with one accepted API key per line
    #[arg(long)]
    api_keys: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let addr = args.addr.unwrap_or(config.server.addr);

    let keys = match args.api_keys.or_else(|| config.server.api_keys_file.clone()) {
        Some(path) => {
            let store = StaticKeyStore::from_file(&path)?;
            if store.is_empty() {
                anyhow::bail!("No API keys found in {}", path.display());
            }
            info!("Requiring API keys ({} configured)", store.len());
            Some(Arc::new(store) as Arc<dyn ApiKeyStore>)
        }
        None => {
            warn!("No API key file configured; the service accepts every request");
            None
        }
    };

    if std::env::var_os(&config.completion.api_key_env).is_none() {
        warn!(
            "{} is not set; every parse request will fail until it is",
            config.completion.api_key_env
        );
    }

    let engines = tokio::task::spawn_blocking(move || Engines::new(config)).await??;
    let state = AppState {
        engines: Arc::new(engines),
        keys,
    };

    server::start_server(addr, state).await
}
