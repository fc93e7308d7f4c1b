// Path: crates/node/src/bin/statefilld.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

use anyhow::Result;
use clap::Parser;
use statefill_engine::Supervisor;
use statefill_storage::{KvStore, RedbStore};
use statefill_types::config::{FillConfig, TrxFilter};
use statefill_types::error::{ConfigError, ErrorCode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[clap(name = "statefilld", about = "Fills an embedded store from a state-history stream")]
struct FillOpts {
    /// TOML config file; flags override file values.
    #[clap(long)]
    config: Option<PathBuf>,
    /// The upstream state-history endpoint, host:port.
    #[clap(long, env = "STATEFILL_CONNECT_TO")]
    connect_to: Option<String>,
    /// Directory holding the store.
    #[clap(long)]
    data_dir: Option<PathBuf>,
    /// Start no earlier than this block.
    #[clap(long)]
    skip_to: Option<u32>,
    /// Exit cleanly when reaching this block (0 disables).
    #[clap(long)]
    stop_before: Option<u32>,
    /// Row filter, `[+|-]contract[:action]`; includes whitelist, a matching
    /// exclude always drops. Repeatable.
    #[clap(long = "filter")]
    filters: Vec<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct NodeConfig {
    connect_to: Option<String>,
    data_dir: Option<PathBuf>,
    #[serde(default)]
    skip_to: u32,
    #[serde(default)]
    stop_before: u32,
    #[serde(default)]
    filters: Vec<String>,
}

fn assemble(opts: FillOpts, file: NodeConfig) -> Result<(FillConfig, PathBuf)> {
    let connect_to = opts
        .connect_to
        .or(file.connect_to)
        .ok_or(ConfigError::MissingEndpoint)?;

    let filter_strings = if opts.filters.is_empty() { file.filters } else { opts.filters };
    let trx_filters = filter_strings
        .iter()
        .map(|raw| raw.parse::<TrxFilter>())
        .collect::<Result<Vec<_>, _>>()?;

    let config = FillConfig {
        connect_to,
        skip_to: opts.skip_to.unwrap_or(file.skip_to),
        stop_before: opts.stop_before.unwrap_or(file.stop_before),
        trx_filters,
    };
    // Surface a bad endpoint before touching the store.
    config.endpoint()?;

    let data_dir = opts
        .data_dir
        .or(file.data_dir)
        .unwrap_or_else(|| PathBuf::from("statefill-data"));
    Ok((config, data_dir))
}

#[tokio::main]
async fn main() -> Result<()> {
    statefill_telemetry::init::init_tracing()?;

    let opts = FillOpts::parse();
    let file = match &opts.config {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => NodeConfig::default(),
    };
    let (config, data_dir) = assemble(opts, file)?;
    tracing::info!(
        target: "statefilld",
        event = "startup",
        connect_to = %config.connect_to,
        skip_to = config.skip_to,
        stop_before = config.stop_before,
        data_dir = %data_dir.display()
    );

    std::fs::create_dir_all(&data_dir)?;
    let store = RedbStore::open(&data_dir.join("statefill.redb"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "statefilld", "interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let supervisor = Supervisor::new(config, Arc::new(store) as Arc<dyn KvStore>, shutdown_rx);
    if let Err(e) = supervisor.run().await {
        tracing::error!(target: "statefilld", code = e.code(), error = %e, "fatal");
        return Err(e.into());
    }

    tracing::info!(target: "statefilld", "statefilld stopped");
    Ok(())
}
