//! Developer CLI for declared slice files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use slicepack::file_config::load_slices;
use slicepack::{Action, Pack, Registry};
use slicepack_common::Config;
use slicepack_engine::ActionLog;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slicepack")]
#[command(about = "Inspect and replay declared slices")]
#[command(version)]
struct Cli {
    /// Log every dispatched action at info level
    #[arg(long, global = true, env = "SLICEPACK_LOGGER")]
    logger: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every slice's names and initial state
    Inspect {
        /// Slice file (TOML)
        file: PathBuf,
    },

    /// Dispatch a JSON array of actions and print the final state
    Replay {
        /// Slice file (TOML)
        file: PathBuf,

        /// JSON file holding an array of `{ "type": .., "payload": .. }` actions
        actions: PathBuf,

        /// Also print the dispatch log
        #[arg(long)]
        log: bool,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("slicepack=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?.with_logger(cli.logger);

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&config, &file),
        Commands::Replay { file, actions, log } => cmd_replay(&config, &file, &actions, log),
    }
}

fn load(config: &Config, file: &Path) -> Result<(Registry, Vec<Pack>)> {
    let registry = Registry::with_config(config);
    let packs = load_slices(file)?.register_all(&registry)?;
    info!(slices = packs.len(), buckets = ?registry.bucket_names(), "slices registered");
    Ok((registry, packs))
}

fn cmd_inspect(config: &Config, file: &Path) -> Result<()> {
    let (registry, packs) = load(config, file)?;

    let slices: Vec<Value> = packs
        .iter()
        .map(|pack| {
            json!({
                "name": pack.name(),
                "reducer_name": pack.spec().reducer_name,
                "template": pack.spec().template.as_str(),
                "stateNames": pack.state_names(),
                "actionNames": pack.action_names(),
                "initialState": pack.initial_state(),
            })
        })
        .collect();

    print_json(&json!({
        "slices": slices,
        "reducers": registry.reducers(),
        "initialState": registry.initial_state(),
    }))
}

fn cmd_replay(config: &Config, file: &Path, actions: &Path, show_log: bool) -> Result<()> {
    let (registry, _packs) = load(config, file)?;

    let content = std::fs::read_to_string(actions)
        .with_context(|| format!("Failed to read actions file: {}", actions.display()))?;
    let actions: Vec<Action> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse actions file: {}", actions.display()))?;

    registry.get_root_reducer(BTreeMap::new(), BTreeMap::new())?;
    let store = registry
        .store()
        .context("Registry did not create a store")?;
    let log = Arc::new(ActionLog::new());
    let store = store.with_sink(log.clone());

    for (index, action) in actions.into_iter().enumerate() {
        let action_type = action.action_type.clone();
        store
            .dispatch(action)
            .with_context(|| format!("Action #{index} (`{action_type}`) failed"))?;
    }

    let mut out = json!({ "state": store.state().to_value() });
    if show_log {
        out["log"] = serde_json::to_value(log.entries())?;
    }
    print_json(&out)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
