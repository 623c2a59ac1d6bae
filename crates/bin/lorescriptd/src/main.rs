//! # lorescriptd: lorebook script daemon
//!
//! Composition root that wires the adapters together and drives the
//! activation engine from the command line.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Install the tracing subscriber (stderr; stdout carries results)
//! - Construct the filesystem host and the Lua runner (adapters)
//! - Construct the engine and services, injecting adapters via port traits
//! - Feed host events in and print activation batches out
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! No domain logic belongs here.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use lorescript_adapter_script_lua_mlua::LuaScriptRunner;
use lorescript_adapter_storage_fs::{FsLorebookRepository, FsSessionSource};
use lorescript_app::activation_engine::ActivationEngine;
use lorescript_app::event_bus::{ActivationQueue, InProcessEventBus};
use lorescript_app::services::script_service::ScriptService;
use lorescript_domain::event::{ActivationBatch, ActivationTrigger, HostEvent};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "lorescriptd", version, about = "Script-driven lorebook activation")]
struct Cli {
    /// Configuration file (defaults to `lorescript.toml` when present).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read host events as JSON lines on stdin, print one batch per line.
    Run,
    /// Run activation once against the current session.
    Activate {
        /// Answer a swipe instead of a new message.
        #[arg(long)]
        swiped: bool,
    },
    /// Reconcile the two script attachment locations of a lorebook.
    Normalize { name: String },
    /// Read or replace a lorebook's script.
    #[command(subcommand)]
    Script(ScriptCommand),
}

#[derive(Debug, Subcommand)]
enum ScriptCommand {
    /// Print the script source.
    Get { name: String },
    /// Store a script read from `--file` or stdin.
    Set {
        name: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

type Engine = ActivationEngine<FsSessionSource, FsLorebookRepository, LuaScriptRunner, ActivationQueue>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.logging.filter);
    tracing::debug!(?config, "configuration loaded");

    // Adapters
    let repo = FsLorebookRepository::new(&config.storage.lorebook_dir);
    let session = FsSessionSource::new(&config.storage.session_file);
    let runner = LuaScriptRunner::new(config.runner_config());
    let policy = config.script.attachment_policy;

    match cli.command {
        Command::Run => {
            let (batches, printed) = ActivationQueue::new(config.events.capacity);
            let engine = ActivationEngine::new(session, repo, runner, batches, policy);
            serve(engine, printed, config.events.capacity).await?;
        }
        Command::Activate { swiped } => {
            let trigger = if swiped {
                ActivationTrigger::MessageSwiped
            } else {
                ActivationTrigger::MessageSent
            };
            let batches = InProcessEventBus::<ActivationBatch>::new(config.events.capacity);
            let engine = ActivationEngine::new(session, repo, runner, batches, policy);
            let batch = engine.activate(trigger).await?;
            println!("{}", serde_json::to_string(&batch)?);
        }
        Command::Normalize { name } => {
            let changed = ScriptService::new(repo, policy).normalize(&name).await?;
            if changed {
                println!("{name}: script attachment normalized");
            } else {
                println!("{name}: already consistent");
            }
        }
        Command::Script(ScriptCommand::Get { name }) => {
            let source = ScriptService::new(repo, policy).load_source(&name).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(source.as_bytes()).await?;
            stdout.flush().await?;
        }
        Command::Script(ScriptCommand::Set { name, file }) => {
            let source = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut source = String::new();
                    tokio::io::stdin().read_to_string(&mut source).await?;
                    source
                }
            };
            ScriptService::new(repo, policy)
                .save_source(&name, source)
                .await?;
            tracing::info!(lorebook = %name, "script saved");
        }
    }

    Ok(())
}

/// Pump stdin events into `engine` until stdin closes.
///
/// Both directions are bounded queues; a full queue makes its sender wait.
/// The engine owns the only batch sender, so `batches` closes once the
/// engine is dropped.
async fn serve(
    engine: Engine,
    batches: mpsc::Receiver<ActivationBatch>,
    capacity: usize,
) -> anyhow::Result<()> {
    let (host_events, events) = mpsc::channel::<HostEvent>(capacity);
    let printer = tokio::spawn(print_batches(batches));

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HostEvent>(&line) {
                Ok(event) => {
                    if host_events.send(event).await.is_err() {
                        tracing::debug!("engine stopped, no longer reading stdin");
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, %line, "ignoring malformed host event"),
            }
        }
        tracing::debug!("stdin closed");
        Ok::<_, std::io::Error>(())
    });

    engine.run(events).await;
    reader.await??;

    drop(engine);
    printer.await??;
    Ok(())
}

async fn print_batches(mut batches: mpsc::Receiver<ActivationBatch>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(batch) = batches.recv().await {
        let mut line = serde_json::to_vec(&batch)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
