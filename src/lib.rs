// src/lib.rs

pub mod cli;
pub mod config;
pub mod emit;
pub mod errors;
pub mod logging;
pub mod manifest;
pub mod message;
pub mod metrics;
pub mod reconcile;
pub mod registry;
pub mod stream;
pub mod supervisor;
pub mod task;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::RawConfigFile;
use crate::emit::{Emitter, spawn_json_lines_emitter};
use crate::manifest::{ManifestOptions, parse_manifest};
use crate::reconcile::Reconciler;
use crate::registry::spawn_registry;
use crate::stream::build_source;
use crate::supervisor::SupervisorContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the stream source for the chosen backend
/// - the JSON-lines emitter on stdout
/// - the registry and the manifest watcher
/// - the optional metrics reporter
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = effective_config(&args)?;
    let agent = &cfg.agent;

    let source = build_source(agent.backend)?;
    let options = ManifestOptions {
        job_scoped: source.job_scoped(),
    };

    if args.dry_run {
        return print_dry_run(&cfg, options).await;
    }

    info!(
        manifest = ?agent.manifest,
        backend = source.name(),
        "logtap starting"
    );

    let (emitter, writer) = spawn_json_lines_emitter(tokio::io::stdout());
    let emitter: Arc<dyn Emitter> = Arc::new(emitter);

    let registry = spawn_registry(SupervisorContext { source, emitter });
    let reconciler = Reconciler::new(agent.manifest.clone(), options, registry.clone());

    let watcher = watch::spawn_manifest_watcher(reconciler, agent.poll_interval())?;
    let reporter = agent
        .metrics_interval()
        .map(|every| metrics::spawn_metrics_reporter(registry.clone(), every));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received; stopping all streams");

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    registry.shutdown().await?;
    drop(watcher);
    drop(registry);

    // Every emitter clone lived in the registry's supervisors; once those
    // are gone the writer drains and exits.
    if let Err(err) = writer.await {
        warn!(error = %err, "json-lines writer task failed");
    }
    debug!("logtap finished");
    Ok(())
}

/// Config file (or defaults) with CLI overrides applied and re-validated.
fn effective_config(args: &CliArgs) -> Result<ConfigFile> {
    let cfg = load_and_validate(&args.config)?;
    if args.manifest.is_none() && args.backend.is_none() {
        return Ok(cfg);
    }

    let mut raw = RawConfigFile { agent: cfg.agent };
    if let Some(manifest) = &args.manifest {
        raw.agent.manifest = manifest.clone();
    }
    if let Some(backend) = args.backend {
        raw.agent.backend = backend.into();
    }
    Ok(ConfigFile::try_from(raw)?)
}

/// Read the manifest once and print what would be followed.
async fn print_dry_run(cfg: &ConfigFile, options: ManifestOptions) -> Result<()> {
    let manifest: &Path = &cfg.agent.manifest;
    let bytes = tokio::fs::read(manifest).await?;
    let declared = parse_manifest(&bytes, options)?;

    println!("logtap dry-run");
    println!("  agent.manifest = {}", manifest.display());
    println!("  agent.backend = {:?}", cfg.agent.backend);
    println!();

    println!("tasks ({}):", declared.len());
    for (id, task) in &declared {
        println!("  - {id}");
        println!("      app_id: {}", task.application_id);
        println!("      source: {} {}", task.source.as_str(), task.index);
        let streams: Vec<&str> = task.source.streams().iter().map(|k| k.as_str()).collect();
        println!("      streams: {}", streams.join(", "));
        if !task.drain_urls.is_empty() {
            println!("      drain_urls: {:?}", task.drain_urls);
        }
    }

    debug!("dry-run complete (nothing followed)");
    Ok(())
}
