// src/lib.rs

pub mod acquisition;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod resources;
pub mod samples;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::Configuration;
use crate::dag::{PipelineGraph, plan_pipeline};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the configuration, builds the task graph, then either
/// prints a per-stage summary (`--dry-run`) or writes the graph as JSON to
/// `--output` (stdout when omitted).
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    info!(
        config = %config_path.display(),
        tumours = cfg.samples.tumour_bams.len(),
        mode = ?cfg.acquisition.mode,
        "configuration loaded"
    );

    let graph = plan_pipeline(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(());
    }

    let json = graph.to_json()?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json.as_bytes())
                .await
                .with_context(|| format!("writing task graph to {path}"))?;
            info!(path = %path, tasks = graph.len(), "task graph written");
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

/// Dry-run output: one line per stage plus graph totals.
fn print_dry_run(cfg: &Configuration, graph: &PipelineGraph) {
    println!("somaticdag dry-run");
    println!("  workflow = {} ({})", cfg.workflow.name, cfg.workflow.date);
    println!("  parallelism = {}", cfg.workflow.parallelism);
    println!(
        "  host = {} cores, {} MB ({} MB overhead)",
        cfg.host.cores_addressable, cfg.host.mem_host_mb_available, cfg.host.mem_workflow_overhead
    );
    println!("  pairs = {}", cfg.samples.tumour_bams.len());
    println!();

    println!("stages:");
    for row in graph.stage_summary() {
        println!(
            "  {:<24} x{:<4} threads={:<3} memory_mb={}",
            row.stage, row.instances, row.threads, row.memory_mb
        );
    }
    println!();
    println!(
        "tasks = {}, edges = {}, terminal = {}",
        graph.len(),
        graph.edge_count(),
        graph.terminal().name
    );
    println!("fingerprint = {}", graph.topology_fingerprint());

    debug!("dry-run complete (nothing written)");
}
