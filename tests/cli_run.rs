// tests/cli_run.rs

mod common;

use common::{TestResult, init_tracing, sample_toml};
use somaticdag::cli::CliArgs;
use somaticdag::run;
use tempfile::tempdir;

fn args(config: String, output: String, dry_run: bool) -> CliArgs {
    CliArgs {
        config,
        output: Some(output),
        log_level: None,
        dry_run,
    }
}

#[tokio::test]
async fn run_writes_graph_as_json() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = dir.path().join("Somatic.toml");
    let output = dir.path().join("graph.json");
    std::fs::write(&config, sample_toml())?;

    run(args(
        config.display().to_string(),
        output.display().to_string(),
        false,
    ))
    .await?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    let tasks = json["tasks"].as_array().ok_or("tasks should be an array")?;
    assert!(!tasks.is_empty());

    let terminal = json["terminal"].as_u64().ok_or("terminal should be a task id")? as usize;
    assert_eq!(tasks[terminal]["stage"], "cleanup");
    assert_eq!(tasks[0]["owner"]["kind"], "shared");
    Ok(())
}

#[tokio::test]
async fn dry_run_writes_nothing() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = dir.path().join("Somatic.toml");
    let output = dir.path().join("graph.json");
    std::fs::write(&config, sample_toml())?;

    run(args(
        config.display().to_string(),
        output.display().to_string(),
        true,
    ))
    .await?;

    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn missing_config_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("absent.toml");
    let output = dir.path().join("graph.json");
    let result = run(args(
        config.display().to_string(),
        output.display().to_string(),
        false,
    ))
    .await;
    assert!(result.is_err());
    assert!(!output.exists());
}
