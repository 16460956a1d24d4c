use anyhow::{bail, Context, Result};
use renderer::{FailurePolicy, ViewerConfig};
use stageconfig::PipelineConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, RunArgs};

pub fn run(args: RunArgs) -> Result<()> {
    let config = viewer_config(args);
    tracing::debug!(?config, "resolved viewer configuration");
    if !config.config_path.exists() {
        tracing::warn!(
            path = %config.config_path.display(),
            "pipeline config does not exist yet; frames stay clear until it appears"
        );
    }
    renderer::run(config).context("viewer exited with an error")
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn viewer_config(args: RunArgs) -> ViewerConfig {
    let failure_policy = if args.keep_last_program {
        FailurePolicy::KeepPrevious
    } else {
        FailurePolicy::Clear
    };
    ViewerConfig {
        config_path: args.config,
        window_size: args.size,
        target_fps: args.fps,
        shader_root: args.shader_root,
        failure_policy,
        antialiasing: args.antialias,
        subdivisions: args.subdivisions,
    }
}

pub fn check(args: CheckArgs) -> Result<()> {
    let mut config = PipelineConfig::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(root) = args.shader_root.as_deref() {
        config = config.resolve_relative(root);
    }

    println!("Pipeline config: {}", args.config.display());
    for (stage, files) in config.stages() {
        if files.is_empty() {
            println!("  {:<16} (omitted)", stage.key());
            continue;
        }
        println!("  {:<16} {} file(s)", stage.key(), files.len());
        for path in files {
            println!("    {}", path.display());
        }
    }

    let issues = config.issues();
    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }

    println!("Issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    bail!("pipeline config has {} issue(s)", issues.len())
}
