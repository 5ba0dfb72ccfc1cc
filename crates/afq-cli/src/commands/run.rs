use std::path::Path;

use anyhow::{Context, Result};

use afq_core::{run_afq, CommandEngine, LogReporter, NoopReporter, UsageReporter};

/// Execute a run: resolve the configuration, then drive every stage.
pub fn execute(config_path: &Path, notrack: bool) -> Result<()> {
    let reporter: &dyn UsageReporter = if notrack { &NoopReporter } else { &LogReporter };
    tracing::info!(
        config = %config_path.display(),
        usage_reporting = !notrack,
        "Starting AFQ run"
    );

    let summary = run_afq(config_path, reporter, |spec| {
        CommandEngine::from_env(spec).context("Failed to set up the processing engine")
    })
    .map_err(|e| {
        if let Some(stage) = e.failed_stage() {
            tracing::error!(stage = %stage, "Run stopped; the journal has no end time");
        }
        e
    })
    .with_context(|| format!("AFQ run failed for {}", config_path.display()))?;

    println!("AFQ run completed ({} segmentation).", summary.algorithm);
    for timing in &summary.stages {
        println!("  {:<28} {:.2}s", timing.stage.as_str(), timing.duration_secs);
    }
    println!("  Duration:        {:.2}s", summary.duration_secs);
    if let Some(slowest) = summary.slowest_stage() {
        println!("  Slowest stage:   {}", slowest.stage);
    }
    println!("  Output:          {}", summary.output_root.display());
    println!("  Journal:         {}", summary.journal_path.display());

    Ok(())
}
