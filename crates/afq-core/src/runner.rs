//! Top-level run flow: configuration, journal, engine, stages.

use std::path::Path;
use std::time::Instant;

use crate::config::parser::parse_document;
use crate::config::{resolve_document, validator, ResolvedConfig};
use crate::engine::{EngineSpec, ProcessingEngine};
use crate::error::PipelineError;
use crate::journal::{RunJournal, RunMetadata};
use crate::orchestrator::Orchestrator;
use crate::output::OutputLocation;
use crate::reporter::{report_best_effort, UsageEvent, UsageReporter};
use crate::result::RunSummary;

/// Load, validate and resolve the configuration document at `config_path`.
///
/// # Errors
///
/// Returns [`PipelineError::Config`] for any read, parse, validation or
/// resolution failure.
pub fn load_config(config_path: &Path) -> Result<ResolvedConfig, PipelineError> {
    let document = parse_document(config_path)?;
    validator::validate_document(&document)?;
    let resolved = resolve_document(&document)?;
    tracing::info!(
        config = %config_path.display(),
        input_root = %resolved.input_root.display(),
        algorithm = %resolved.segmentation_algorithm,
        parallel = resolved.parallel(),
        "Configuration resolved"
    );
    Ok(resolved)
}

/// Run the whole pipeline for the configuration document at `config_path`.
///
/// `build_engine` is called once, after the output directory exists and
/// before the journal is first written.
///
/// # Errors
///
/// Configuration errors are returned before anything touches the
/// filesystem. See [`run_resolved`] for the rest.
pub fn run_afq<E, F>(
    config_path: &Path,
    reporter: &dyn UsageReporter,
    build_engine: F,
) -> Result<RunSummary, PipelineError>
where
    E: ProcessingEngine,
    F: FnOnce(&EngineSpec) -> anyhow::Result<E>,
{
    let resolved = load_config(config_path)?;
    run_resolved(&resolved, reporter, build_engine)
}

/// Run the pipeline for an already resolved configuration.
///
/// The journal is written once before the first stage, without an end time,
/// and again after the last stage succeeds.
///
/// # Errors
///
/// Returns an error if the output directory cannot be created, the engine
/// cannot be built, a journal write fails, or any stage fails. A stage
/// failure leaves the journal without an end time.
pub fn run_resolved<E, F>(
    resolved: &ResolvedConfig,
    reporter: &dyn UsageReporter,
    build_engine: F,
) -> Result<RunSummary, PipelineError>
where
    E: ProcessingEngine,
    F: FnOnce(&EngineSpec) -> anyhow::Result<E>,
{
    let started = Instant::now();

    let output = OutputLocation::derive(&resolved.input_root);
    output.ensure()?;

    let spec = EngineSpec::from_resolved(resolved, &output);
    let mut engine = build_engine(&spec).map_err(PipelineError::Engine)?;

    let journal = RunJournal::open(&output);
    let mut metadata = RunMetadata::start(resolved);
    journal.write_snapshot(&metadata)?;

    report_best_effort(
        reporter,
        &UsageEvent {
            version: &metadata.version,
            platform: &metadata.platform,
            segmentation_algorithm: resolved.segmentation_algorithm.name(),
            parallel: resolved.parallel(),
        },
    );

    let stages = Orchestrator::new(&mut engine).run(&resolved.segmentation_algorithm)?;

    metadata.finish();
    journal.write_snapshot(&metadata)?;

    let duration_secs = started.elapsed().as_secs_f64();
    tracing::info!(
        algorithm = %resolved.segmentation_algorithm,
        stages = stages.len(),
        duration_secs,
        output = %output.root().display(),
        "Run completed"
    );

    Ok(RunSummary {
        algorithm: resolved.segmentation_algorithm.name().to_string(),
        stages,
        duration_secs,
        output_root: output.root().to_path_buf(),
        journal_path: journal.path().to_path_buf(),
    })
}
