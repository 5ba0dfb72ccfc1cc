//! Best-effort usage reporting.

/// Facts about a run that a reporter may send.
#[derive(Debug, Clone, Copy)]
pub struct UsageEvent<'a> {
    pub version: &'a str,
    pub platform: &'a str,
    pub segmentation_algorithm: &'a str,
    pub parallel: bool,
}

/// Receives one event per run, after the start snapshot is written.
///
/// Failures are logged and never abort the run.
pub trait UsageReporter {
    /// # Errors
    ///
    /// Implementations return an error when the event could not be recorded.
    fn report(&self, event: &UsageEvent<'_>) -> anyhow::Result<()>;
}

/// Reporter that records nothing (`--notrack`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl UsageReporter for NoopReporter {
    fn report(&self, _event: &UsageEvent<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reporter that emits the event as a structured log record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl UsageReporter for LogReporter {
    fn report(&self, event: &UsageEvent<'_>) -> anyhow::Result<()> {
        tracing::info!(
            version = event.version,
            platform = event.platform,
            segmentation_algorithm = event.segmentation_algorithm,
            parallel = event.parallel,
            "Usage recorded"
        );
        Ok(())
    }
}

/// Send `event`, logging instead of returning any failure.
pub fn report_best_effort(reporter: &dyn UsageReporter, event: &UsageEvent<'_>) {
    if let Err(e) = reporter.report(event) {
        tracing::warn!(error = %format!("{e:#}"), "Usage reporting failed, continuing");
    }
}
