//! Run result types and timing breakdowns.

use std::path::PathBuf;

use afq_types::Stage;

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_secs: f64,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub algorithm: String,
    pub stages: Vec<StageTiming>,
    pub duration_secs: f64,
    pub output_root: PathBuf,
    pub journal_path: PathBuf,
}

impl RunSummary {
    /// Slowest stage, if any ran.
    #[must_use]
    pub fn slowest_stage(&self) -> Option<&StageTiming> {
        self.stages
            .iter()
            .max_by(|a, b| a.duration_secs.total_cmp(&b.duration_secs))
    }
}
