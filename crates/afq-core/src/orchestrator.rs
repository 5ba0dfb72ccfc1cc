//! Stage orchestrator: drives the engine through the stage list of the
//! selected segmentation algorithm, strictly in order.

use std::time::Instant;

use afq_types::SegmentationAlgorithm;

use crate::engine::{invoke_stage, ProcessingEngine};
use crate::error::PipelineError;
use crate::result::StageTiming;

pub struct Orchestrator<'a, E: ?Sized> {
    engine: &'a mut E,
}

impl<'a, E: ProcessingEngine + ?Sized> Orchestrator<'a, E> {
    pub fn new(engine: &'a mut E) -> Self {
        Self { engine }
    }

    /// Run every stage for `algorithm`. The first failure stops the run;
    /// later stages are not called.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Stage`] naming the stage that failed.
    pub fn run(
        &mut self,
        algorithm: &SegmentationAlgorithm,
    ) -> Result<Vec<StageTiming>, PipelineError> {
        let stages = algorithm.stages();
        tracing::info!(
            algorithm = %algorithm,
            num_stages = stages.len(),
            "Starting stages"
        );

        let mut timings = Vec::with_capacity(stages.len());
        for (index, &stage) in stages.iter().enumerate() {
            tracing::info!(stage = %stage, index, "Stage started");
            let started = Instant::now();
            if let Err(source) = invoke_stage(&mut *self.engine, stage) {
                tracing::error!(stage = %stage, error = %format!("{source:#}"), "Stage failed");
                return Err(PipelineError::Stage { stage, source });
            }
            let duration_secs = started.elapsed().as_secs_f64();
            tracing::info!(stage = %stage, duration_secs, "Stage completed");
            timings.push(StageTiming {
                stage,
                duration_secs,
            });
        }
        Ok(timings)
    }
}
