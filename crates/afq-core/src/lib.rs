//! Configuration resolution and stage orchestration for AFQ runs.

pub mod command;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod journal;
pub mod orchestrator;
pub mod output;
pub mod reporter;
pub mod result;
pub mod runner;

// Re-export public API for convenience
pub use command::CommandEngine;
pub use config::ResolvedConfig;
pub use engine::{EngineSpec, ProcessingEngine};
pub use error::{ConfigError, JournalError, PipelineError};
pub use reporter::{LogReporter, NoopReporter, UsageReporter};
pub use result::{RunSummary, StageTiming};
pub use runner::{load_config, run_afq, run_resolved};
