//! Error model for configuration, journal and pipeline failures.

use std::path::PathBuf;

use afq_types::{SectionName, Stage, ValueKind};

// ---------------------------------------------------------------------------
// ConfigError: everything that can go wrong before any stage is built
// ---------------------------------------------------------------------------

/// A problem with the configuration document or its values.
///
/// Always raised before the engine is constructed and before the journal is
/// written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing environment variable(s): {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("top-level entry `{name}` must be a table of settings")]
    NotASection { name: String },

    #[error("missing required setting `{section}.{key}`")]
    MissingRequired {
        section: SectionName,
        key: &'static str,
    },

    #[error("`{section}.{key}`: cannot read {value:?} as a number")]
    InvalidNumber {
        section: SectionName,
        key: String,
        value: String,
    },

    #[error("`{section}.{key}`: expected a whole number, found {value}")]
    NotAnInteger {
        section: SectionName,
        key: String,
        value: String,
    },

    #[error("`{section}.{key}`: expected {expected}, found {found}")]
    TypeMismatch {
        section: SectionName,
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("`{section}.{key}`: {reason}")]
    Unsupported {
        section: String,
        key: String,
        reason: String,
    },

    #[error("configuration validation failed:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

// ---------------------------------------------------------------------------
// JournalError
// ---------------------------------------------------------------------------

/// Failure reading or writing the run journal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("journal i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run metadata: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("journal {} is not valid TOML: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// PipelineError: what a run can fail with
// ---------------------------------------------------------------------------

/// Categorized failure of a whole run.
///
/// `Stage` carries the engine's error untouched; the orchestrator only adds
/// which stage was running.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("failed to construct processing engine: {0:#}")]
    Engine(#[source] anyhow::Error),

    #[error("stage `{stage}` failed: {source:#}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// The stage that failed, if the run got as far as executing stages.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns `true` for errors raised before anything touched the disk.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
