//! Run metadata journal.
//!
//! The journal is a single TOML file in the output directory. It is written
//! as a complete snapshot right after configuration is resolved and again
//! after the last stage succeeds. A journal with `utc_time_started` but no
//! `utc_time_ended` is a run that never finished; nothing finer-grained is
//! recorded.

use std::path::{Path, PathBuf};

use afq_types::{ParamValue, SectionName};

use crate::config::parser::UNSET_SENTINEL;
use crate::config::validator::JOURNAL_SECTION;
use crate::config::ResolvedConfig;
use crate::error::JournalError;
use crate::output::OutputLocation;

/// File name of the journal inside the output directory.
pub const JOURNAL_FILE_NAME: &str = "afq_metadata.toml";

/// Timestamp layout: ISO-8601, UTC, microseconds, no offset. Fixed width, so
/// later timestamps always sort after earlier ones.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current UTC time in the journal's timestamp layout.
#[must_use]
pub fn utc_timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Platform description recorded with each run.
#[must_use]
pub fn platform_name() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Everything the journal records about a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub utc_time_started: String,
    pub utc_time_ended: Option<String>,
    pub version: String,
    pub platform: String,
    /// Resolved configuration tree, mirrored back in document form.
    pub config: toml::Table,
}

impl RunMetadata {
    /// Metadata for a run starting now.
    #[must_use]
    pub fn start(resolved: &ResolvedConfig) -> Self {
        Self {
            utc_time_started: utc_timestamp(),
            utc_time_ended: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: platform_name(),
            config: resolved_to_toml(resolved),
        }
    }

    /// Record successful completion.
    pub fn finish(&mut self) {
        self.utc_time_ended = Some(utc_timestamp());
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.utc_time_ended.is_some()
    }

    /// Full journal document: the run block followed by the configuration.
    #[must_use]
    pub fn to_table(&self) -> toml::Table {
        let mut run = toml::Table::new();
        run.insert(
            "utc_time_started".into(),
            toml::Value::String(self.utc_time_started.clone()),
        );
        if let Some(ended) = &self.utc_time_ended {
            run.insert("utc_time_ended".into(), toml::Value::String(ended.clone()));
        }
        run.insert("version".into(), toml::Value::String(self.version.clone()));
        run.insert("platform".into(), toml::Value::String(self.platform.clone()));

        let mut table = self.config.clone();
        table.insert(JOURNAL_SECTION.into(), toml::Value::Table(run));
        table
    }
}

/// Mirror the resolved configuration as a TOML document.
///
/// Unset values are written as the unset sentinel so the journal can be
/// used as a configuration document again.
#[must_use]
pub fn resolved_to_toml(resolved: &ResolvedConfig) -> toml::Table {
    let mut table = toml::Table::new();
    for name in SectionName::ALL {
        let mut section = toml::Table::new();
        for (key, value) in resolved.section(name).iter() {
            let value = value.map_or_else(
                || toml::Value::String(UNSET_SENTINEL.to_string()),
                to_toml_value,
            );
            section.insert(key.to_string(), value);
        }
        table.insert(name.as_str().to_string(), toml::Value::Table(section));
    }
    table
}

fn to_toml_value(value: &ParamValue) -> toml::Value {
    match value {
        ParamValue::Bool(b) => toml::Value::Boolean(*b),
        ParamValue::Int(i) => toml::Value::Integer(*i),
        ParamValue::Float(f) => toml::Value::Float(*f),
        ParamValue::Str(s) | ParamValue::Function(s) => toml::Value::String(s.clone()),
        ParamValue::List(items) => toml::Value::Array(items.iter().map(to_toml_value).collect()),
    }
}

/// Handle on the journal file of one output location.
#[derive(Debug, Clone)]
pub struct RunJournal {
    path: PathBuf,
}

impl RunJournal {
    #[must_use]
    pub fn open(location: &OutputLocation) -> Self {
        Self {
            path: location.root().join(JOURNAL_FILE_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the journal with a snapshot of `metadata`.
    ///
    /// The snapshot is written to a temporary sibling and renamed over the
    /// journal, so readers never see a half-written file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    pub fn write_snapshot(&self, metadata: &RunMetadata) -> Result<(), JournalError> {
        let content = toml::to_string(&metadata.to_table())?;
        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content).map_err(|source| JournalError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| JournalError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            path = %self.path.display(),
            finished = metadata.is_finished(),
            "Run journal written"
        );
        Ok(())
    }

    /// Read the current journal back as a TOML table.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or is not valid TOML.
    pub fn read_table(&self) -> Result<toml::Table, JournalError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| JournalError::Io {
            path: self.path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| JournalError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}
