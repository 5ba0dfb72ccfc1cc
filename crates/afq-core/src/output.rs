//! Output directory derived from the input data root.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Name of the output directory created next to the input root.
pub const OUTPUT_DIR_NAME: &str = "afq";

/// Where a run writes its journal and where the engine writes its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    root: PathBuf,
}

impl OutputLocation {
    /// Sibling `afq` directory of `input_root`.
    ///
    /// `/data/study/dmriprep` maps to `/data/study/afq`. A bare relative name
    /// maps to `afq` in the working directory, and the filesystem root maps
    /// to `/afq`.
    #[must_use]
    pub fn derive(input_root: &Path) -> Self {
        let parent = input_root.parent().unwrap_or(input_root);
        Self {
            root: parent.join(OUTPUT_DIR_NAME),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutputDir`] if the directory cannot be created.
    pub fn ensure(&self) -> Result<(), PipelineError> {
        std::fs::create_dir_all(&self.root).map_err(|source| PipelineError::OutputDir {
            path: self.root.clone(),
            source,
        })?;
        tracing::debug!(path = %self.root.display(), "Output directory ready");
        Ok(())
    }
}
