//! Engine adapter that runs each stage as an external command.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use afq_types::Stage;
use anyhow::{bail, Context, Result};

use crate::engine::{EngineSpec, ProcessingEngine};

/// Environment variable naming the engine executable.
pub const ENGINE_ENV_VAR: &str = "AFQ_ENGINE";

/// Executable used when [`ENGINE_ENV_VAR`] is not set.
pub const DEFAULT_ENGINE_PROGRAM: &str = "pyafq-engine";

/// Runs `<program> <stage-name>` once per stage, with the engine spec as
/// JSON on stdin. The program's stdout goes straight to the terminal; its
/// stderr is attached to the failure when it exits non-zero.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    spec_json: String,
}

impl CommandEngine {
    /// Build an engine for the program named by `AFQ_ENGINE`.
    ///
    /// # Errors
    ///
    /// See [`CommandEngine::new`].
    pub fn from_env(spec: &EngineSpec) -> Result<Self> {
        let program = std::env::var_os(ENGINE_ENV_VAR)
            .map_or_else(|| PathBuf::from(DEFAULT_ENGINE_PROGRAM), PathBuf::from);
        Self::new(program, spec)
    }

    /// Build an engine for `program`.
    ///
    /// A bare program name is looked up on `PATH` when a stage runs; an
    /// explicit path must exist now.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit program path does not exist or the
    /// spec cannot be serialized.
    pub fn new(program: impl Into<PathBuf>, spec: &EngineSpec) -> Result<Self> {
        let program = program.into();
        if program.components().count() > 1 && !program.exists() {
            bail!("engine program not found: {}", program.display());
        }
        let spec_json = serde_json::to_string(spec).context("failed to serialize engine spec")?;
        tracing::debug!(program = %program.display(), "Engine command configured");
        Ok(Self { program, spec_json })
    }

    fn invoke(&self, stage: Stage) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(stage.as_str())
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start engine {}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(self.spec_json.as_bytes()) {
                Ok(()) => {}
                // The engine may exit without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e).context("failed to send spec to engine"),
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for engine {}", self.program.display()))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !output.status.success() {
            if stderr.is_empty() {
                bail!("engine {} exited with {}", self.program.display(), output.status);
            }
            bail!(
                "engine {} exited with {}: {stderr}",
                self.program.display(),
                output.status
            );
        }
        if !stderr.is_empty() {
            tracing::debug!(stage = %stage, stderr, "Engine diagnostics");
        }
        Ok(())
    }
}

impl ProcessingEngine for CommandEngine {
    fn derive_cfa(&mut self) -> Result<()> {
        self.invoke(Stage::DeriveCfa)
    }

    fn derive_pdd(&mut self) -> Result<()> {
        self.invoke(Stage::DerivePdd)
    }

    fn compute_template_transform(&mut self) -> Result<()> {
        self.invoke(Stage::ComputeTemplateTransform)
    }

    fn export_rois(&mut self) -> Result<()> {
        self.invoke(Stage::ExportRois)
    }

    fn export_roi_gifs(&mut self) -> Result<()> {
        self.invoke(Stage::ExportRoiGifs)
    }

    fn export_bundle_gif(&mut self) -> Result<()> {
        self.invoke(Stage::ExportBundleGif)
    }

    fn export_bundles(&mut self) -> Result<()> {
        self.invoke(Stage::ExportBundles)
    }

    fn combine_profiles(&mut self) -> Result<()> {
        self.invoke(Stage::CombineProfiles)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;
    use crate::config::parser::parse_document_str;
    use crate::config::resolve_document;
    use crate::output::OutputLocation;

    fn spec() -> EngineSpec {
        let doc = parse_document_str("[files]\ndmriprep_path = \"/data/study/dmriprep\"").unwrap();
        let resolved = resolve_document(&doc).unwrap();
        EngineSpec::from_resolved(&resolved, &OutputLocation::derive(&resolved.input_root))
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("engine.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn missing_program_path_is_rejected_up_front() {
        let err = CommandEngine::new("/nonexistent/bin/pyafq-engine", &spec()).unwrap_err();
        assert!(err.to_string().contains("engine program not found"));
    }

    #[test]
    fn bare_program_name_is_deferred_to_path_lookup() {
        assert!(CommandEngine::new("pyafq-engine-not-installed", &spec()).is_ok());
    }

    #[test]
    fn stage_name_and_spec_reach_the_program() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("calls.log");
        let script = write_script(
            tmp.path(),
            &format!("echo \"$1\" >> {0}\ncat >> {0}\necho >> {0}", log.display()),
        );
        let mut engine = CommandEngine::new(&script, &spec()).unwrap();
        engine.derive_cfa().unwrap();
        engine.export_bundles().unwrap();

        let logged = std::fs::read_to_string(&log).unwrap();
        let mut lines = logged.lines();
        assert_eq!(lines.next(), Some("derive-cfa"));
        let first_spec: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(first_spec["output_root"], "/data/study/afq");
        assert_eq!(lines.next(), Some("export-bundles"));
    }

    #[test]
    fn non_zero_exit_is_a_stage_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let script = write_script(tmp.path(), "echo 'no profiles found' >&2\nexit 3");
        let mut engine = CommandEngine::new(&script, &spec()).unwrap();
        let err = engine.combine_profiles().unwrap_err().to_string();
        assert!(err.contains("exited with"), "got: {err}");
        assert!(err.contains("no profiles found"), "got: {err}");
    }

    #[test]
    fn unstartable_program_is_reported() {
        let mut engine = CommandEngine::new("pyafq-engine-not-installed", &spec()).unwrap();
        let err = engine.derive_pdd().unwrap_err();
        assert!(err.to_string().contains("failed to start engine"), "got: {err}");
    }
}
