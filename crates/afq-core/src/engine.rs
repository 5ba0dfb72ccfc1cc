//! Contract with the external processing engine.
//!
//! The engine owns what a stage does (including caching and retries); this
//! crate owns only when each stage is called.

use std::path::PathBuf;

use afq_types::{ParameterSet, Stage};
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::output::OutputLocation;

/// One method per pipeline stage. Each call either completes or fails.
pub trait ProcessingEngine {
    /// Derive the color-coded FA map.
    fn derive_cfa(&mut self) -> anyhow::Result<()>;
    /// Derive the principal diffusion direction map.
    fn derive_pdd(&mut self) -> anyhow::Result<()>;
    fn compute_template_transform(&mut self) -> anyhow::Result<()>;
    fn export_rois(&mut self) -> anyhow::Result<()>;
    fn export_roi_gifs(&mut self) -> anyhow::Result<()>;
    fn export_bundle_gif(&mut self) -> anyhow::Result<()>;
    fn export_bundles(&mut self) -> anyhow::Result<()>;
    fn combine_profiles(&mut self) -> anyhow::Result<()>;
}

/// Call the engine method that implements `stage`.
pub(crate) fn invoke_stage<E: ProcessingEngine + ?Sized>(
    engine: &mut E,
    stage: Stage,
) -> anyhow::Result<()> {
    match stage {
        Stage::DeriveCfa => engine.derive_cfa(),
        Stage::DerivePdd => engine.derive_pdd(),
        Stage::ComputeTemplateTransform => engine.compute_template_transform(),
        Stage::ExportRois => engine.export_rois(),
        Stage::ExportRoiGifs => engine.export_roi_gifs(),
        Stage::ExportBundleGif => engine.export_bundle_gif(),
        Stage::ExportBundles => engine.export_bundles(),
        Stage::CombineProfiles => engine.combine_profiles(),
    }
}

/// Everything the engine is constructed from.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSpec {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub segmentation_algorithm: String,
    pub parallel: bool,
    pub force_recompute: bool,
    pub files: ParameterSet,
    pub bundles: ParameterSet,
    pub tracking: ParameterSet,
    pub segmentation: ParameterSet,
    pub cleaning: ParameterSet,
    pub compute: ParameterSet,
}

impl EngineSpec {
    #[must_use]
    pub fn from_resolved(resolved: &ResolvedConfig, output: &OutputLocation) -> Self {
        Self {
            input_root: resolved.input_root.clone(),
            output_root: output.root().to_path_buf(),
            segmentation_algorithm: resolved.segmentation_algorithm.name().to_string(),
            parallel: resolved.parallel(),
            force_recompute: resolved.force_recompute(),
            files: resolved.files.clone(),
            bundles: resolved.bundles.clone(),
            tracking: resolved.tracking.clone(),
            segmentation: resolved.segmentation.clone(),
            cleaning: resolved.cleaning.clone(),
            compute: resolved.compute.clone(),
        }
    }
}
