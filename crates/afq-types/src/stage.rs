//! Pipeline stages and the segmentation algorithm that selects them.

use std::fmt;

/// One unit of work delegated to the processing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Derive the color-coded FA scalar map.
    DeriveCfa,
    /// Derive the principal diffusion direction map.
    DerivePdd,
    /// Compute the subject-to-template registration.
    ComputeTemplateTransform,
    /// Export regions of interest used by waypoint segmentation.
    ExportRois,
    /// Render the regions of interest as gifs.
    ExportRoiGifs,
    /// Render the segmented bundles as a gif.
    ExportBundleGif,
    ExportBundles,
    CombineProfiles,
}

impl Stage {
    /// Stable name passed to the engine and used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeriveCfa => "derive-cfa",
            Self::DerivePdd => "derive-pdd",
            Self::ComputeTemplateTransform => "compute-template-transform",
            Self::ExportRois => "export-rois",
            Self::ExportRoiGifs => "export-roi-gifs",
            Self::ExportBundleGif => "export-bundle-gif",
            Self::ExportBundles => "export-bundles",
            Self::CombineProfiles => "combine-profiles",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const AFQ_STAGES: [Stage; 8] = [
    Stage::DeriveCfa,
    Stage::DerivePdd,
    Stage::ComputeTemplateTransform,
    Stage::ExportRois,
    Stage::ExportRoiGifs,
    Stage::ExportBundleGif,
    Stage::ExportBundles,
    Stage::CombineProfiles,
];

const OTHER_STAGES: [Stage; 5] = [
    Stage::DeriveCfa,
    Stage::DerivePdd,
    Stage::ComputeTemplateTransform,
    Stage::ExportBundles,
    Stage::CombineProfiles,
];

/// Segmentation algorithm resolved from `segmentation.seg_algo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentationAlgorithm {
    /// The built-in waypoint-ROI algorithm.
    Afq,
    /// Any other algorithm; the ROI exports have nothing to show for it.
    Other(String),
}

impl SegmentationAlgorithm {
    /// Name of the built-in algorithm.
    pub const AFQ_NAME: &'static str = "AFQ";

    /// Classify an algorithm name. The comparison ignores ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case(Self::AFQ_NAME) {
            Self::Afq
        } else {
            Self::Other(name.to_string())
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Afq => Self::AFQ_NAME,
            Self::Other(name) => name,
        }
    }

    /// The complete stage plan for this algorithm, in execution order.
    #[must_use]
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Self::Afq => &AFQ_STAGES,
            Self::Other(_) => &OTHER_STAGES,
        }
    }
}

impl fmt::Display for SegmentationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
