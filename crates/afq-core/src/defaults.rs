//! Declared defaults for every configuration section.
//!
//! Each engine stage (tracking, segmentation, cleaning) declares its tunable
//! parameters and their defaults here, next to a one-line description. The
//! engine-level sections (`files`, `bundles`, `compute`) are declared the same
//! way and act as the module-level fallback layer. These tables are the only
//! source of defaults: resolution, the generated `--help` listing and the
//! journal all read from them.

use std::fmt::Write as _;

use afq_types::{ParamValue, ParameterSet, SectionName};

/// A declared default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    /// No value; the engine receives an explicit absence.
    Unset,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'static str),
    StrList(&'static [&'static str]),
    IntList(&'static [i64]),
    /// Function-valued default, identified by name.
    Function(&'static str),
    /// Off by default (`false`); a positive integer switches it on.
    CountOrFalse,
}

impl DefaultValue {
    #[must_use]
    pub fn to_value(self) -> Option<ParamValue> {
        match self {
            Self::Unset => None,
            Self::Bool(b) => Some(ParamValue::Bool(b)),
            Self::Int(i) => Some(ParamValue::Int(i)),
            Self::Float(v) => Some(ParamValue::Float(v)),
            Self::Str(s) => Some(ParamValue::Str(s.to_string())),
            Self::StrList(items) => Some(ParamValue::List(
                items.iter().map(|s| ParamValue::Str((*s).to_string())).collect(),
            )),
            Self::IntList(items) => Some(ParamValue::List(
                items.iter().map(|i| ParamValue::Int(*i)).collect(),
            )),
            Self::Function(name) => Some(ParamValue::Function(name.to_string())),
            Self::CountOrFalse => Some(ParamValue::Bool(false)),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: DefaultValue,
    pub doc: &'static str,
}

/// A parameter that has no default and must be supplied by the user.
#[derive(Debug, Clone, Copy)]
pub struct RequiredParam {
    pub name: &'static str,
    pub doc: &'static str,
}

/// Everything declared for one section.
#[derive(Debug)]
pub struct SectionDefaults {
    pub section: SectionName,
    pub required: &'static [RequiredParam],
    pub params: &'static [ParamSpec],
}

const fn param(name: &'static str, default: DefaultValue, doc: &'static str) -> ParamSpec {
    ParamSpec { name, default, doc }
}

use DefaultValue::{Bool, CountOrFalse, Float, Function, Int, IntList, Str, StrList, Unset};

// ---------------------------------------------------------------------------
// Engine-level fallback constants
// ---------------------------------------------------------------------------

/// Bundles segmented when the document does not choose any.
pub const DEFAULT_BUNDLES: &[&str] = &[
    "ATR", "CGC", "CST", "IFO", "ILF", "SLF", "ARC", "UNC", "FA", "FP",
];

/// Scalars profiled along each bundle by default.
pub const DEFAULT_SCALARS: &[&str] = &["dti_fa", "dti_md"];

/// Freesurfer labels treated as white matter.
pub const DEFAULT_WM_LABELS: &[i64] = &[250, 251, 252, 253, 254, 255, 41, 2, 16, 77];

static FILES: SectionDefaults = SectionDefaults {
    section: SectionName::Files,
    required: &[RequiredParam {
        name: "dmriprep_path",
        doc: "Root of the preprocessed diffusion derivatives; outputs go to a sibling `afq` directory",
    }],
    params: &[
        param("sub_prefix", Str("sub"), "Prefix of subject directories"),
        param("dwi_folder", Str("dwi"), "Folder holding diffusion data inside each session"),
        param("dwi_file", Str("*dwi"), "Glob matching the diffusion image"),
        param("anat_folder", Str("anat"), "Folder holding anatomical data inside each session"),
        param("anat_file", Str("*T1w*"), "Glob matching the anatomical image"),
    ],
};

static BUNDLES: SectionDefaults = SectionDefaults {
    section: SectionName::Bundles,
    required: &[],
    params: &[
        param("bundle_names", StrList(DEFAULT_BUNDLES), "Bundles to segment"),
        param("scalars", StrList(DEFAULT_SCALARS), "Scalars profiled along each bundle"),
        param("reg_template", Unset, "Registration template; unset uses the engine's MNI template"),
        param("reg_subject", Str("power_map"), "Subject image registered to the template"),
        param("wm_labels", IntList(DEFAULT_WM_LABELS), "Segmentation labels counted as white matter"),
        param("use_prealign", Bool(true), "Run an affine prealignment before nonlinear registration"),
    ],
};

static COMPUTE: SectionDefaults = SectionDefaults {
    section: SectionName::Compute,
    required: &[],
    params: &[
        param("dask_it", Bool(false), "Let the engine parallelize across subjects"),
        param("force_recompute", Bool(false), "Recompute stage outputs that already exist on disk"),
    ],
};

// ---------------------------------------------------------------------------
// Stage defaults
// ---------------------------------------------------------------------------

static TRACKING: SectionDefaults = SectionDefaults {
    section: SectionName::Tracking,
    required: &[],
    params: &[
        param("seed_mask", Unset, "Mask of seed voxels; unset seeds the whole white matter"),
        param("seed_threshold", Float(0.0), "Threshold applied to the seed mask"),
        param("n_seeds", Int(1), "Seeds per voxel, or total seeds when random_seeds is set"),
        param("random_seeds", Bool(false), "Place seeds randomly instead of on a grid"),
        param("rng_seed", Unset, "Seed for random seed placement"),
        param("stop_mask", Unset, "Mask that terminates streamlines"),
        param("stop_threshold", Float(0.0), "Threshold applied to the stop mask"),
        param("step_size", Float(0.5), "Tracking step size in mm"),
        param("min_length", Int(10), "Shortest streamline kept, in mm"),
        param("max_length", Int(1000), "Longest streamline kept, in mm"),
        param("odf_model", Str("DTI"), "Orientation model used for tracking"),
        param("directions", Str("det"), "Direction getter: det or prob"),
    ],
};

static SEGMENTATION: SectionDefaults = SectionDefaults {
    section: SectionName::Segmentation,
    required: &[],
    params: &[
        param("nb_points", CountOrFalse, "Resample streamlines to this many points; false keeps them"),
        param("seg_algo", Str("AFQ"), "Segmentation algorithm: AFQ (waypoint ROIs) or another engine algorithm"),
        param("reg_algo", Unset, "Registration algorithm used while segmenting"),
        param("clip_edges", Bool(false), "Clip streamlines to the segment between waypoint ROIs"),
        param("progressive", Bool(true), "Use progressive registration in the recognition step"),
        param("greater_than", Int(50), "Drop clusters smaller than this during recognition"),
        param("rm_small_clusters", Int(50), "Remove clusters with fewer streamlines than this"),
        param("model_clust_thr", Float(5.0), "Clustering threshold for the model bundles"),
        param("reduction_thr", Float(20.0), "Distance threshold for reducing the search space"),
        param("refine", Bool(false), "Run a second, refined recognition pass"),
        param("pruning_thr", Float(5.0), "Distance threshold for pruning recognized bundles"),
        param("b0_threshold", Int(0), "b-values at or below this count as b0"),
        param("prob_threshold", Float(0.0), "Minimum probability-map value along a streamline"),
        param("rng", Unset, "Random state for recognition"),
        param("return_idx", Bool(false), "Also return streamline indices"),
        param("filter_by_endpoints", Bool(true), "Require streamline endpoints in the expected regions"),
        param("dist_to_aal", Float(4.0), "Endpoint distance allowed from the atlas regions, in mm"),
    ],
};

static CLEANING: SectionDefaults = SectionDefaults {
    section: SectionName::Cleaning,
    required: &[],
    params: &[
        param("n_points", Int(100), "Points each streamline is resampled to before cleaning"),
        param("clean_rounds", Int(5), "Maximum number of cleaning iterations"),
        param("distance_threshold", Float(5.0), "Mahalanobis distance above which streamlines are dropped"),
        param("length_threshold", Float(4.0), "Length z-score above which streamlines are dropped"),
        param("min_sl", Int(20), "Stop cleaning when fewer streamlines than this remain"),
        param("stat", Function("mean"), "Statistic used to summarize the core of the bundle"),
        param("return_idx", Bool(false), "Also return indices of kept streamlines"),
    ],
};

/// The declaration table for `section`.
#[must_use]
pub fn declared(section: SectionName) -> &'static SectionDefaults {
    match section {
        SectionName::Files => &FILES,
        SectionName::Bundles => &BUNDLES,
        SectionName::Tracking => &TRACKING,
        SectionName::Segmentation => &SEGMENTATION,
        SectionName::Cleaning => &CLEANING,
        SectionName::Compute => &COMPUTE,
    }
}

/// Default parameter set for `section`. Required parameters are excluded.
#[must_use]
pub fn defaults(section: SectionName) -> ParameterSet {
    let mut set = ParameterSet::new();
    for spec in declared(section).params {
        set.insert(spec.name, spec.default.to_value());
    }
    set
}

/// Whether `key` is declared as off-by-default with an optional count.
#[must_use]
pub fn is_count_or_false(section: SectionName, key: &str) -> bool {
    declared(section)
        .params
        .iter()
        .any(|p| p.name == key && p.default == CountOrFalse)
}

/// Whether `key` is declared for `section`, either with a default or as required.
#[must_use]
pub fn is_known_key(section: SectionName, key: &str) -> bool {
    let decl = declared(section);
    decl.params.iter().any(|p| p.name == key) || decl.required.iter().any(|r| r.name == key)
}

/// Render every section's defaults as a commented TOML document.
///
/// The output is itself a valid configuration once the required values are
/// filled in; unset defaults are written as `""`.
#[must_use]
pub fn render_defaults() -> String {
    let mut out = String::new();
    for (i, section) in SectionName::ALL.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let decl = declared(section);
        let _ = writeln!(out, "[{section}]");
        for required in decl.required {
            let _ = writeln!(out, "# {} (required)", required.doc);
            let _ = writeln!(out, "{} = \"\"", required.name);
        }
        for spec in decl.params {
            let _ = writeln!(out, "# {}", spec.doc);
            match spec.default.to_value() {
                Some(value) => {
                    let _ = writeln!(out, "{} = {value}", spec.name);
                }
                None => {
                    let _ = writeln!(out, "{} = \"\"", spec.name);
                }
            }
        }
    }
    out
}
