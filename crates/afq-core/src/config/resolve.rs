//! Layered resolution of declared defaults and user overrides.

use std::path::PathBuf;

use afq_types::{
    ConfigDocument, ParamValue, ParameterSet, Section, SectionName, SegmentationAlgorithm,
    ValueKind,
};

use crate::defaults;
use crate::error::ConfigError;

/// Section and key of the only required setting.
pub const INPUT_ROOT_KEY: (SectionName, &str) = (SectionName::Files, "dmriprep_path");

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Root of the preprocessed input data (`files.dmriprep_path`).
    pub input_root: PathBuf,
    pub files: ParameterSet,
    pub bundles: ParameterSet,
    pub tracking: ParameterSet,
    pub segmentation: ParameterSet,
    pub cleaning: ParameterSet,
    pub compute: ParameterSet,
    pub segmentation_algorithm: SegmentationAlgorithm,
}

impl ResolvedConfig {
    #[must_use]
    pub fn section(&self, name: SectionName) -> &ParameterSet {
        match name {
            SectionName::Files => &self.files,
            SectionName::Bundles => &self.bundles,
            SectionName::Tracking => &self.tracking,
            SectionName::Segmentation => &self.segmentation,
            SectionName::Cleaning => &self.cleaning,
            SectionName::Compute => &self.compute,
        }
    }

    /// Whether the engine may parallelize its work (`compute.dask_it`).
    #[must_use]
    pub fn parallel(&self) -> bool {
        self.compute
            .get("dask_it")
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }

    /// Whether the engine should ignore cached outputs (`compute.force_recompute`).
    #[must_use]
    pub fn force_recompute(&self) -> bool {
        self.compute
            .get("force_recompute")
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }
}

/// Merge `user` over `defaults` for one section.
///
/// Only keys present in `defaults` are considered; the result always has
/// exactly the key set of `defaults`. User keys that are unset (`None`) leave
/// the default in place.
///
/// # Errors
///
/// Returns an error if a user value cannot be coerced to the kind of its
/// default.
pub fn resolve(
    section: SectionName,
    defaults: &ParameterSet,
    user: Option<&Section>,
) -> Result<ParameterSet, ConfigError> {
    let mut resolved = defaults.clone();
    let Some(user) = user else {
        return Ok(resolved);
    };

    for (key, default) in defaults.iter() {
        if let Some(value) = user.provided(key) {
            let value = coerce(section, key, default, value)?;
            resolved.insert(key, Some(value));
        }
    }
    Ok(resolved)
}

/// Resolve every section of `document`.
///
/// The required input root is checked first, so a document without it fails
/// before any other value is looked at.
///
/// # Errors
///
/// Returns [`ConfigError::MissingRequired`] when `files.dmriprep_path` is
/// absent or unset, or any coercion error from [`resolve`].
pub fn resolve_document(document: &ConfigDocument) -> Result<ResolvedConfig, ConfigError> {
    let (root_section, root_key) = INPUT_ROOT_KEY;
    let input_root = match document
        .section(root_section)
        .and_then(|s| s.provided(root_key))
    {
        Some(ParamValue::Str(path)) => PathBuf::from(path),
        Some(other) => {
            return Err(ConfigError::TypeMismatch {
                section: root_section,
                key: root_key.to_string(),
                expected: ValueKind::Str,
                found: other.kind(),
            })
        }
        None => {
            return Err(ConfigError::MissingRequired {
                section: root_section,
                key: root_key,
            })
        }
    };

    let section = |name: SectionName| resolve(name, &defaults::defaults(name), document.section(name));

    let mut files = section(SectionName::Files)?;
    files.insert(
        root_key,
        Some(ParamValue::Str(input_root.to_string_lossy().into_owned())),
    );
    let segmentation = section(SectionName::Segmentation)?;
    let segmentation_algorithm = SegmentationAlgorithm::from_name(
        segmentation
            .get("seg_algo")
            .and_then(ParamValue::as_str)
            .unwrap_or(SegmentationAlgorithm::AFQ_NAME),
    );

    Ok(ResolvedConfig {
        input_root,
        files,
        bundles: section(SectionName::Bundles)?,
        tracking: section(SectionName::Tracking)?,
        segmentation,
        cleaning: section(SectionName::Cleaning)?,
        compute: section(SectionName::Compute)?,
        segmentation_algorithm,
    })
}

/// Coerce a user value to the kind of its default.
///
/// Numeric defaults accept numeric text. Integer defaults only accept whole
/// numbers. Anything else must already match, except that an unset default
/// accepts any value.
fn coerce(
    section: SectionName,
    key: &str,
    default: Option<&ParamValue>,
    value: &ParamValue,
) -> Result<ParamValue, ConfigError> {
    let Some(default) = default else {
        return Ok(value.clone());
    };

    if defaults::is_count_or_false(section, key) {
        return coerce_count_or_false(section, key, value);
    }

    let mismatch = || ConfigError::TypeMismatch {
        section,
        key: key.to_string(),
        expected: default.kind(),
        found: value.kind(),
    };

    match (default.kind(), value) {
        (ValueKind::Int, ParamValue::Int(_)) => Ok(value.clone()),
        (ValueKind::Int, ParamValue::Float(f)) => whole_number(section, key, *f),
        (ValueKind::Int, ParamValue::Str(text)) => match parse_number(section, key, text)? {
            ParamValue::Float(f) => whole_number(section, key, f),
            n => Ok(n),
        },
        (ValueKind::Float, ParamValue::Float(_)) => Ok(value.clone()),
        #[allow(clippy::cast_precision_loss)]
        (ValueKind::Float, ParamValue::Int(i)) => Ok(ParamValue::Float(*i as f64)),
        (ValueKind::Float, ParamValue::Str(text)) => {
            parse_number(section, key, text).map(|n| match n {
                #[allow(clippy::cast_precision_loss)]
                ParamValue::Int(i) => ParamValue::Float(i as f64),
                other => other,
            })
        }
        (ValueKind::Function, ParamValue::Str(name) | ParamValue::Function(name)) => {
            Ok(ParamValue::Function(name.clone()))
        }
        (kind, value) if kind == value.kind() => Ok(value.clone()),
        _ => Err(mismatch()),
    }
}

/// `false` keeps the feature off; a positive whole number (or its text)
/// switches it on.
fn coerce_count_or_false(
    section: SectionName,
    key: &str,
    value: &ParamValue,
) -> Result<ParamValue, ConfigError> {
    let count = match value {
        ParamValue::Bool(false) => return Ok(value.clone()),
        ParamValue::Int(_) => value.clone(),
        ParamValue::Float(f) => whole_number(section, key, *f)?,
        ParamValue::Str(text) => match parse_number(section, key, text)? {
            ParamValue::Float(f) => whole_number(section, key, f)?,
            n => n,
        },
        other => {
            return Err(ConfigError::TypeMismatch {
                section,
                key: key.to_string(),
                expected: ValueKind::Int,
                found: other.kind(),
            })
        }
    };
    match count {
        ParamValue::Int(n) if n > 0 => Ok(count),
        _ => Err(ConfigError::Unsupported {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected false or a positive count, found {value}"),
        }),
    }
}

/// Accept a float only if it holds a whole number that fits in `i64`.
fn whole_number(section: SectionName, key: &str, f: f64) -> Result<ParamValue, ConfigError> {
    #[allow(clippy::cast_precision_loss)]
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    if f.fract() == 0.0 && in_range {
        #[allow(clippy::cast_possible_truncation)]
        let whole = f as i64;
        return Ok(ParamValue::Int(whole));
    }
    Err(ConfigError::NotAnInteger {
        section,
        key: key.to_string(),
        value: f.to_string(),
    })
}

fn parse_number(section: SectionName, key: &str, text: &str) -> Result<ParamValue, ConfigError> {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(ParamValue::Int(i));
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(ParamValue::Float(f)),
        _ => Err(ConfigError::InvalidNumber {
            section,
            key: key.to_string(),
            value: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_document_str;

    fn tracking_defaults() -> ParameterSet {
        defaults::defaults(SectionName::Tracking)
    }

    fn section(entries: &[(&str, Option<ParamValue>)]) -> Section {
        entries.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_missing_section_yields_defaults() {
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), None).unwrap();
        assert_eq!(resolved, tracking_defaults());
    }

    #[test]
    fn test_user_value_overrides_default() {
        let user = section(&[("n_seeds", Some(ParamValue::Int(4)))]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert_eq!(resolved.get("n_seeds"), Some(&ParamValue::Int(4)));
        assert_eq!(resolved.get("max_length"), Some(&ParamValue::Int(1000)));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let user = section(&[("n_seed", Some(ParamValue::Int(4)))]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert!(!resolved.contains_key("n_seed"));
        assert_eq!(resolved.len(), tracking_defaults().len());
    }

    #[test]
    fn test_unset_restores_default() {
        let explicit = section(&[("odf_model", None)]);
        let omitted = Section::new();
        let defaults = tracking_defaults();
        assert_eq!(
            resolve(SectionName::Tracking, &defaults, Some(&explicit)).unwrap(),
            resolve(SectionName::Tracking, &defaults, Some(&omitted)).unwrap()
        );
    }

    #[test]
    fn test_numeric_text_is_coerced() {
        let user = section(&[
            ("min_length", Some("20".into())),
            ("step_size", Some(" 1 ".into())),
        ]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert_eq!(resolved.get("min_length"), Some(&ParamValue::Int(20)));
        assert_eq!(resolved.get("step_size"), Some(&ParamValue::Float(1.0)));
    }

    #[test]
    fn test_unparsable_number_is_an_error() {
        let user = section(&[("seed_threshold", Some("five".into()))]);
        let err = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap_err();
        match err {
            ConfigError::InvalidNumber { section, key, value } => {
                assert_eq!(section, SectionName::Tracking);
                assert_eq!(key, "seed_threshold");
                assert_eq!(value, "five");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_kind_mismatch_is_an_error() {
        let user = section(&[("random_seeds", Some("yes".into()))]);
        let err = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap_err();
        assert!(err.to_string().contains("expected boolean, found string"), "got: {err}");
    }

    #[test]
    fn test_unset_default_accepts_any_value() {
        let user = section(&[("rng_seed", Some(ParamValue::Int(42)))]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert_eq!(resolved.get("rng_seed"), Some(&ParamValue::Int(42)));
    }

    #[test]
    fn test_function_default_accepts_a_name() {
        let user = section(&[("stat", Some("median".into()))]);
        let defaults = defaults::defaults(SectionName::Cleaning);
        let resolved = resolve(SectionName::Cleaning, &defaults, Some(&user)).unwrap();
        assert_eq!(resolved.get("stat"), Some(&ParamValue::Function("median".into())));
    }

    #[test]
    fn test_point_count_accepts_false_or_a_count() {
        let seg_defaults = defaults::defaults(SectionName::Segmentation);
        for (given, expected) in [
            (ParamValue::Int(100), ParamValue::Int(100)),
            (ParamValue::Bool(false), ParamValue::Bool(false)),
            (ParamValue::Str("20".into()), ParamValue::Int(20)),
            (ParamValue::Float(50.0), ParamValue::Int(50)),
        ] {
            let user = section(&[("nb_points", Some(given))]);
            let resolved = resolve(SectionName::Segmentation, &seg_defaults, Some(&user)).unwrap();
            assert_eq!(resolved.get("nb_points"), Some(&expected));
        }
    }

    #[test]
    fn test_point_count_rejects_true_and_non_positive() {
        let seg_defaults = defaults::defaults(SectionName::Segmentation);
        for given in [ParamValue::Bool(true), ParamValue::Int(0), ParamValue::Int(-3)] {
            let user = section(&[("nb_points", Some(given.clone()))]);
            let err = resolve(SectionName::Segmentation, &seg_defaults, Some(&user)).unwrap_err();
            assert!(err.to_string().contains("segmentation.nb_points"), "{given}: {err}");
        }
    }

    #[test]
    fn test_point_count_from_document() {
        let doc = parse_document_str(
            "[files]\ndmriprep_path = \"/d/dmriprep\"\n[segmentation]\nnb_points = 100",
        )
        .unwrap();
        crate::config::validator::validate_document(&doc).unwrap();
        let resolved = resolve_document(&doc).unwrap();
        assert_eq!(resolved.segmentation.get("nb_points"), Some(&ParamValue::Int(100)));
    }

    #[test]
    fn test_integer_setting_rejects_fractions() {
        for given in [ParamValue::Float(1.5), ParamValue::Str("1.5".into())] {
            let user = section(&[("n_seeds", Some(given))]);
            let err = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap_err();
            assert!(
                matches!(err, ConfigError::NotAnInteger { ref key, .. } if key == "n_seeds"),
                "got: {err}"
            );
        }
    }

    #[test]
    fn test_integer_setting_accepts_whole_floats() {
        let user = section(&[("n_seeds", Some(ParamValue::Float(3.0)))]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert_eq!(resolved.get("n_seeds"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn test_fractional_threshold_is_kept() {
        let user = section(&[("seed_threshold", Some(ParamValue::Float(0.25)))]);
        let resolved = resolve(SectionName::Tracking, &tracking_defaults(), Some(&user)).unwrap();
        assert_eq!(resolved.get("seed_threshold"), Some(&ParamValue::Float(0.25)));
    }

    #[test]
    fn test_document_requires_input_root() {
        let doc = parse_document_str("[segmentation]\nseg_algo = \"AFQ\"").unwrap();
        let err = resolve_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { section: SectionName::Files, key: "dmriprep_path" }
        ));
    }

    #[test]
    fn test_unset_input_root_counts_as_missing() {
        let doc = parse_document_str("[files]\ndmriprep_path = \"\"").unwrap();
        assert!(matches!(
            resolve_document(&doc).unwrap_err(),
            ConfigError::MissingRequired { .. }
        ));
    }

    #[test]
    fn test_document_resolves_every_section() {
        let doc = parse_document_str(
            r#"
[files]
dmriprep_path = "/data/study/dmriprep"
[segmentation]
seg_algo = "afq"
[compute]
force_recompute = true
"#,
        )
        .unwrap();
        let resolved = resolve_document(&doc).unwrap();
        assert_eq!(resolved.input_root, PathBuf::from("/data/study/dmriprep"));
        assert_eq!(resolved.segmentation_algorithm, SegmentationAlgorithm::Afq);
        assert!(resolved.force_recompute());
        assert!(!resolved.parallel());
        assert_eq!(
            resolved.files.get("dmriprep_path").and_then(ParamValue::as_str),
            Some("/data/study/dmriprep")
        );
        for name in SectionName::ALL {
            for key in defaults::defaults(name).keys() {
                assert!(resolved.section(name).contains_key(key), "{name}.{key} missing");
            }
        }
    }

    #[test]
    fn test_other_algorithm_resolves_to_other() {
        let doc = parse_document_str(
            "[files]\ndmriprep_path = \"/d/dmriprep\"\n[segmentation]\nseg_algo = \"Reco\"",
        )
        .unwrap();
        let resolved = resolve_document(&doc).unwrap();
        assert_eq!(
            resolved.segmentation_algorithm,
            SegmentationAlgorithm::Other("Reco".into())
        );
    }
}
