//! TOML configuration parsing with environment variable substitution.
//!
//! The empty string is the only way TOML lets a user write "use the default"
//! for a key, so it is turned into `None` here and never travels further.
//!
//! `${VAR}` references are expanded inside string values after the TOML is
//! parsed, so a variable's value never has to be valid TOML. A number taken
//! from the environment is written as a string (`n_seeds = "${SEEDS}"`) and
//! converted during resolution.

use std::path::Path;
use std::sync::LazyLock;

use afq_types::{ConfigDocument, ParamValue, Section};
use regex::{Captures, Regex};

use crate::error::ConfigError;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Textual value that marks a key as explicitly unset.
pub const UNSET_SENTINEL: &str = "";

/// Expand `${VAR_NAME}` in `input`, recording unset variables in `missing`.
fn expand_env_vars(input: &str, missing: &mut Vec<String>) -> String {
    ENV_VAR_RE
        .replace_all(input, |cap: &Captures<'_>| {
            let var_name = &cap[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing.iter().any(|m| m == var_name) {
                    missing.push(var_name.to_string());
                }
                String::new()
            })
        })
        .into_owned()
}

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVars`] naming every referenced variable
/// that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing = Vec::new();
    let result = expand_env_vars(input, &mut missing);
    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }
    Ok(result)
}

/// Parse a configuration document from TOML text.
///
/// # Errors
///
/// Returns an error if the TOML is invalid, a top-level entry is not a
/// table, a value has an unsupported shape, or a referenced environment
/// variable is not set.
pub fn parse_document_str(toml_str: &str) -> Result<ConfigDocument, ConfigError> {
    let table: toml::Table = toml::from_str(toml_str)?;

    let mut missing = Vec::new();
    let mut document = ConfigDocument::new();
    for (name, value) in table {
        let toml::Value::Table(entries) = value else {
            return Err(ConfigError::NotASection { name });
        };
        let mut section = Section::new();
        for (key, raw) in entries {
            let value = section_value(&name, &key, raw, &mut missing)?;
            section.insert(key, value);
        }
        document.insert_section(name, section);
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }
    Ok(document)
}

/// Parse a configuration document file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content is invalid.
pub fn parse_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document_str(&content)
}

/// Section-level conversion: the unset sentinel becomes `None`.
fn section_value(
    section: &str,
    key: &str,
    raw: toml::Value,
    missing: &mut Vec<String>,
) -> Result<Option<ParamValue>, ConfigError> {
    match convert(section, key, raw, missing)? {
        ParamValue::Str(s) if s == UNSET_SENTINEL => Ok(None),
        other => Ok(Some(other)),
    }
}

fn convert(
    section: &str,
    key: &str,
    raw: toml::Value,
    missing: &mut Vec<String>,
) -> Result<ParamValue, ConfigError> {
    Ok(match raw {
        toml::Value::String(s) => ParamValue::Str(expand_env_vars(&s, missing)),
        toml::Value::Integer(i) => ParamValue::Int(i),
        toml::Value::Float(f) => ParamValue::Float(f),
        toml::Value::Boolean(b) => ParamValue::Bool(b),
        toml::Value::Datetime(dt) => ParamValue::Str(dt.to_string()),
        toml::Value::Array(items) => ParamValue::List(
            items
                .into_iter()
                .map(|item| convert(section, key, item, missing))
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(_) => {
            return Err(ConfigError::Unsupported {
                section: section.to_string(),
                key: key.to_string(),
                reason: "nested tables are not supported".to_string(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use afq_types::SectionName;

    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("AFQ_TEST_STUDY_ROOT", "/data/study");
        let input = "[files]\ndmriprep_path = \"${AFQ_TEST_STUDY_ROOT}/dmriprep\"";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("/data/study/dmriprep"));
        assert!(!result.contains("${AFQ_TEST_STUDY_ROOT}"));
        std::env::remove_var("AFQ_TEST_STUDY_ROOT");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "[tracking]\nn_seeds = 2";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_missing_env_vars_all_reported_once() {
        let input = "${AFQ_MISSING_X} ${AFQ_MISSING_Y} ${AFQ_MISSING_X}";
        let err = substitute_env_vars(input).unwrap_err();
        match err {
            ConfigError::MissingEnvVars(names) => {
                assert_eq!(names, vec!["AFQ_MISSING_X", "AFQ_MISSING_Y"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_string_parses_as_unset() {
        let doc = parse_document_str(
            r#"
[tracking]
rng_seed = ""
n_seeds = 2
"#,
        )
        .unwrap();
        let tracking = doc.section(SectionName::Tracking).unwrap();
        assert!(tracking.contains_key("rng_seed"));
        assert!(tracking.provided("rng_seed").is_none());
        assert_eq!(tracking.provided("n_seeds"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_empty_string_inside_list_is_kept() {
        let doc = parse_document_str("[bundles]\nscalars = [\"dti_fa\", \"\"]").unwrap();
        let bundles = doc.section(SectionName::Bundles).unwrap();
        assert_eq!(
            bundles.provided("scalars"),
            Some(&ParamValue::List(vec!["dti_fa".into(), "".into()]))
        );
    }

    #[test]
    fn test_value_shapes_convert() {
        let doc = parse_document_str(
            r#"
[segmentation]
seg_algo = "AFQ"
clip_edges = true
b0_threshold = 50
[tracking]
step_size = 0.25
"#,
        )
        .unwrap();
        let seg = doc.section(SectionName::Segmentation).unwrap();
        assert_eq!(seg.provided("clip_edges"), Some(&ParamValue::Bool(true)));
        assert_eq!(seg.provided("b0_threshold"), Some(&ParamValue::Int(50)));
        let tracking = doc.section(SectionName::Tracking).unwrap();
        assert_eq!(tracking.provided("step_size"), Some(&ParamValue::Float(0.25)));
    }

    #[test]
    fn test_top_level_scalar_is_rejected() {
        let err = parse_document_str("title = \"study\"").unwrap_err();
        assert!(matches!(err, ConfigError::NotASection { ref name } if name == "title"));
    }

    #[test]
    fn test_nested_table_is_rejected() {
        let err = parse_document_str("[tracking.extra]\nx = 1").unwrap_err();
        assert!(err.to_string().contains("nested tables"), "got: {err}");
    }

    #[test]
    fn test_parse_invalid_toml_errors() {
        let err = parse_document_str("[files\ndmriprep_path = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_values_with_quotes_and_backslashes() {
        std::env::set_var("AFQ_TEST_QUOTED_ROOT", r#"C:\data\"study"\dmriprep"#);
        let doc = parse_document_str("[files]\ndmriprep_path = \"${AFQ_TEST_QUOTED_ROOT}\"").unwrap();
        std::env::remove_var("AFQ_TEST_QUOTED_ROOT");
        let files = doc.section(SectionName::Files).unwrap();
        assert_eq!(
            files.provided("dmriprep_path"),
            Some(&ParamValue::Str(r#"C:\data\"study"\dmriprep"#.into()))
        );
    }

    #[test]
    fn test_env_vars_inside_lists_are_expanded() {
        std::env::set_var("AFQ_TEST_SCALAR", "dki_fa");
        let doc = parse_document_str("[bundles]\nscalars = [\"dti_fa\", \"${AFQ_TEST_SCALAR}\"]").unwrap();
        std::env::remove_var("AFQ_TEST_SCALAR");
        let bundles = doc.section(SectionName::Bundles).unwrap();
        assert_eq!(
            bundles.provided("scalars"),
            Some(&ParamValue::List(vec!["dti_fa".into(), "dki_fa".into()]))
        );
    }

    #[test]
    fn test_missing_env_vars_across_document_reported_together() {
        let err = parse_document_str(
            "[files]\ndmriprep_path = \"${AFQ_MISSING_ROOT}\"\n[tracking]\nseed_mask = \"${AFQ_MISSING_MASK}\"",
        )
        .unwrap_err();
        match err {
            ConfigError::MissingEnvVars(mut names) => {
                names.sort();
                assert_eq!(names, vec!["AFQ_MISSING_MASK", "AFQ_MISSING_ROOT"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_env_vars_in_comments_are_ignored() {
        let doc = parse_document_str("# uses ${AFQ_NOT_SET_ANYWHERE}\n[tracking]\nn_seeds = 2").unwrap();
        assert!(doc.section(SectionName::Tracking).is_some());
    }

    #[test]
    fn test_parse_document_file_not_found() {
        let err = parse_document(Path::new("/nonexistent/afq_config.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read configuration file"));
    }
}
