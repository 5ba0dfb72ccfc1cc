//! Semantic validation of a parsed configuration document.

use afq_types::{ConfigDocument, ParamValue, SectionName};

use crate::defaults;
use crate::error::ConfigError;

/// Top-level table written by the run journal. Ignored so that a journal can
/// be fed back in as a configuration document.
pub const JOURNAL_SECTION: &str = "pyAFQ";

/// Check every list entry of `key` is a non-empty string.
fn validate_name_list(
    document: &ConfigDocument,
    section: SectionName,
    key: &str,
    errors: &mut Vec<String>,
) {
    let Some(value) = document.section(section).and_then(|s| s.provided(key)) else {
        return;
    };
    let Some(items) = value.as_list() else {
        // Kind mismatches are reported by resolution with the expected kind.
        return;
    };
    if items.is_empty() {
        errors.push(format!("{section}.{key} must name at least one entry"));
    }
    for (i, item) in items.iter().enumerate() {
        match item {
            ParamValue::Str(s) if !s.trim().is_empty() => {}
            ParamValue::Str(_) => errors.push(format!("{section}.{key}[{i}] is empty")),
            other => errors.push(format!(
                "{section}.{key}[{i}] must be a string, found {}",
                other.kind()
            )),
        }
    }
}

/// Validate a parsed configuration document.
///
/// Unknown keys inside a known section are errors: a misspelled parameter
/// would otherwise silently run with its default. Unknown sections are only
/// logged.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] listing every problem found.
pub fn validate_document(document: &ConfigDocument) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    for name in document.section_names() {
        if SectionName::from_name(name).is_none() && name != JOURNAL_SECTION {
            tracing::warn!(section = name, "Ignoring unknown configuration section");
        }
    }

    for section in SectionName::ALL {
        let Some(entries) = document.section(section) else {
            continue;
        };
        for key in entries.keys() {
            if !defaults::is_known_key(section, key) {
                errors.push(format!("Unknown setting '{key}' in [{section}]"));
            }
        }
    }

    validate_name_list(document, SectionName::Bundles, "bundle_names", &mut errors);
    validate_name_list(document, SectionName::Bundles, "scalars", &mut errors);

    if let Some(ParamValue::Str(algo)) = document
        .section(SectionName::Segmentation)
        .and_then(|s| s.provided("seg_algo"))
    {
        if algo.trim().is_empty() {
            errors.push("segmentation.seg_algo must not be blank".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}
