//! The user configuration document, after parsing and before resolution.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::ParamValue;

// ---------------------------------------------------------------------------
// Section names
// ---------------------------------------------------------------------------

/// Sections understood by the run command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionName {
    Files,
    Bundles,
    Tracking,
    Segmentation,
    Cleaning,
    Compute,
}

impl SectionName {
    /// Every known section, in document order.
    pub const ALL: [SectionName; 6] = [
        Self::Files,
        Self::Bundles,
        Self::Tracking,
        Self::Segmentation,
        Self::Cleaning,
        Self::Compute,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Bundles => "bundles",
            Self::Tracking => "tracking",
            Self::Segmentation => "segmentation",
            Self::Cleaning => "cleaning",
            Self::Compute => "compute",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Whether the section parameterizes one engine stage (as opposed to the
    /// engine-level `files`, `bundles` and `compute` sections).
    #[must_use]
    pub fn is_stage(self) -> bool {
        matches!(self, Self::Tracking | Self::Segmentation | Self::Cleaning)
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Section / document
// ---------------------------------------------------------------------------

/// User-supplied key/value pairs for one section.
///
/// A `None` value records that the key was written but explicitly left unset,
/// which resolves exactly like omitting the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section(BTreeMap<String, Option<ParamValue>>);

impl Section {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<ParamValue>) {
        self.0.insert(key.into(), value);
    }

    /// The user value for `key` if one was provided.
    #[must_use]
    pub fn provided(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<ParamValue>)> for Section {
    fn from_iter<I: IntoIterator<Item = (K, Option<ParamValue>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Parsed configuration document keyed by raw section name.
///
/// Unknown section names are kept so validation can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    sections: BTreeMap<String, Section>,
}

impl ConfigDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_section(&mut self, name: impl Into<String>, section: Section) {
        self.sections.insert(name.into(), section);
    }

    #[must_use]
    pub fn section(&self, name: SectionName) -> Option<&Section> {
        self.sections.get(name.as_str())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}
