//! Résumé sections, per-run mode selection, and the values a run produces.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::llm_client::Provider;

// ────────────────────────────────────────────────────────────────────────────
// Section
// ────────────────────────────────────────────────────────────────────────────

/// One unit of résumé content. Declaration order is document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    PersonalInformation,
    CareerSummary,
    Skills,
    WorkExperience,
    Education,
    Projects,
    Awards,
    Publications,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::PersonalInformation,
        Section::CareerSummary,
        Section::Skills,
        Section::WorkExperience,
        Section::Education,
        Section::Projects,
        Section::Awards,
        Section::Publications,
    ];

    /// Key used in portfolio data, prompt file names, selections and storage.
    pub fn key(self) -> &'static str {
        match self {
            Section::PersonalInformation => "personal_information",
            Section::CareerSummary => "career_summary",
            Section::Skills => "skills",
            Section::WorkExperience => "work_experience",
            Section::Education => "education",
            Section::Projects => "projects",
            Section::Awards => "awards",
            Section::Publications => "publications",
        }
    }

    /// Heading printed in the document.
    pub fn title(self) -> &'static str {
        match self {
            Section::PersonalInformation => "Personal Information",
            Section::CareerSummary => "Summary",
            Section::Skills => "Skills",
            Section::WorkExperience => "Experience",
            Section::Education => "Education",
            Section::Projects => "Projects",
            Section::Awards => "Awards",
            Section::Publications => "Publications",
        }
    }

    /// Awards and publications are list-structured free text: they can always be
    /// formatted verbatim, even when generation was requested.
    pub fn is_verbatim_eligible(self) -> bool {
        matches!(self, Section::Awards | Section::Publications)
    }

    /// Whether the portfolio holds a list of entries (vs. a single object).
    pub fn is_list(self) -> bool {
        !matches!(
            self,
            Section::PersonalInformation | Section::CareerSummary | Section::Skills
        )
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Section {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.key() == s)
            .ok_or_else(|| SelectionError::UnknownSection(s.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionMode {
    /// Rewrite with the LLM backend.
    #[serde(alias = "process")]
    Generate,
    /// Format portfolio data verbatim.
    Hardcode,
    /// Leave the section out.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("section '{0}' is selected more than once")]
    DuplicateSection(String),

    #[error("selection is missing sections: {}", join_keys(.0))]
    MissingSections(Vec<Section>),
}

impl From<SelectionError> for AppError {
    fn from(e: SelectionError) -> Self {
        AppError::Validation(e.to_string())
    }
}

fn join_keys(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Caller-supplied `section key -> mode` entries, in request order.
///
/// Deserializes from a JSON object but keeps every entry, so a key given twice
/// reaches validation instead of silently overwriting the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSelection(Vec<(String, SectionMode)>);

impl RawSelection {
    pub fn entries(&self) -> impl Iterator<Item = (&str, SectionMode)> + '_ {
        self.0.iter().map(|(key, mode)| (key.as_str(), *mode))
    }
}

impl FromIterator<(String, SectionMode)> for RawSelection {
    fn from_iter<I: IntoIterator<Item = (String, SectionMode)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for RawSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawSelection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of section key to mode")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(Section::ALL.len()));
                while let Some(entry) = map.next_entry::<String, SectionMode>()? {
                    entries.push(entry);
                }
                Ok(RawSelection(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Exactly one mode for every section. Complete by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSelection {
    modes: BTreeMap<Section, SectionMode>,
}

impl SectionSelection {
    pub fn uniform(mode: SectionMode) -> Self {
        Self {
            modes: Section::ALL.into_iter().map(|s| (s, mode)).collect(),
        }
    }

    /// Validates caller-supplied entries. Unknown and repeated keys are
    /// rejected, in request order, before missing ones are reported.
    pub fn from_raw(raw: &RawSelection) -> Result<Self, SelectionError> {
        let mut modes = BTreeMap::new();
        for (key, mode) in raw.entries() {
            let section: Section = key.parse()?;
            if modes.insert(section, mode).is_some() {
                return Err(SelectionError::DuplicateSection(key.to_string()));
            }
        }

        let missing: Vec<Section> = Section::ALL
            .into_iter()
            .filter(|s| !modes.contains_key(s))
            .collect();
        if !missing.is_empty() {
            return Err(SelectionError::MissingSections(missing));
        }

        Ok(Self { modes })
    }

    pub fn with(mut self, section: Section, mode: SectionMode) -> Self {
        self.modes.insert(section, mode);
        self
    }

    pub fn mode(&self, section: Section) -> SectionMode {
        self.modes
            .get(&section)
            .copied()
            .unwrap_or(SectionMode::Skip)
    }

    pub fn requires_llm(&self) -> bool {
        self.modes.values().any(|m| *m == SectionMode::Generate)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run context and outputs
// ────────────────────────────────────────────────────────────────────────────

/// Immutable inputs of one résumé run.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub job_description: String,
    pub company_name: String,
    pub job_title: String,
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Generated,
    Hardcoded,
    /// Generation was requested but unavailable; formatted verbatim instead.
    FellBack,
    Skipped,
    Failed,
}

/// One step of observable progress. `fraction` counts processed sections,
/// including failed and skipped ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub label: String,
    pub fraction: f64,
    pub section: Section,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionOutcome {
    Generated(String),
    Hardcoded(String),
    Failed(String),
}

impl SectionOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            SectionOutcome::Generated(text) | SectionOutcome::Hardcoded(text) => Some(text),
            SectionOutcome::Failed(_) => None,
        }
    }
}

/// Accumulated outcomes, iterated in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionResults(BTreeMap<Section, SectionOutcome>);

impl SectionResults {
    pub fn insert(&mut self, section: Section, outcome: SectionOutcome) {
        self.0.insert(section, outcome);
    }

    pub fn get(&self, section: Section) -> Option<&SectionOutcome> {
        self.0.get(&section)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &SectionOutcome)> {
        self.0.iter().map(|(s, o)| (*s, o))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn failed(&self) -> Vec<Section> {
        self.iter()
            .filter(|(_, o)| matches!(o, SectionOutcome::Failed(_)))
            .map(|(s, _)| s)
            .collect()
    }
}
