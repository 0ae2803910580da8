//! Structured personal data, read once at startup from a JSON document keyed
//! by section (`personal_information`, `work_experience`, ...).

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::generation::section::Section;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("failed to read portfolio {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("portfolio is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("portfolio root must be a JSON object")]
    NotAnObject,

    #[error("section '{section}' must be {expected}")]
    WrongShape {
        section: Section,
        expected: &'static str,
    },
}

/// Read-only access to per-section data.
pub trait SectionDataSource: Send + Sync {
    /// `None` when the portfolio has nothing for `section`.
    fn section_data(&self, section: Section) -> Option<Value>;

    fn personal_information(&self) -> Map<String, Value> {
        match self.section_data(Section::PersonalInformation) {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    sections: Map<String, Value>,
}

impl Portfolio {
    pub fn load(path: &Path) -> Result<Self, PortfolioError> {
        let text = std::fs::read_to_string(path).map_err(|source| PortfolioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_value(serde_json::from_str(&text)?)
    }

    /// Checks each known section's shape. Unknown keys are kept but never read.
    pub fn from_value(value: Value) -> Result<Self, PortfolioError> {
        let Value::Object(sections) = value else {
            return Err(PortfolioError::NotAnObject);
        };

        for section in Section::ALL {
            let Some(data) = sections.get(section.key()).filter(|v| !v.is_null()) else {
                continue;
            };
            let ok = match section {
                Section::PersonalInformation => data.is_object(),
                // Single object, plain text or a list of skill groups are all seen in the wild.
                Section::CareerSummary | Section::Skills => {
                    data.is_object() || data.is_string() || data.is_array()
                }
                _ => data.is_array(),
            };
            if !ok {
                return Err(PortfolioError::WrongShape {
                    section,
                    expected: shape_name(section),
                });
            }
        }

        Ok(Self { sections })
    }
}

fn shape_name(section: Section) -> &'static str {
    match section {
        Section::PersonalInformation => "an object",
        Section::CareerSummary | Section::Skills => "an object, string or list",
        _ => "a list of objects",
    }
}

impl SectionDataSource for Portfolio {
    fn section_data(&self, section: Section) -> Option<Value> {
        self.sections
            .get(section.key())
            .filter(|v| !v.is_null())
            .cloned()
    }
}
