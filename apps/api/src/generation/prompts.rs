// Section prompts. Built-in defaults, overridable per file from PROMPTS_DIR:
// `<section>_prompt.txt`, `system_prompt.txt`, `cover_letter_prompt.txt`.
// Awards and publications have no built-in prompt; they are formatted verbatim
// unless a prompt file is supplied.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::generation::section::Section;
use crate::llm_client::prompts::SECTION_SYSTEM;

pub const PERSONAL_INFORMATION_PROMPT: &str = "Format the candidate's contact details as the \
    resume header. Output one item per line in this order: full name, location, phone, email, \
    then profile links. Omit anything that is missing. Do not add labels.";

pub const CAREER_SUMMARY_PROMPT: &str = "Write a professional summary of at most four sentences \
    for the candidate, aimed at the job description below. Lead with the candidate's strongest \
    experience that matches the role. Output a single paragraph.";

pub const SKILLS_PROMPT: &str = "Select and group the candidate's skills that are most relevant \
    to the job description. Output one line per group in the form `Group: skill, skill, skill`. \
    Use at most six groups and drop skills that are unrelated to the role.";

pub const WORK_EXPERIENCE_PROMPT: &str = "Rewrite the candidate's work experience for the job \
    description. For each position output a `## Company | Title | Location | Dates` heading \
    followed by two to four `- ` bullets. Start every bullet with a strong past-tense verb and \
    keep every metric exactly as given. Keep positions in the order supplied.";

pub const EDUCATION_PROMPT: &str = "Format the candidate's education. For each degree output a \
    `## University | Degree | Location | Dates` heading, then at most one `- ` bullet listing \
    the courses most relevant to the job description.";

pub const PROJECTS_PROMPT: &str = "Pick the candidate's projects that best support the job \
    description, at most four. For each output a `## Name | Technologies | Date` heading and \
    one to three `- ` bullets describing what was built and its outcome.";

pub const COVER_LETTER_PROMPT: &str = "Write the body of a cover letter for the job description \
    below, using only facts from the candidate's resume sections. Open with the role and why the \
    candidate fits it, give two short paragraphs of matching evidence, and close with a one-line \
    call to action. Do not include a greeting line, signature, addresses or dates. Output plain \
    paragraphs separated by blank lines.";

pub const JOB_INFO_PROMPT: &str = "Read the job description below and reply with the hiring \
    company's name and the job title separated by a single '|' character, for example \
    `Acme Corp|Senior Backend Engineer`. Reply with that one line only, without quotes or \
    commentary. Use `Unknown` for a value the description does not state.";

/// Source of prompt text for sections and cover letters.
pub trait PromptSource: Send + Sync {
    fn system_prompt(&self) -> &str;

    /// `None` means the section cannot be generated, only formatted verbatim.
    fn section_prompt(&self, section: Section) -> Option<&str>;

    fn cover_letter_prompt(&self) -> &str;

    /// Asks for `company|title` when a request leaves them blank.
    fn job_info_prompt(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    system: String,
    sections: HashMap<Section, String>,
    cover_letter: String,
    job_info: String,
}

impl PromptLibrary {
    pub fn builtin() -> Self {
        let sections = [
            (Section::PersonalInformation, PERSONAL_INFORMATION_PROMPT),
            (Section::CareerSummary, CAREER_SUMMARY_PROMPT),
            (Section::Skills, SKILLS_PROMPT),
            (Section::WorkExperience, WORK_EXPERIENCE_PROMPT),
            (Section::Education, EDUCATION_PROMPT),
            (Section::Projects, PROJECTS_PROMPT),
        ]
        .into_iter()
        .map(|(section, prompt)| (section, prompt.to_string()))
        .collect();

        Self {
            system: SECTION_SYSTEM.to_string(),
            sections,
            cover_letter: COVER_LETTER_PROMPT.to_string(),
            job_info: JOB_INFO_PROMPT.to_string(),
        }
    }

    /// Built-in prompts, with any file present in `dir` taking precedence.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let mut library = Self::builtin();
        let Some(dir) = dir else {
            return Ok(library);
        };

        let mut overridden = 0;
        if let Some(text) = read_prompt(dir, "system_prompt.txt")? {
            library.system = text;
            overridden += 1;
        }
        if let Some(text) = read_prompt(dir, "cover_letter_prompt.txt")? {
            library.cover_letter = text;
            overridden += 1;
        }
        if let Some(text) = read_prompt(dir, "folder_name_prompt.txt")? {
            library.job_info = text;
            overridden += 1;
        }
        for section in Section::ALL {
            let file = format!("{}_prompt.txt", section.key());
            if let Some(text) = read_prompt(dir, &file)? {
                library.sections.insert(section, text);
                overridden += 1;
            }
        }

        info!("Loaded {} prompt overrides from {}", overridden, dir.display());
        Ok(library)
    }
}

impl PromptSource for PromptLibrary {
    fn system_prompt(&self) -> &str {
        &self.system
    }

    fn section_prompt(&self, section: Section) -> Option<&str> {
        self.sections.get(&section).map(String::as_str)
    }

    fn cover_letter_prompt(&self) -> &str {
        &self.cover_letter
    }

    fn job_info_prompt(&self) -> &str {
        &self.job_info
    }
}

/// Trimmed file contents; `None` when the file does not exist or is blank.
fn read_prompt(dir: &Path, file: &str) -> Result<Option<String>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read prompt file {}", path.display()))?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
