//! Cover-letter document rendering.

use serde_json::{Map, Value};

use crate::generation::assembler::render_body;
use crate::template::latex::COVER_LETTER_CONTACT_FIELDS;
use crate::template::{single_line, Rendered, Template, TemplateError, TemplateValues};

/// Placeholder -> portfolio `personal_information` keys, first non-empty wins.
const CONTACT_KEYS: &[(&str, &[&str])] = &[
    ("NAME", &["name", "full_name"]),
    ("PHONE", &["phone", "phone_number"]),
    ("EMAIL", &["email"]),
    ("LINKEDIN", &["linkedin", "linkedin_url"]),
    ("GITHUB", &["github", "github_url"]),
    ("ADDRESS", &["address", "location"]),
];

pub struct CoverLetterFields<'a> {
    pub company_name: &'a str,
    pub job_title: &'a str,
    /// Plain text; paragraphs separated by blank lines.
    pub content: &'a str,
}

/// Fills the cover-letter document. Contact placeholders default to empty.
pub fn render_cover_letter(
    document: &str,
    personal_information: &Map<String, Value>,
    fields: CoverLetterFields<'_>,
) -> Result<Rendered, TemplateError> {
    let template = COVER_LETTER_CONTACT_FIELDS
        .iter()
        .fold(Template::parse(document), |t, name| t.with_default(name, ""));

    let mut values = TemplateValues::new()
        .text("COMPANY_NAME", single_line(fields.company_name))
        .text("JOB_TITLE", single_line(fields.job_title))
        .markup("COVER_LETTER_CONTENT", render_body(fields.content)?);

    for (placeholder, keys) in CONTACT_KEYS {
        if let Some(value) = keys
            .iter()
            .filter_map(|k| personal_information.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|v| !v.is_empty())
        {
            values = values.text(placeholder, single_line(value));
        }
    }

    template.render(&values)
}
