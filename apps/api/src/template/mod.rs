//! Template Interpolator — fills `{{name}}` placeholders with escaped values.
//!
//! A placeholder is `{{` + `[A-Za-z0-9_]+` + `}}`. Every other brace sequence is
//! literal template text and passes through untouched, which keeps LaTeX such as
//! `\textbf{{{heading}}}` usable as a template.
//!
//! Values come in two kinds:
//! - `TemplateValue::Text` — untrusted text (portfolio data, LLM output). Always
//!   LaTeX-escaped before substitution.
//! - `TemplateValue::Markup` — a `Rendered` fragment produced by an earlier
//!   interpolation. Inserted as-is; `Rendered` has no public constructor from a
//!   plain string, so markup can only originate from a template.

pub mod escape;
pub mod latex;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

pub use escape::{escape_latex, single_line};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("no value for placeholder '{{{{{0}}}}}'")]
    MissingValue(String),
    #[error("'{0}' is not a valid placeholder name")]
    InvalidName(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Values
// ────────────────────────────────────────────────────────────────────────────

/// Output of a successful interpolation. Safe to embed in another template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered(String);

impl Rendered {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins fragments with a literal separator.
    pub fn join<I>(parts: I, separator: &'static str) -> Rendered
    where
        I: IntoIterator<Item = Rendered>,
    {
        let joined = parts
            .into_iter()
            .map(Rendered::into_string)
            .collect::<Vec<_>>()
            .join(separator);
        Rendered(joined)
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Text(String),
    Markup(Rendered),
}

impl TemplateValue {
    fn write_to(&self, out: &mut String) {
        match self {
            TemplateValue::Text(text) => out.push_str(&escape_latex(text)),
            TemplateValue::Markup(markup) => out.push_str(markup.as_str()),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(text: &str) -> Self {
        TemplateValue::Text(text.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(text: String) -> Self {
        TemplateValue::Text(text)
    }
}

impl From<Rendered> for TemplateValue {
    fn from(markup: Rendered) -> Self {
        TemplateValue::Markup(markup)
    }
}

/// Named values for one interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues(HashMap<String, TemplateValue>);

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, text: impl Into<String>) -> Self {
        self.0
            .insert(name.to_string(), TemplateValue::Text(text.into()));
        self
    }

    pub fn markup(mut self, name: &str, markup: Rendered) -> Self {
        self.0.insert(name.to_string(), TemplateValue::Markup(markup));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.0.get(name)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Template
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template: literal text interleaved with named placeholders, plus
/// optional per-placeholder defaults.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
    defaults: HashMap<String, TemplateValue>,
}

impl Template {
    /// Parses `text`. Never fails: brace sequences that are not well-formed
    /// placeholders are kept as literal text.
    pub fn parse(text: &str) -> Template {
        Template {
            segments: parse_segments(text),
            defaults: HashMap::new(),
        }
    }

    /// Value used for `name` when the caller does not supply one.
    pub fn with_default(mut self, name: &str, value: impl Into<TemplateValue>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }

    /// The declared placeholder set, sorted.
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Substitutes every placeholder. All placeholders are checked before any
    /// output is built; values for names the template does not declare are ignored,
    /// but a name that could never be a placeholder is an error.
    pub fn render(&self, values: &TemplateValues) -> Result<Rendered, TemplateError> {
        if let Some(bad) = values
            .names()
            .chain(self.defaults.keys().map(String::as_str))
            .find(|name| !is_placeholder_name(name))
        {
            return Err(TemplateError::InvalidName(bad.to_string()));
        }

        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| values.get(name).is_none() && !self.defaults.contains_key(*name))
        {
            return Err(TemplateError::MissingValue(missing.to_string()));
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    // Presence checked above.
                    if let Some(value) = values.get(name).or_else(|| self.defaults.get(name)) {
                        value.write_to(&mut out);
                    }
                }
            }
        }

        Ok(Rendered(out))
    }
}

/// One-shot parse + render.
pub fn safe_format(template_text: &str, values: &TemplateValues) -> Result<Rendered, TemplateError> {
    Template::parse(template_text).render(values)
}

fn parse_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match placeholder_name(after) {
            Some(name) => {
                literal.push_str(&rest[..start]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name.to_string()));
                rest = &after[name.len() + 2..];
            }
            None => {
                // Keep one brace and rescan, so `{{{name}}}` still finds `{{name}}`.
                literal.push_str(&rest[..start + 1]);
                rest = &rest[start + 1..];
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn placeholder_name(s: &str) -> Option<&str> {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if end == 0 || !s[end..].starts_with("}}") {
        return None;
    }
    Some(&s[..end])
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
