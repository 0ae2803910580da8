//! Document Assembler — turns accumulated section text into one LaTeX source.
//!
//! Section text is plain text with two line markers: `## ` starts an entry
//! heading and `- ` a bullet. Every piece of text reaches the output through
//! `Template::render`, so it is always escaped.

use std::collections::BTreeMap;

use crate::generation::section::{Section, SectionResults};
use crate::template::latex::{
    ENTRY_HEADING_TEMPLATE, HEADER_LINE_TEMPLATE, HEADER_TEMPLATE, ITEMIZE_TEMPLATE,
    ITEM_TEMPLATE, PARAGRAPH_TEMPLATE, RESUME_DOCUMENT, SECTION_TEMPLATE,
};
use crate::template::{single_line, Rendered, Template, TemplateError, TemplateValues};

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDocument {
    pub source: Rendered,
    /// Section key -> text, for every section that produced text.
    pub sections: BTreeMap<String, String>,
    pub failed: Vec<Section>,
    /// Sections with text over sections attempted (skipped ones excluded).
    pub completion: f64,
}

/// A stored preamble is trusted markup, but it still goes through the
/// interpolator so it cannot carry unfilled placeholders.
pub fn trusted_preamble(text: &str) -> Result<Rendered, TemplateError> {
    Template::parse(text).render(&TemplateValues::new())
}

pub fn assemble(
    results: SectionResults,
    preamble: Rendered,
) -> Result<AssembledDocument, TemplateError> {
    let mut fragments = Vec::new();
    let mut sections = BTreeMap::new();

    for (section, outcome) in results.iter() {
        let Some(text) = outcome.text() else {
            continue;
        };
        fragments.push(render_section(section, text)?);
        sections.insert(section.key().to_string(), text.to_string());
    }

    let attempted = results.len();
    let completion = if attempted == 0 {
        1.0
    } else {
        sections.len() as f64 / attempted as f64
    };

    let source = Template::parse(RESUME_DOCUMENT).render(
        &TemplateValues::new()
            .markup("preamble", preamble)
            .markup("body", Rendered::join(fragments, "\n")),
    )?;

    Ok(AssembledDocument {
        source,
        sections,
        failed: results.failed(),
        completion,
    })
}

pub fn render_section(section: Section, text: &str) -> Result<Rendered, TemplateError> {
    if section == Section::PersonalInformation {
        let lines = text
            .lines()
            .map(strip_marker)
            .filter(|l| !l.is_empty())
            .map(|line| {
                Template::parse(HEADER_LINE_TEMPLATE)
                    .render(&TemplateValues::new().text("line", single_line(line)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Template::parse(HEADER_TEMPLATE)
            .render(&TemplateValues::new().markup("lines", Rendered::join(lines, "\n")));
    }

    Template::parse(SECTION_TEMPLATE).render(
        &TemplateValues::new()
            .text("heading", section.title())
            .markup("body", render_body(text)?),
    )
}

/// Plain section text to LaTeX blocks: headings, itemize runs and paragraphs.
pub fn render_body(text: &str) -> Result<Rendered, TemplateError> {
    let heading = Template::parse(ENTRY_HEADING_TEMPLATE);
    let paragraph = Template::parse(PARAGRAPH_TEMPLATE);
    let item = Template::parse(ITEM_TEMPLATE);

    let mut blocks: Vec<Rendered> = Vec::new();
    let mut items: Vec<Rendered> = Vec::new();

    for line in text.lines().map(str::trim) {
        if let Some(bullet) = bullet_text(line) {
            items.push(item.render(&TemplateValues::new().text("item", single_line(bullet)))?);
            continue;
        }
        flush_items(&mut items, &mut blocks)?;

        if line.is_empty() {
            continue;
        }
        if let Some(title) = line.strip_prefix("## ") {
            blocks.push(heading.render(&TemplateValues::new().text("heading", single_line(title)))?);
        } else {
            blocks.push(paragraph.render(&TemplateValues::new().text("text", line))?);
        }
    }
    flush_items(&mut items, &mut blocks)?;

    Ok(Rendered::join(blocks, "\n"))
}

fn flush_items(items: &mut Vec<Rendered>, blocks: &mut Vec<Rendered>) -> Result<(), TemplateError> {
    if items.is_empty() {
        return Ok(());
    }
    let list = Rendered::join(std::mem::take(items), "\n");
    blocks.push(Template::parse(ITEMIZE_TEMPLATE).render(&TemplateValues::new().markup("items", list))?);
    Ok(())
}

fn bullet_text(line: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    bullet_text(line)
        .or_else(|| line.strip_prefix("## ").map(str::trim))
        .unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::section::SectionOutcome;
    use crate::template::latex::RESUME_PREAMBLE;

    fn preamble() -> Rendered {
        trusted_preamble(RESUME_PREAMBLE).unwrap()
    }

    #[test]
    fn test_body_markup_becomes_headings_lists_and_paragraphs() {
        let body = render_body(
            "## Acme | Engineer\n- Cut costs 30%\n- Led 5 engineers\n\nShipped on time & under budget",
        )
        .unwrap();
        assert_eq!(
            body.as_str(),
            "\\textbf{Acme | Engineer}\\par\n\
             \\begin{itemize}\n  \\item Cut costs 30\\%\n  \\item Led 5 engineers\n\\end{itemize}\n\
             Shipped on time \\& under budget\\par"
        );
    }

    #[test]
    fn test_headings_and_items_collapse_inner_whitespace() {
        let body = render_body("## Acme \t  Corp\n-   Led\t\tmigration   to Rust").unwrap();
        assert_eq!(
            body.as_str(),
            "\\textbf{Acme Corp}\\par\n\\begin{itemize}\n  \\item Led migration to Rust\n\\end{itemize}"
        );
    }

    #[test]
    fn test_header_lists_personal_details() {
        let header = render_section(Section::PersonalInformation, "Name: Jane_Doe\n\n- jane@x.io").unwrap();
        assert_eq!(
            header.as_str(),
            "\\begin{center}\nName: Jane\\_Doe\\\\\njane@x.io\\\\\n\\end{center}\n"
        );
    }

    #[test]
    fn test_assemble_orders_sections_and_reports_failures() {
        let mut results = SectionResults::default();
        results.insert(Section::Skills, SectionOutcome::Generated("Languages: Rust".into()));
        results.insert(Section::PersonalInformation, SectionOutcome::Hardcoded("Jane".into()));
        results.insert(Section::Projects, SectionOutcome::Failed("timeout".into()));
        results.insert(Section::CareerSummary, SectionOutcome::Generated("Builds {{body}}".into()));

        let doc = assemble(results, preamble()).unwrap();
        let source = doc.source.as_str();

        assert!(source.starts_with(RESUME_PREAMBLE));
        assert!(source.ends_with("\\end{document}\n"));
        let header = source.find("Jane").unwrap();
        let summary = source.find("\\section*{Summary}").unwrap();
        let skills = source.find("\\section*{Skills}").unwrap();
        assert!(header < summary && summary < skills);
        assert!(!source.contains("\\section*{Projects}"));
        assert!(source.contains(r"Builds \{\{body\}\}\par"));

        assert_eq!(doc.failed, vec![Section::Projects]);
        assert_eq!(doc.completion, 0.75);
        assert_eq!(
            doc.sections.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["career_summary", "personal_information", "skills"]
        );
    }

    #[test]
    fn test_partial_document_is_still_assembled() {
        let mut results = SectionResults::default();
        results.insert(Section::Awards, SectionOutcome::Failed("boom".into()));
        let doc = assemble(results, preamble()).unwrap();
        assert_eq!(doc.completion, 0.0);
        assert!(doc.sections.is_empty());
        assert!(doc.source.as_str().contains("\\begin{document}"));
    }

    #[test]
    fn test_preamble_with_placeholder_is_rejected() {
        assert_eq!(
            trusted_preamble("\\title{{{title}}}"),
            Err(TemplateError::MissingValue("title".to_string()))
        );
    }
}
