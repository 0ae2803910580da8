//! LaTeX escaping for interpolated values.
//!
//! The escaped form never contains `{{` or `}}` and every brace it emits is
//! either backslash-escaped or part of an argument-less command such as
//! `\textbackslash{}`, so escaped text cannot open a placeholder or change the
//! grouping of the surrounding template.

/// Escapes LaTeX control characters so `text` renders literally.
///
/// Newlines are kept (they separate paragraphs in LaTeX), tabs become spaces,
/// and other control characters are dropped.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '&' | '%' | '$' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '<' => out.push_str(r"\textless{}"),
            '>' => out.push_str(r"\textgreater{}"),
            '\n' => out.push('\n'),
            '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Collapses `text` to a single line, for values placed where a newline
/// would end a LaTeX construct early (headings, list items).
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
