// Built-in LaTeX templates.
// Preambles are seeded into `document_templates` by the first migration and can be
// replaced there; the fragment templates below are fixed.

/// Default résumé preamble (template id 1). Everything before `\begin{document}`.
pub const RESUME_PREAMBLE: &str = r"\documentclass[letterpaper,11pt]{article}
\usepackage[T1]{fontenc}
\usepackage[utf8]{inputenc}
\usepackage[margin=0.6in]{geometry}
\usepackage{enumitem}
\usepackage{titlesec}
\usepackage[hidelinks]{hyperref}
\pagestyle{empty}
\setlength{\parindent}{0pt}
\titleformat{\section}{\large\bfseries\scshape}{}{0em}{}[\titlerule]
\titlespacing*{\section}{0pt}{8pt}{4pt}
\setlist[itemize]{leftmargin=1.2em,itemsep=1pt,topsep=2pt}";

/// Default cover-letter document (template id 2). Complete document with
/// contact placeholders, which default to empty when the portfolio omits them.
pub const COVER_LETTER_DOCUMENT: &str = r"\documentclass[11pt]{article}
\usepackage[T1]{fontenc}
\usepackage[utf8]{inputenc}
\usepackage[margin=1in]{geometry}
\usepackage{parskip}
\pagestyle{empty}
\begin{document}
\begin{flushright}
{\Large\bfseries {{NAME}}}\\
{{ADDRESS}}\\
{{PHONE}} \textbar{} {{EMAIL}}\\
{{LINKEDIN}} \textbar{} {{GITHUB}}
\end{flushright}

\today

Hiring Team\\
{{COMPANY_NAME}}

\textbf{Re: {{JOB_TITLE}}}

{{COVER_LETTER_CONTENT}}

\end{document}
";

/// Contact placeholders in the cover-letter document that may be left blank.
pub const COVER_LETTER_CONTACT_FIELDS: &[&str] =
    &["NAME", "PHONE", "EMAIL", "LINKEDIN", "GITHUB", "ADDRESS"];

/// Whole résumé: trusted preamble plus assembled section fragments.
pub const RESUME_DOCUMENT: &str = "{{preamble}}\n\\begin{document}\n{{body}}\n\\end{document}\n";

/// Personal information block at the top of the page.
pub const HEADER_TEMPLATE: &str = "\\begin{center}\n{{lines}}\n\\end{center}\n";

pub const HEADER_LINE_TEMPLATE: &str = "{{line}}\\\\";

/// Every other section.
pub const SECTION_TEMPLATE: &str = "\\section*{{{heading}}}\n{{body}}\n";

/// `## ` lines inside a section body.
pub const ENTRY_HEADING_TEMPLATE: &str = "\\textbf{{{heading}}}\\par";

/// A run of `- ` lines inside a section body.
pub const ITEMIZE_TEMPLATE: &str = "\\begin{itemize}\n{{items}}\n\\end{itemize}";

pub const ITEM_TEMPLATE: &str = "  \\item {{item}}";

pub const PARAGRAPH_TEMPLATE: &str = "{{text}}\\par";
