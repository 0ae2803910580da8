// Shared prompt fragments and the user-message layout used for every section call.
// Section-specific instructions live in generation::prompts.

/// Default system prompt. Overridable with `system_prompt.txt` in PROMPTS_DIR.
pub const SECTION_SYSTEM: &str = "You are an expert resume writer tailoring a candidate's \
    resume to a specific job description. \
    Use ONLY facts present in the supplied data. Do NOT invent employers, dates, numbers or skills. \
    Respond with plain text only: no LaTeX, no Markdown emphasis, no code fences, no commentary. \
    Start each entry heading line with '## ' and each bullet line with '- '. \
    Separate paragraphs with a blank line.";

/// Builds the user message: instructions, then the data block, then the job description.
pub fn format_section_prompt(prompt: &str, data: &str, job_description: &str) -> String {
    let mut message = format!("{}\n\n", prompt.trim());
    if !data.is_empty() {
        message.push_str(&format!(
            "Here is the personal information in JSON format:\n<data>\n{data}\n</data>\n\n"
        ));
    }
    if !job_description.is_empty() {
        message.push_str(&format!(
            "Job Description:\n<job_description>\n{job_description}\n</job_description>\n"
        ));
    }
    message
}
