//! Job Info — fills a blank company name or job title from the job description.

use std::time::Duration;

use tracing::{info, warn};

use crate::llm_client::prompts::format_section_prompt;
use crate::llm_client::{strip_code_fences, LlmClient};

/// Company and title for a run. Either may be blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub company_name: String,
    pub job_title: String,
}

impl JobInfo {
    pub fn new(company_name: &str, job_title: &str) -> Self {
        Self {
            company_name: company_name.trim().to_string(),
            job_title: job_title.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.company_name.is_empty() && !self.job_title.is_empty()
    }

    /// Keeps values the caller supplied; only blanks take the extracted ones.
    fn fill_from(self, extracted: JobInfo) -> JobInfo {
        JobInfo {
            company_name: if self.company_name.is_empty() {
                extracted.company_name
            } else {
                self.company_name
            },
            job_title: if self.job_title.is_empty() {
                extracted.job_title
            } else {
                self.job_title
            },
        }
    }
}

/// Parses a `company|title` reply. Quotes and fences are dropped.
pub fn parse_job_info(reply: &str) -> Option<JobInfo> {
    let line = strip_code_fences(reply)
        .lines()
        .map(str::trim)
        .find(|line| line.contains('|'))?;
    let line = line.replace(['"', '\'', '`'], "");
    let (company, title) = line.split_once('|')?;
    let info = JobInfo::new(company, title);
    info.is_complete().then_some(info)
}

const JOB_INFO_SYSTEM: &str =
    "You extract facts from job postings and reply with exactly the format requested.";

/// Asks `client` for the blank parts of `info`. Any failure is logged and the
/// blanks are kept; a naming problem never fails a run.
pub async fn resolve_job_info(
    info: JobInfo,
    client: &dyn LlmClient,
    prompt: &str,
    job_description: &str,
    timeout: Duration,
) -> JobInfo {
    if info.is_complete() {
        return info;
    }

    let message = format_section_prompt(prompt, "", job_description);
    let reply = match tokio::time::timeout(timeout, client.complete(JOB_INFO_SYSTEM, &message)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            warn!("Job info extraction failed: {e}");
            return info;
        }
        Err(_) => {
            warn!("Job info extraction timed out after {}s", timeout.as_secs());
            return info;
        }
    };

    match parse_job_info(&reply) {
        Some(extracted) => {
            let resolved = info.fill_from(extracted);
            info!(
                company = %resolved.company_name,
                job_title = %resolved.job_title,
                "Filled job info from description"
            );
            resolved
        }
        None => {
            warn!("Job info reply was not 'company|title': {reply:?}");
            info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::testing::ScriptedLlm;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_parse_plain_and_decorated_replies() {
        assert_eq!(
            parse_job_info("Acme Corp|Senior Engineer"),
            Some(JobInfo::new("Acme Corp", "Senior Engineer"))
        );
        assert_eq!(
            parse_job_info("Here you go:\n\"Globex\" | 'Data Scientist'\n"),
            Some(JobInfo::new("Globex", "Data Scientist"))
        );
        assert_eq!(
            parse_job_info("```\nInitech|QA Lead\n```"),
            Some(JobInfo::new("Initech", "QA Lead"))
        );
    }

    #[test]
    fn test_parse_rejects_missing_halves() {
        assert_eq!(parse_job_info("Acme Corp"), None);
        assert_eq!(parse_job_info("|Engineer"), None);
        assert_eq!(parse_job_info("Acme| "), None);
    }

    #[tokio::test]
    async fn test_only_blank_fields_are_filled() {
        let llm = ScriptedLlm::new(vec![Ok("Globex|Data Scientist".to_string())]);

        let info = resolve_job_info(
            JobInfo::new("Acme", ""),
            &llm,
            "name it",
            "We are hiring",
            TIMEOUT,
        )
        .await;

        assert_eq!(info, JobInfo::new("Acme", "Data Scientist"));
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("We are hiring"));
    }

    #[tokio::test]
    async fn test_complete_info_makes_no_call() {
        let llm = ScriptedLlm::new(Vec::new());
        let info = resolve_job_info(
            JobInfo::new("Acme", "Engineer"),
            &llm,
            "name it",
            "jd",
            TIMEOUT,
        )
        .await;
        assert_eq!(info, JobInfo::new("Acme", "Engineer"));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failures_keep_blanks() {
        let llm = ScriptedLlm::new(vec![
            Err(LlmError::EmptyContent),
            Ok("no separator here".to_string()),
        ]);

        for _ in 0..2 {
            let info =
                resolve_job_info(JobInfo::new("", ""), &llm, "name it", "jd", TIMEOUT)
                    .await;
            assert_eq!(info, JobInfo::new("", ""));
        }
    }
}
