//! Section Pipeline — walks the fixed section order once, producing one
//! `ProgressEvent` per section while accumulating section text.
//!
//! Sections run strictly one after another. A backend failure is recorded
//! against its section and the walk continues; nothing here aborts a run.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::generation::backend::{GenerationError, SectionBackend};
use crate::generation::prompts::PromptSource;
use crate::generation::section::{
    GenerationContext, ProgressEvent, Section, SectionMode, SectionOutcome, SectionResults,
    SectionSelection, SectionStatus,
};
use crate::llm_client::LlmError;
use crate::portfolio::SectionDataSource;

/// When a `generate` request for a verbatim-eligible section is served
/// verbatim instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Only when no generation prompt exists for the section.
    #[default]
    Unsupported,
    /// On any generation failure.
    AnyError,
    /// Never; failures are recorded as failures.
    Never,
}

impl FallbackPolicy {
    pub fn allows(self, error: &GenerationError) -> bool {
        match self {
            FallbackPolicy::Unsupported => matches!(error, GenerationError::UnsupportedSection(_)),
            FallbackPolicy::AnyError => true,
            FallbackPolicy::Never => false,
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unsupported" => Ok(FallbackPolicy::Unsupported),
            "any-error" | "any_error" => Ok(FallbackPolicy::AnyError),
            "never" => Ok(FallbackPolicy::Never),
            other => Err(format!(
                "unknown fallback policy '{other}' (expected unsupported, any-error or never)"
            )),
        }
    }
}

/// Backend per mode. `generator` is absent when the run has no LLM provider.
#[derive(Clone)]
pub struct SectionBackends {
    pub generator: Option<Arc<dyn SectionBackend>>,
    pub verbatim: Arc<dyn SectionBackend>,
}

/// One run over all sections. Single consumption: once `next_event` returns
/// `None`, take the accumulated text with `into_results`.
pub struct SectionPipeline {
    context: Arc<GenerationContext>,
    selection: SectionSelection,
    data: Arc<dyn SectionDataSource>,
    prompts: Arc<dyn PromptSource>,
    backends: SectionBackends,
    fallback: FallbackPolicy,
    cursor: usize,
    results: SectionResults,
}

impl SectionPipeline {
    pub fn new(
        context: Arc<GenerationContext>,
        selection: SectionSelection,
        data: Arc<dyn SectionDataSource>,
        prompts: Arc<dyn PromptSource>,
        backends: SectionBackends,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            context,
            selection,
            data,
            prompts,
            backends,
            fallback,
            cursor: 0,
            results: SectionResults::default(),
        }
    }

    /// Processes the next section. `None` once every section has been seen.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        let section = *Section::ALL.get(self.cursor)?;
        let mode = self.selection.mode(section);
        let title = section.title();

        let (status, label) = match self.process(section, mode).await {
            Step::Skipped => (SectionStatus::Skipped, format!("Skipped {title}")),
            Step::Done { status, outcome } => {
                let label = match status {
                    SectionStatus::Generated => format!("Generated {title}"),
                    SectionStatus::FellBack => {
                        format!("Hardcoded {title} (generation unavailable)")
                    }
                    _ => format!("Hardcoded {title}"),
                };
                self.results.insert(section, outcome);
                (status, label)
            }
            Step::Failed(error) => {
                warn!(section = %section, error = %error, "section failed");
                self.results
                    .insert(section, SectionOutcome::Failed(error.to_string()));
                (SectionStatus::Failed, format!("Failed {title}: {error}"))
            }
        };

        self.cursor += 1;
        let fraction = self.cursor as f64 / Section::ALL.len() as f64;
        info!(section = %section, ?status, fraction, "section processed");

        Some(ProgressEvent {
            label,
            fraction,
            section,
            status,
        })
    }

    pub fn into_results(self) -> SectionResults {
        self.results
    }

    async fn process(&self, section: Section, mode: SectionMode) -> Step {
        if mode == SectionMode::Skip {
            return Step::Skipped;
        }

        let Some(data) = self.data.section_data(section) else {
            return Step::Failed(GenerationError::MissingData(section));
        };

        if mode == SectionMode::Hardcode {
            return match self.hardcode(&data).await {
                Ok(text) => Step::done(SectionStatus::Hardcoded, SectionOutcome::Hardcoded(text)),
                Err(e) => Step::Failed(e),
            };
        }

        match self.generate(section, &data).await {
            Ok(text) => Step::done(SectionStatus::Generated, SectionOutcome::Generated(text)),
            Err(e) if section.is_verbatim_eligible() && self.fallback.allows(&e) => {
                info!(section = %section, reason = %e, "falling back to verbatim formatting");
                match self.hardcode(&data).await {
                    Ok(text) => {
                        Step::done(SectionStatus::FellBack, SectionOutcome::Hardcoded(text))
                    }
                    Err(e) => Step::Failed(e),
                }
            }
            Err(e) => Step::Failed(e),
        }
    }

    async fn generate(&self, section: Section, data: &Value) -> Result<String, GenerationError> {
        let prompt = self
            .prompts
            .section_prompt(section)
            .ok_or(GenerationError::UnsupportedSection(section))?;
        let backend = self
            .backends
            .generator
            .as_ref()
            .ok_or(LlmError::NoTextGeneration(self.context.provider))?;
        backend
            .generate(prompt, data, &self.context.job_description)
            .await
    }

    async fn hardcode(&self, data: &Value) -> Result<String, GenerationError> {
        self.backends
            .verbatim
            .generate("", data, &self.context.job_description)
            .await
    }
}

enum Step {
    Skipped,
    Done {
        status: SectionStatus,
        outcome: SectionOutcome,
    },
    Failed(GenerationError),
}

impl Step {
    fn done(status: SectionStatus, outcome: SectionOutcome) -> Self {
        Step::Done { status, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::backend::VerbatimBackend;
    use crate::generation::prompts::PromptLibrary;
    use crate::llm_client::Provider;
    use crate::portfolio::Portfolio;
    use crate::testing::{sample_portfolio, CountingBackend, FailingBackend};
    use serde_json::json;

    fn context() -> Arc<GenerationContext> {
        Arc::new(GenerationContext {
            job_description: "Senior Engineer".to_string(),
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            provider: Provider::Ollama,
            model: "llama3.1".to_string(),
            temperature: 0.1,
        })
    }

    fn pipeline(
        selection: SectionSelection,
        generator: Option<Arc<dyn SectionBackend>>,
        fallback: FallbackPolicy,
    ) -> SectionPipeline {
        SectionPipeline::new(
            context(),
            selection,
            Arc::new(sample_portfolio()),
            Arc::new(PromptLibrary::builtin()),
            SectionBackends {
                generator,
                verbatim: Arc::new(VerbatimBackend),
            },
            fallback,
        )
    }

    async fn drain(pipeline: &mut SectionPipeline) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = pipeline.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_one_event_per_section_with_increasing_fractions() {
        let generator = Arc::new(CountingBackend::new("- Tailored"));
        let mut run = pipeline(
            SectionSelection::uniform(SectionMode::Generate),
            Some(generator.clone()),
            FallbackPolicy::Unsupported,
        );

        let events = drain(&mut run).await;

        assert_eq!(events.len(), Section::ALL.len());
        let sections: Vec<Section> = events.iter().map(|e| e.section).collect();
        assert_eq!(sections, Section::ALL.to_vec());
        for pair in events.windows(2) {
            assert!(pair[1].fraction > pair[0].fraction);
        }
        assert!(events[0].fraction > 0.0);
        assert_eq!(events.last().unwrap().fraction, 1.0);
        // Awards and publications have no built-in prompt.
        assert_eq!(generator.calls(), 6);
        assert_eq!(run.into_results().len(), 8);
    }

    #[tokio::test]
    async fn test_all_hardcode_never_calls_generator() {
        let generator = Arc::new(CountingBackend::new("unused"));
        let mut run = pipeline(
            SectionSelection::uniform(SectionMode::Hardcode),
            Some(generator.clone()),
            FallbackPolicy::Unsupported,
        );

        let events = drain(&mut run).await;

        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| e.status == SectionStatus::Hardcoded));
        assert_eq!(events[0].label, "Hardcoded Personal Information");
        assert_eq!(generator.calls(), 0);
        let results = run.into_results();
        assert!(results.failed().is_empty());
        assert!(matches!(
            results.get(Section::WorkExperience),
            Some(SectionOutcome::Hardcoded(text)) if text.starts_with("## Acme")
        ));
    }

    #[tokio::test]
    async fn test_failing_section_is_recorded_and_run_continues() {
        let generator = Arc::new(FailingBackend::new(|| GenerationError::EmptyResponse));
        let selection = SectionSelection::uniform(SectionMode::Hardcode)
            .with(Section::Skills, SectionMode::Generate);
        let mut run = pipeline(selection, Some(generator), FallbackPolicy::Unsupported);

        let events = drain(&mut run).await;

        assert_eq!(events.len(), 8);
        let skills = &events[2];
        assert_eq!(skills.section, Section::Skills);
        assert_eq!(skills.status, SectionStatus::Failed);
        assert_eq!(skills.label, "Failed Skills: backend returned empty text");
        assert_eq!(events.last().unwrap().fraction, 1.0);

        let results = run.into_results();
        assert_eq!(results.failed(), vec![Section::Skills]);
        assert_eq!(results.len(), 8);
    }

    #[tokio::test]
    async fn test_awards_fall_back_to_verbatim_without_prompt() {
        let generator = Arc::new(CountingBackend::new("- Tailored"));
        let mut run = pipeline(
            SectionSelection::uniform(SectionMode::Generate),
            Some(generator),
            FallbackPolicy::Unsupported,
        );

        let events = drain(&mut run).await;

        let awards = &events[6];
        assert_eq!(awards.status, SectionStatus::FellBack);
        assert_eq!(awards.label, "Hardcoded Awards (generation unavailable)");
        assert!(matches!(
            run.into_results().get(Section::Awards),
            Some(SectionOutcome::Hardcoded(_))
        ));
    }

    #[tokio::test]
    async fn test_fallback_policy_controls_failures_on_eligible_sections() {
        let selection = SectionSelection::uniform(SectionMode::Hardcode)
            .with(Section::Publications, SectionMode::Generate)
            .with(Section::Projects, SectionMode::Generate);
        let failing = || -> Arc<dyn SectionBackend> {
            Arc::new(FailingBackend::new(|| GenerationError::EmptyResponse))
        };

        // Publications has no prompt: unsupported under every policy but `never`.
        let mut run = pipeline(selection.clone(), Some(failing()), FallbackPolicy::AnyError);
        let events = drain(&mut run).await;
        assert_eq!(events[7].status, SectionStatus::FellBack);
        // Projects is not verbatim-eligible, so any-error does not rescue it.
        assert_eq!(events[5].status, SectionStatus::Failed);

        let mut run = pipeline(selection, Some(failing()), FallbackPolicy::Never);
        let events = drain(&mut run).await;
        assert_eq!(events[7].status, SectionStatus::Failed);
        assert_eq!(
            events[7].label,
            "Failed Publications: no generation prompt for section 'publications'"
        );
    }

    #[tokio::test]
    async fn test_skipped_sections_record_nothing() {
        let selection = SectionSelection::uniform(SectionMode::Hardcode)
            .with(Section::Projects, SectionMode::Skip);
        let mut run = pipeline(selection, None, FallbackPolicy::Unsupported);

        let events = drain(&mut run).await;

        assert_eq!(events[5].status, SectionStatus::Skipped);
        assert_eq!(events[5].label, "Skipped Projects");
        assert_eq!(events[5].fraction, 0.75);
        let results = run.into_results();
        assert_eq!(results.len(), 7);
        assert!(results.get(Section::Projects).is_none());
    }

    #[tokio::test]
    async fn test_missing_data_and_missing_generator_fail_the_section() {
        let data = Portfolio::from_value(json!({
            "personal_information": {"name": "Jane"}
        }))
        .unwrap();
        let selection = SectionSelection::uniform(SectionMode::Hardcode)
            .with(Section::PersonalInformation, SectionMode::Generate);
        let mut run = SectionPipeline::new(
            context(),
            selection,
            Arc::new(data),
            Arc::new(PromptLibrary::builtin()),
            SectionBackends {
                generator: None,
                verbatim: Arc::new(VerbatimBackend),
            },
            FallbackPolicy::Unsupported,
        );

        let events = drain(&mut run).await;

        assert_eq!(
            events[0].label,
            "Failed Personal Information: provider 'ollama' does not generate text"
        );
        assert_eq!(
            events[1].label,
            "Failed Summary: portfolio has no data for section 'career_summary'"
        );
        assert_eq!(run.into_results().failed().len(), 8);
    }

    #[tokio::test]
    async fn test_exhausted_pipeline_keeps_returning_none() {
        let mut run = pipeline(
            SectionSelection::uniform(SectionMode::Skip),
            None,
            FallbackPolicy::Unsupported,
        );
        assert_eq!(drain(&mut run).await.len(), 8);
        assert!(run.next_event().await.is_none());
        assert!(run.into_results().is_empty());
    }

    #[test]
    fn test_fallback_policy_parsing() {
        assert_eq!("unsupported".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Unsupported));
        assert_eq!("Any-Error".parse::<FallbackPolicy>(), Ok(FallbackPolicy::AnyError));
        assert_eq!("never".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Never));
        assert!("sometimes".parse::<FallbackPolicy>().is_err());
    }
}
