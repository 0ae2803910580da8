//! Generation Orchestrator — the single entry point for résumé and cover-letter runs.
//!
//! Résumé flow: validate request → job info → output directory → SectionPipeline
//! (one progress event per section) → DocumentAssembler → render → one INSERT.
//!
//! Validation happens before the stream exists, so a bad request never reaches
//! a backend. The stream is lazy: nothing runs until it is polled, and dropping
//! it early leaves the store untouched because the only write is the final INSERT.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::assembler::{assemble, trusted_preamble};
use crate::generation::backend::{LlmSectionBackend, SectionBackend, VerbatimBackend};
use crate::generation::cover_letter::{render_cover_letter, CoverLetterFields};
use crate::generation::job_info::{resolve_job_info, JobInfo};
use crate::generation::pipeline::{FallbackPolicy, SectionBackends, SectionPipeline};
use crate::generation::prompts::PromptSource;
use crate::generation::screening::ClearanceGuard;
use crate::generation::section::{
    GenerationContext, ProgressEvent, RawSelection, Section, SectionResults, SectionSelection,
};
use crate::llm_client::prompts::format_section_prompt;
use crate::llm_client::{
    strip_code_fences, LlmClient, LlmFactory, ModelSettings, Provider, DEFAULT_TEMPERATURE,
};
use crate::models::resume::NewResume;
use crate::portfolio::SectionDataSource;
use crate::render::DocumentRenderer;
use crate::storage::{OutputDir, ResumeStore};

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for résumé generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeRequest {
    pub job_description: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    /// `openai`, `claude` (`anthropic`), `gemini` (`google`), `ollama` or `none`.
    #[serde(default)]
    pub provider: String,
    /// Provider default when absent.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Section key -> mode. Must name every section exactly once.
    pub selection: RawSelection,
}

/// Request body for a cover letter on an existing résumé.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverLetterRequest {
    pub job_description: String,
    /// Falls back to the résumé's company when empty.
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    /// Overrides the résumé's provider. Required when that was `none`.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedRun {
    pub label: String,
    pub fraction: f64,
    pub resume_id: i64,
    /// Sections with text over sections attempted.
    pub completion: f64,
    pub failed_sections: Vec<Section>,
    pub output_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    Progress(ProgressEvent),
    Completed(CompletedRun),
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub output_root: PathBuf,
    pub resume_template_id: i32,
    pub cover_letter_template_id: i32,
    pub fallback: FallbackPolicy,
    pub llm_timeout: Duration,
    pub clearance_guard: ClearanceGuard,
}

/// A validated run, ready to stream.
struct PreparedRun {
    context: GenerationContext,
    selection: SectionSelection,
    /// Built only when some section generates or job info is missing.
    client: Option<Arc<dyn LlmClient>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct GenerationOrchestrator {
    store: Arc<dyn ResumeStore>,
    renderer: Arc<dyn DocumentRenderer>,
    llm: Arc<dyn LlmFactory>,
    data: Arc<dyn SectionDataSource>,
    prompts: Arc<dyn PromptSource>,
    settings: OrchestratorSettings,
}

impl GenerationOrchestrator {
    pub fn new(
        store: Arc<dyn ResumeStore>,
        renderer: Arc<dyn DocumentRenderer>,
        llm: Arc<dyn LlmFactory>,
        data: Arc<dyn SectionDataSource>,
        prompts: Arc<dyn PromptSource>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            renderer,
            llm,
            data,
            prompts,
            settings,
        }
    }

    /// Validates `request` and returns the lazy event stream of the run.
    ///
    /// Yields one `Progress` per section, then a single `Completed` carrying the
    /// new record id. Assembly, render and store failures end the stream with
    /// an `Err` item and no record.
    pub fn generate_resume(
        self: Arc<Self>,
        request: ResumeRequest,
    ) -> Result<impl Stream<Item = Result<GenerationEvent, AppError>> + Send + 'static, AppError>
    {
        let PreparedRun {
            context,
            selection,
            client,
        } = self.prepare_resume(request)?;

        let span = info_span!(
            "resume_run",
            run_id = %Uuid::new_v4(),
            company = %context.company_name,
            job_title = %context.job_title,
        );
        let orchestrator = self;

        Ok(try_stream! {
            let context = Arc::new(
                orchestrator
                    .fill_job_info(context, client.as_deref())
                    .instrument(span.clone())
                    .await,
            );
            let output = OutputDir::create(
                &orchestrator.settings.output_root,
                &context.company_name,
                &context.job_title,
            )
            .instrument(span.clone())
            .await?;
            output
                .write("job_description.txt", &context.job_description)
                .await?;

            let mut pipeline = orchestrator.pipeline(context.clone(), selection, client);
            while let Some(event) = pipeline.next_event().instrument(span.clone()).await {
                yield GenerationEvent::Progress(event);
            }

            let results = pipeline.into_results();
            let completed = orchestrator
                .finish(&context, results, &output)
                .instrument(span.clone())
                .await?;
            yield GenerationEvent::Completed(completed);
        })
    }

    fn prepare_resume(&self, request: ResumeRequest) -> Result<PreparedRun, AppError> {
        self.check_job_description(&request.job_description)?;

        let selection = SectionSelection::from_raw(&request.selection)?;
        let provider: Provider = request.provider.parse()?;
        let settings = model_settings(provider, request.model, request.temperature)?;

        if selection.requires_llm() && provider == Provider::None {
            return Err(AppError::Validation(
                "provider 'none' cannot generate sections; use hardcode or skip".to_string(),
            ));
        }

        let job_info = JobInfo::new(&request.company_name, &request.job_title);
        let needs_client =
            provider != Provider::None && (selection.requires_llm() || !job_info.is_complete());
        let client = if needs_client {
            Some(self.llm.build(provider, settings.clone())?)
        } else {
            None
        };

        let context = GenerationContext {
            job_description: request.job_description.trim().to_string(),
            company_name: job_info.company_name,
            job_title: job_info.job_title,
            provider,
            model: settings.model,
            temperature: settings.temperature,
        };

        Ok(PreparedRun {
            context,
            selection,
            client,
        })
    }

    /// Empty descriptions and postings the clearance guard matches never reach a model.
    fn check_job_description(&self, job_description: &str) -> Result<(), AppError> {
        if job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "job_description cannot be empty".to_string(),
            ));
        }
        if let Some(keyword) = self.settings.clearance_guard.find(job_description) {
            return Err(AppError::Validation(format!(
                "Cannot generate content for positions requiring security clearance (matched '{keyword}')"
            )));
        }
        Ok(())
    }

    /// Blank company or title is asked of the run's model when there is one.
    async fn fill_job_info(
        &self,
        mut context: GenerationContext,
        client: Option<&dyn LlmClient>,
    ) -> GenerationContext {
        let Some(client) = client else {
            return context;
        };
        let info = resolve_job_info(
            JobInfo::new(&context.company_name, &context.job_title),
            client,
            self.prompts.job_info_prompt(),
            &context.job_description,
            self.settings.llm_timeout,
        )
        .await;
        context.company_name = info.company_name;
        context.job_title = info.job_title;
        context
    }

    fn pipeline(
        &self,
        context: Arc<GenerationContext>,
        selection: SectionSelection,
        client: Option<Arc<dyn LlmClient>>,
    ) -> SectionPipeline {
        let generator: Option<Arc<dyn SectionBackend>> = match client {
            Some(client) if selection.requires_llm() => Some(Arc::new(LlmSectionBackend::new(
                client,
                self.prompts.system_prompt(),
                self.settings.llm_timeout,
            ))),
            _ => None,
        };

        SectionPipeline::new(
            context,
            selection,
            self.data.clone(),
            self.prompts.clone(),
            SectionBackends {
                generator,
                verbatim: Arc::new(VerbatimBackend),
            },
            self.settings.fallback,
        )
    }

    /// Assembly, rendering and the single persistence write.
    async fn finish(
        &self,
        context: &GenerationContext,
        results: SectionResults,
        output: &OutputDir,
    ) -> Result<CompletedRun, AppError> {
        let template_id = self.settings.resume_template_id;
        let preamble = self
            .store
            .get_preamble(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document template {template_id} not found")))?;

        let document = assemble(results, trusted_preamble(&preamble)?)?;
        if !document.failed.is_empty() {
            warn!(
                "Assembled partial resume: {} section(s) failed",
                document.failed.len()
            );
        }

        output.write("resume.tex", document.source.as_str()).await?;
        let pdf = self.renderer.render(document.source.as_str()).await?;
        output.write("resume.pdf", &pdf).await?;

        let resume_id = self
            .store
            .insert_resume(NewResume {
                company_name: context.company_name.clone(),
                job_title: context.job_title.clone(),
                job_description: context.job_description.clone(),
                sections: document.sections,
                resume_tex: document.source.into_string(),
                resume_pdf: pdf.to_vec(),
                provider: context.provider.to_string(),
                model: context.model.clone(),
                temperature: context.temperature,
            })
            .await?;

        info!(
            resume_id,
            completion = document.completion,
            "Resume run complete"
        );

        Ok(CompletedRun {
            label: format!("Saved resume {resume_id}"),
            fraction: 1.0,
            resume_id,
            completion: document.completion,
            failed_sections: document.failed,
            output_dir: output.path().display().to_string(),
        })
    }

    /// One-shot cover letter for an existing record, stored in place.
    ///
    /// The record's provider settings are used unless the request names a
    /// provider; a record made with `none` therefore needs one.
    pub async fn generate_cover_letter(
        &self,
        resume_id: i64,
        request: CoverLetterRequest,
    ) -> Result<(), AppError> {
        self.check_job_description(&request.job_description)?;
        let job_description = request.job_description.trim();

        let record = self
            .store
            .get_resume(resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

        let company_name = non_empty_or(&request.company_name, &record.company_name);
        let job_title = non_empty_or(&request.job_title, &record.job_title);
        let span = info_span!("cover_letter", resume_id, company = %company_name);

        let (provider, settings) = match request.provider.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                let provider: Provider = name.parse()?;
                let settings = model_settings(provider, request.model, request.temperature)?;
                (provider, settings)
            }
            _ => {
                let provider: Provider = record.provider.parse()?;
                let model = request.model.or_else(|| Some(record.model.clone()));
                let temperature = request.temperature.or(Some(record.temperature));
                (provider, model_settings(provider, model, temperature)?)
            }
        };
        if provider == Provider::None {
            return Err(AppError::Validation(format!(
                "resume {resume_id} was generated without a provider; \
                 choose one to write a cover letter"
            )));
        }
        let client = self.llm.build(provider, settings)?;

        let data = serde_json::to_string_pretty(&record.sections.0)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize sections: {e}")))?;
        let message =
            format_section_prompt(self.prompts.cover_letter_prompt(), &data, job_description);

        let reply = tokio::time::timeout(
            self.settings.llm_timeout,
            client.complete(self.prompts.system_prompt(), &message),
        )
        .instrument(span.clone())
        .await
        .map_err(|_| {
            AppError::Llm(format!(
                "cover letter call timed out after {}s",
                self.settings.llm_timeout.as_secs()
            ))
        })??;

        let content = strip_code_fences(&reply);
        if content.is_empty() {
            return Err(AppError::Llm("cover letter reply was empty".to_string()));
        }

        let template_id = self.settings.cover_letter_template_id;
        let document = self
            .store
            .get_preamble(template_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document template {template_id} not found")))?;
        let source = render_cover_letter(
            &document,
            &self.data.personal_information(),
            CoverLetterFields {
                company_name,
                job_title,
                content,
            },
        )?;

        let output =
            OutputDir::create(&self.settings.output_root, company_name, job_title).await?;
        output.write("cover_letter.tex", source.as_str()).await?;
        let pdf = self
            .renderer
            .render(source.as_str())
            .instrument(span.clone())
            .await?;
        output.write("cover_letter.pdf", &pdf).await?;

        self.store
            .update_cover_letter(resume_id, content, &pdf)
            .await?;

        info!(parent: &span, "Cover letter stored for resume {resume_id}");
        Ok(())
    }
}

/// Provider default model and temperature for absent values. A blank model or
/// an out-of-range temperature is a validation error.
fn model_settings(
    provider: Provider,
    model: Option<String>,
    temperature: Option<f32>,
) -> Result<ModelSettings, AppError> {
    let model = match model {
        Some(model) if model.trim().is_empty() => {
            return Err(AppError::Validation("model cannot be empty".to_string()))
        }
        Some(model) => model.trim().to_string(),
        None => provider.default_model().to_string(),
    };

    let temperature = temperature.unwrap_or(DEFAULT_TEMPERATURE);
    if !(0.0..=1.0).contains(&temperature) {
        return Err(AppError::Validation(format!(
            "temperature must be between 0.0 and 1.0, got {temperature}"
        )));
    }

    Ok(ModelSettings::new(model, temperature))
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
