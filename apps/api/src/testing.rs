//! In-memory fakes shared by unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::types::Json;
use tempfile::TempDir;

use crate::errors::AppError;
use crate::generation::backend::{GenerationError, SectionBackend};
use crate::generation::generator::{GenerationOrchestrator, OrchestratorSettings};
use crate::generation::pipeline::FallbackPolicy;
use crate::generation::prompts::PromptLibrary;
use crate::generation::screening::{ClearanceGuard, DEFAULT_CLEARANCE_KEYWORDS};
use crate::llm_client::{LlmClient, LlmError, LlmFactory, ModelSettings, Provider};
use crate::models::resume::{NewResume, ResumeRecord, ResumeSummary};
use crate::portfolio::Portfolio;
use crate::render::{DocumentRenderer, RenderError};
use crate::state::AppState;
use crate::storage::ResumeStore;
use crate::template::latex::{COVER_LETTER_DOCUMENT, RESUME_PREAMBLE};

pub const STUB_PDF: &[u8] = b"%PDF-1.4 stub";

// ────────────────────────────────────────────────────────────────────────────
// Store
// ────────────────────────────────────────────────────────────────────────────

struct MemoryInner {
    next_id: i64,
    resumes: BTreeMap<i64, ResumeRecord>,
    templates: HashMap<i32, String>,
}

pub struct MemoryResumeStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Ids are assigned from `next_id` upward.
    pub fn starting_at(next_id: i64) -> Self {
        let templates = HashMap::from([
            (1, RESUME_PREAMBLE.to_string()),
            (2, COVER_LETTER_DOCUMENT.to_string()),
        ]);
        Self {
            inner: Mutex::new(MemoryInner {
                next_id,
                resumes: BTreeMap::new(),
                templates,
            }),
        }
    }

    pub fn put_record(&self, record: ResumeRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id = inner.next_id.max(record.id + 1);
        inner.resumes.insert(record.id, record);
    }

    pub fn record(&self, id: i64) -> Option<ResumeRecord> {
        self.inner.lock().unwrap().resumes.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().resumes.len()
    }

    pub fn remove_template(&self, id: i32) {
        self.inner.lock().unwrap().templates.remove(&id);
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn insert_resume(&self, resume: NewResume) -> Result<i64, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let now = Utc::now();
        inner.resumes.insert(
            id,
            ResumeRecord {
                id,
                company_name: resume.company_name,
                job_title: resume.job_title,
                job_description: resume.job_description,
                sections: Json(resume.sections),
                resume_tex: resume.resume_tex,
                resume_pdf: resume.resume_pdf,
                provider: resume.provider,
                model: resume.model,
                temperature: resume.temperature,
                cover_letter: None,
                cover_letter_pdf: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeRecord>, AppError> {
        Ok(self.record(id))
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .resumes
            .values()
            .rev()
            .map(|r| ResumeSummary {
                id: r.id,
                company_name: r.company_name.clone(),
                job_title: r.job_title.clone(),
                provider: r.provider.clone(),
                model: r.model.clone(),
                has_cover_letter: r.cover_letter.is_some(),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn update_cover_letter(&self, id: i64, text: &str, pdf: &[u8]) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .resumes
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
        record.cover_letter = Some(text.to_string());
        record.cover_letter_pdf = Some(pdf.to_vec());
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn get_preamble(&self, template_id: i32) -> Result<Option<String>, AppError> {
        Ok(self.inner.lock().unwrap().templates.get(&template_id).cloned())
    }
}

pub fn sample_record(id: i64) -> ResumeRecord {
    let created = Utc::now() - chrono::Duration::days(1);
    ResumeRecord {
        id,
        company_name: "Acme".to_string(),
        job_title: "Engineer".to_string(),
        job_description: "Senior Engineer".to_string(),
        sections: Json(BTreeMap::from([
            ("career_summary".to_string(), "Backend engineer.".to_string()),
            ("skills".to_string(), "Languages: Rust, Go".to_string()),
        ])),
        resume_tex: "\\documentclass{article}".to_string(),
        resume_pdf: STUB_PDF.to_vec(),
        provider: "ollama".to_string(),
        model: "llama3.1".to_string(),
        temperature: 0.1,
        cover_letter: None,
        cover_letter_pdf: None,
        created_at: created,
        updated_at: created,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

pub struct StubRenderer {
    fail: bool,
    calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(&self, _source: &str) -> Result<Bytes, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RenderError::Failed {
                status: "exit status: 1".to_string(),
                log: "! LaTeX Error".to_string(),
            });
        }
        Ok(Bytes::from_static(STUB_PDF))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM
// ────────────────────────────────────────────────────────────────────────────

/// Replies from a script, then `repeat` (or `EmptyContent`) once it runs out.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    repeat: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            repeat: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: &str) -> Self {
        let mut llm = Self::new(Vec::new());
        llm.repeat = Some(reply.to_string());
        llm
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(system, prompt)` per call.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self.repeat.clone().ok_or(LlmError::EmptyContent),
        }
    }

    fn provider(&self) -> Provider {
        Provider::Ollama
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Hands out one shared client for every provider except `none`.
pub struct StaticLlmFactory {
    client: Arc<ScriptedLlm>,
    builds: Mutex<Vec<(Provider, ModelSettings)>>,
}

impl StaticLlmFactory {
    pub fn new(client: Arc<ScriptedLlm>) -> Self {
        Self {
            client,
            builds: Mutex::new(Vec::new()),
        }
    }

    pub fn builds(&self) -> Vec<(Provider, ModelSettings)> {
        self.builds.lock().unwrap().clone()
    }
}

impl LlmFactory for StaticLlmFactory {
    fn build(
        &self,
        provider: Provider,
        settings: ModelSettings,
    ) -> Result<Arc<dyn LlmClient>, LlmError> {
        if provider == Provider::None {
            return Err(LlmError::NoTextGeneration(provider));
        }
        self.builds.lock().unwrap().push((provider, settings));
        let client: Arc<dyn LlmClient> = self.client.clone();
        Ok(client)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Section backends
// ────────────────────────────────────────────────────────────────────────────

pub struct CountingBackend {
    text: String,
    calls: AtomicUsize,
}

impl CountingBackend {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SectionBackend for CountingBackend {
    async fn generate(
        &self,
        _prompt: &str,
        _section_data: &Value,
        _job_description: &str,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub struct FailingBackend {
    error: fn() -> GenerationError,
}

impl FailingBackend {
    pub fn new(error: fn() -> GenerationError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl SectionBackend for FailingBackend {
    async fn generate(
        &self,
        _prompt: &str,
        _section_data: &Value,
        _job_description: &str,
    ) -> Result<String, GenerationError> {
        Err((self.error)())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Portfolio and orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub fn sample_portfolio_value() -> Value {
    json!({
        "personal_information": {
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "+1 555 0100",
            "location": "Berlin",
            "github": "github.com/janedoe"
        },
        "career_summary": "Backend engineer with 8 years building payment systems in Rust & Go.",
        "skills": [
            { "Languages": ["Rust", "Go", "SQL"] },
            { "Infrastructure": ["PostgreSQL", "Kubernetes"] }
        ],
        "work_experience": [
            {
                "company": "Acme",
                "job_title": "Senior Engineer",
                "location": "Berlin",
                "time": "2020 - 2024",
                "responsibilities": [
                    "Cut settlement latency by 40% with a Rust rewrite",
                    "Led a team of 5 engineers"
                ]
            }
        ],
        "education": [
            {
                "university_name": "TU Berlin",
                "degree": "M.Sc. Computer Science",
                "time": "2014 - 2016",
                "transcript": ["Distributed Systems", "Databases"]
            }
        ],
        "projects": [
            {
                "name": "ledger-rs",
                "technologies": "Rust, Tokio",
                "date": "2023",
                "bullet_points": ["Double-entry ledger handling 10k tx/s"]
            }
        ],
        "awards": [
            { "name": "Best Paper", "explanation": "RustConf 2022" }
        ],
        "publications": [
            { "name": "Zero-copy ledgers", "publisher": "ACM", "Year": "2022", "link": "doi.org/10.1/xyz" }
        ]
    })
}

pub fn sample_portfolio() -> Portfolio {
    Portfolio::from_value(sample_portfolio_value()).unwrap()
}

/// A wired orchestrator over in-memory fakes. Output goes to a temp directory.
pub struct TestHarness {
    pub store: Arc<MemoryResumeStore>,
    pub renderer: Arc<StubRenderer>,
    pub llm: Arc<ScriptedLlm>,
    pub factory: Arc<StaticLlmFactory>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub output: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(
            MemoryResumeStore::new(),
            StubRenderer::new(),
            ScriptedLlm::repeating("- Tailored line"),
        )
    }

    pub fn build(store: MemoryResumeStore, renderer: StubRenderer, llm: ScriptedLlm) -> Self {
        let store = Arc::new(store);
        let renderer = Arc::new(renderer);
        let llm = Arc::new(llm);
        let factory = Arc::new(StaticLlmFactory::new(llm.clone()));
        let output = tempfile::tempdir().unwrap();

        let orchestrator = Arc::new(GenerationOrchestrator::new(
            store.clone(),
            renderer.clone(),
            factory.clone(),
            Arc::new(sample_portfolio()),
            Arc::new(PromptLibrary::builtin()),
            OrchestratorSettings {
                output_root: output.path().to_path_buf(),
                resume_template_id: 1,
                cover_letter_template_id: 2,
                fallback: FallbackPolicy::Unsupported,
                llm_timeout: Duration::from_secs(5),
                clearance_guard: ClearanceGuard::new(DEFAULT_CLEARANCE_KEYWORDS.iter().copied()),
            },
        ));

        Self {
            store,
            renderer,
            llm,
            factory,
            orchestrator,
            output,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            orchestrator: self.orchestrator.clone(),
        }
    }

    pub fn output_dirs(&self) -> Vec<String> {
        list_dir(self.output.path())
    }
}

pub fn list_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
