//! Persistence of generated résumés and document templates.

pub mod output;
pub mod postgres;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::resume::{NewResume, ResumeRecord, ResumeSummary};

pub use output::OutputDir;
pub use postgres::PgResumeStore;

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Inserts one record in a single write and returns its id (> 0).
    async fn insert_resume(&self, resume: NewResume) -> Result<i64, AppError>;

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeRecord>, AppError>;

    /// Newest first.
    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError>;

    /// Sets the cover-letter fields of `id` and nothing else.
    /// `AppError::NotFound` when the record does not exist.
    async fn update_cover_letter(&self, id: i64, text: &str, pdf: &[u8]) -> Result<(), AppError>;

    async fn get_preamble(&self, template_id: i32) -> Result<Option<String>, AppError>;
}
