use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::resume::{NewResume, ResumeRecord, ResumeSummary};
use crate::storage::ResumeStore;

#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn insert_resume(&self, resume: NewResume) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO resumes
                (company_name, job_title, job_description, sections,
                 resume_tex, resume_pdf, provider, model, temperature)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&resume.company_name)
        .bind(&resume.job_title)
        .bind(&resume.job_description)
        .bind(Json(&resume.sections))
        .bind(&resume.resume_tex)
        .bind(&resume.resume_pdf)
        .bind(&resume.provider)
        .bind(&resume.model)
        .bind(resume.temperature)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted resume {id} for {} / {}", resume.company_name, resume.job_title);
        Ok(id)
    }

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeRecord>, AppError> {
        let record = sqlx::query_as::<_, ResumeRecord>("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError> {
        let rows = sqlx::query_as::<_, ResumeSummary>(
            r#"
            SELECT id, company_name, job_title, provider, model,
                   cover_letter IS NOT NULL AS has_cover_letter, created_at
            FROM resumes
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_cover_letter(&self, id: i64, text: &str, pdf: &[u8]) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET cover_letter = $2, cover_letter_pdf = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(pdf)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Resume {id} not found")));
        }
        info!("Stored cover letter for resume {id}");
        Ok(())
    }

    async fn get_preamble(&self, template_id: i32) -> Result<Option<String>, AppError> {
        let preamble: Option<String> =
            sqlx::query_scalar("SELECT preamble FROM document_templates WHERE id = $1")
                .bind(template_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(preamble)
    }
}
