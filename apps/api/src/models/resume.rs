use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// Full `resumes` row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ResumeRecord {
    pub id: i64,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    /// Section key -> section text.
    pub sections: Json<BTreeMap<String, String>>,
    pub resume_tex: String,
    pub resume_pdf: Vec<u8>,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub cover_letter: Option<String>,
    pub cover_letter_pdf: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new row; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewResume {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub sections: BTreeMap<String, String>,
    pub resume_tex: String,
    pub resume_pdf: Vec<u8>,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
}

/// List view without artifacts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResumeSummary {
    pub id: i64,
    pub company_name: String,
    pub job_title: String,
    pub provider: String,
    pub model: String,
    pub has_cover_letter: bool,
    pub created_at: DateTime<Utc>,
}

/// Detail view returned by the API. Binary artifacts are reported by size.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeDetail {
    pub id: i64,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub sections: BTreeMap<String, String>,
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub resume_pdf_bytes: usize,
    pub cover_letter: Option<String>,
    pub cover_letter_pdf_bytes: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRecord> for ResumeDetail {
    fn from(record: ResumeRecord) -> Self {
        Self {
            id: record.id,
            company_name: record.company_name,
            job_title: record.job_title,
            job_description: record.job_description,
            sections: record.sections.0,
            provider: record.provider,
            model: record.model,
            temperature: record.temperature,
            resume_pdf_bytes: record.resume_pdf.len(),
            cover_letter: record.cover_letter,
            cover_letter_pdf_bytes: record.cover_letter_pdf.as_ref().map(Vec::len),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
