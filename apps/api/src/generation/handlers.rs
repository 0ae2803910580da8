//! Axum route handlers for the Generation API.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::errors::AppError;
use crate::generation::generator::{CoverLetterRequest, GenerationEvent, ResumeRequest};
use crate::generation::section::Section;
use crate::models::resume::{ResumeDetail, ResumeSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SectionInfo {
    pub key: Section,
    pub title: &'static str,
    pub verbatim_eligible: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sections
pub async fn handle_list_sections() -> Json<Vec<SectionInfo>> {
    Json(
        Section::ALL
            .into_iter()
            .map(|section| SectionInfo {
                key: section,
                title: section.title(),
                verbatim_eligible: section.is_verbatim_eligible(),
            })
            .collect(),
    )
}

/// POST /api/v1/resumes/generate
///
/// Validation failures return 400 before any event is sent. After that the
/// response is an SSE stream: `progress` per section, then `completed` or `error`.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(request): Json<ResumeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let events = state.orchestrator.clone().generate_resume(request)?;
    let stream = events.map(|item| Ok::<_, Infallible>(to_sse_event(item)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(item: Result<GenerationEvent, AppError>) -> Event {
    let event = match &item {
        Ok(GenerationEvent::Progress(progress)) => Event::default().event("progress").json_data(progress),
        Ok(GenerationEvent::Completed(run)) => Event::default().event("completed").json_data(run),
        Err(e) => {
            error!("Resume run failed: {e}");
            Event::default().event("error").json_data(json!({
                "code": e.code(),
                "message": e.public_message(),
            }))
        }
    };
    event.unwrap_or_else(|e| {
        error!("Failed to encode SSE event: {e}");
        Event::default().event("error").data("event encoding failed")
    })
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    Ok(Json(state.store.list_resumes().await?))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
) -> Result<Json<ResumeDetail>, AppError> {
    let record = state
        .store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(Json(record.into()))
}

/// GET /api/v1/resumes/:id/pdf
pub async fn handle_get_resume_pdf(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(pdf_response(record.resume_pdf, &format!("resume_{resume_id}.pdf")))
}

/// POST /api/v1/resumes/:id/cover-letter
///
/// Generates a cover letter for an existing résumé and returns the updated record.
pub async fn handle_generate_cover_letter(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<ResumeDetail>, AppError> {
    state
        .orchestrator
        .generate_cover_letter(resume_id, request)
        .await?;

    let record = state
        .store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(Json(record.into()))
}

/// GET /api/v1/resumes/:id/cover-letter/pdf
pub async fn handle_get_cover_letter_pdf(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let pdf = state
        .store
        .get_resume(resume_id)
        .await?
        .and_then(|record| record.cover_letter_pdf)
        .ok_or_else(|| {
            AppError::NotFound(format!("No cover letter for resume {resume_id}"))
        })?;
    Ok(pdf_response(pdf, &format!("cover_letter_{resume_id}.pdf")))
}

fn pdf_response(pdf: Vec<u8>, file_name: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{file_name}\""),
            ),
        ],
        pdf,
    )
}
