pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/sections", get(handlers::handle_list_sections))
        // Resume API
        .route("/api/v1/resumes", get(handlers::handle_list_resumes))
        .route(
            "/api/v1/resumes/generate",
            post(handlers::handle_generate_resume),
        )
        .route("/api/v1/resumes/:id", get(handlers::handle_get_resume))
        .route(
            "/api/v1/resumes/:id/pdf",
            get(handlers::handle_get_resume_pdf),
        )
        // Cover letters
        .route(
            "/api/v1/resumes/:id/cover-letter",
            post(handlers::handle_generate_cover_letter),
        )
        .route(
            "/api/v1/resumes/:id/cover-letter/pdf",
            get(handlers::handle_get_cover_letter_pdf),
        )
        .with_state(state)
}
