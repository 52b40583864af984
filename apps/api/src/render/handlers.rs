//! Axum route handlers for the Render API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::builder::{build_cover_letter, build_resume, BuildWarning, ResumeSections};
use crate::document::naming::{cover_letter_base_filename, resume_base_filename};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RenderResumeRequest {
    #[serde(flatten)]
    pub sections: ResumeSections,
    #[serde(default)]
    pub target_company: Option<String>,
    #[serde(default)]
    pub filename_keyword: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RenderResumeResponse {
    pub artifact_path: String,
    pub warnings: Vec<BuildWarning>,
}

#[derive(Debug, Deserialize)]
pub struct RenderCoverLetterRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub filename_keyword: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderCoverLetterResponse {
    pub artifact_path: String,
}

#[derive(Debug, Deserialize)]
pub struct RenderApplicationRequest {
    pub resume: RenderResumeRequest,
    pub cover_letter: RenderCoverLetterRequest,
}

#[derive(Debug, Serialize)]
pub struct RenderApplicationResponse {
    pub resume: RenderResumeResponse,
    pub cover_letter: RenderCoverLetterResponse,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/render/resume
pub async fn handle_render_resume(
    State(state): State<AppState>,
    Json(req): Json<RenderResumeRequest>,
) -> Result<Json<RenderResumeResponse>, AppError> {
    Ok(Json(render_resume(&state, req).await?))
}

/// POST /api/v1/render/cover-letter
pub async fn handle_render_cover_letter(
    State(state): State<AppState>,
    Json(req): Json<RenderCoverLetterRequest>,
) -> Result<Json<RenderCoverLetterResponse>, AppError> {
    Ok(Json(render_cover_letter(&state, req).await?))
}

/// POST /api/v1/render/application
/// Resume and cover letter render concurrently, each with its own resources.
pub async fn handle_render_application(
    State(state): State<AppState>,
    Json(req): Json<RenderApplicationRequest>,
) -> Result<Json<RenderApplicationResponse>, AppError> {
    let (resume, cover_letter) = tokio::join!(
        render_resume(&state, req.resume),
        render_cover_letter(&state, req.cover_letter)
    );
    Ok(Json(RenderApplicationResponse {
        resume: resume?,
        cover_letter: cover_letter?,
    }))
}

async fn render_resume(
    state: &AppState,
    req: RenderResumeRequest,
) -> Result<RenderResumeResponse, AppError> {
    let s = &req.sections;
    if [&s.summary, &s.work_experience, &s.technical_skills, &s.projects]
        .iter()
        .all(|text| text.trim().is_empty())
    {
        return Err(AppError::Validation(
            "at least one resume section must be non-empty".to_string(),
        ));
    }

    let built = build_resume(&state.profile, &req.sections);
    let base_filename = resume_base_filename(
        req.filename_keyword.as_deref(),
        req.target_company.as_deref(),
        &state.profile.contact,
        req.years_of_experience,
    );
    info!("Rendering resume as {}", base_filename);

    let path = state
        .renderer
        .render(built.tree, &state.config.output_dir, &base_filename)
        .await?;
    Ok(RenderResumeResponse {
        artifact_path: path.display().to_string(),
        warnings: built.warnings,
    })
}

async fn render_cover_letter(
    state: &AppState,
    req: RenderCoverLetterRequest,
) -> Result<RenderCoverLetterResponse, AppError> {
    let tree = build_cover_letter(&state.profile.contact, &req.body);
    let base_filename = cover_letter_base_filename(
        req.filename_keyword.as_deref(),
        req.company_name.as_deref(),
        &state.profile.contact,
    );
    info!("Rendering cover letter as {}", base_filename);

    let path = state
        .renderer
        .render(tree, &state.config.output_dir, &base_filename)
        .await?;
    Ok(RenderCoverLetterResponse {
        artifact_path: path.display().to_string(),
    })
}
