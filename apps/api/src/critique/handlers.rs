//! Axum route handlers for the Critique API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::critique::extractor::{extract_critique, extract_list_items, Critique};
use crate::critique::judge::{judge_resume, JudgeOutcome, JudgeRequest};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ParseCritiqueRequest {
    pub raw_text: String,
}

#[derive(Debug, Serialize)]
pub struct ParseCritiqueResponse {
    pub critique: Critique,
    pub missing_sections: Vec<&'static str>,
}

/// POST /api/v1/critique/parse
/// Extraction only; no generation call.
pub async fn handle_parse_critique(
    Json(req): Json<ParseCritiqueRequest>,
) -> Json<ParseCritiqueResponse> {
    let critique = extract_critique(&req.raw_text);
    let missing_sections = critique.missing_sections();
    Json(ParseCritiqueResponse {
        critique,
        missing_sections,
    })
}

#[derive(Debug, Deserialize)]
pub struct SectionItemsRequest {
    pub raw_text: String,
    pub section: String,
}

#[derive(Debug, Serialize)]
pub struct SectionItemsResponse {
    pub section: String,
    pub items: Vec<String>,
}

/// POST /api/v1/critique/section
/// List items of one named section (`PROS`, `CONS`, ...); empty when absent.
pub async fn handle_section_items(
    Json(req): Json<SectionItemsRequest>,
) -> Result<Json<SectionItemsResponse>, AppError> {
    let section = req.section.trim();
    if section.is_empty() {
        return Err(AppError::Validation("section is required".to_string()));
    }
    let items = extract_list_items(&req.raw_text, section);
    Ok(Json(SectionItemsResponse {
        section: section.to_uppercase(),
        items,
    }))
}

/// POST /api/v1/critique
pub async fn handle_judge(
    State(state): State<AppState>,
    Json(req): Json<JudgeRequest>,
) -> Result<Json<JudgeOutcome>, AppError> {
    if req.job_title.trim().is_empty() {
        return Err(AppError::Validation("job_title is required".to_string()));
    }
    let outcome = judge_resume(state.llm.as_ref(), &state.profile.contact.name, &req).await?;
    Ok(Json(outcome))
}
