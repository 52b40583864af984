use std::sync::Arc;

use crate::config::Config;
use crate::document::profile::CandidateProfile;
use crate::llm_client::TextGenerator;
use crate::render::pipeline::RenderPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Text generation. Gemini in production, a fake in tests.
    pub llm: Arc<dyn TextGenerator>,
    pub renderer: Arc<RenderPipeline>,
    /// Loaded once at startup; read-only.
    pub profile: Arc<CandidateProfile>,
    pub config: Config,
}
