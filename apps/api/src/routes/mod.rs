pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::critique::handlers as critique;
use crate::render::handlers as render;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Critique API
        .route(
            "/api/v1/critique/parse",
            post(critique::handle_parse_critique),
        )
        .route(
            "/api/v1/critique/section",
            post(critique::handle_section_items),
        )
        .route("/api/v1/critique", post(critique::handle_judge))
        // Render API
        .route("/api/v1/render/resume", post(render::handle_render_resume))
        .route(
            "/api/v1/render/cover-letter",
            post(render::handle_render_cover_letter),
        )
        .route(
            "/api/v1/render/application",
            post(render::handle_render_application),
        )
        .with_state(state)
}
