mod config;
mod critique;
mod document;
mod errors;
mod llm_client;
mod render;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::document::profile::CandidateProfile;
use crate::llm_client::GeminiClient;
use crate::render::drive::DriveClient;
use crate::render::pipeline::{RenderOptions, RenderPipeline};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Candidate profile: contact block, education, project links
    let profile = CandidateProfile::load(&config.profile_path)
        .context("Candidate profile could not be loaded")?;
    info!(
        "Candidate profile loaded for {} ({} education records, {} project links)",
        profile.contact.name,
        profile.education.len(),
        profile.project_links.len()
    );

    // Initialize text-generation client
    let llm = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_model.clone())
        .context("Failed to build Gemini client")?;
    info!("LLM client initialized (model: {})", llm.model());

    // Initialize conversion service + render pipeline
    let drive = DriveClient::new(
        config.drive_api_base.clone(),
        config.drive_access_token.clone(),
    )
    .context("Failed to build Drive client")?;
    let renderer = RenderPipeline::new(
        Arc::new(drive),
        RenderOptions {
            export_timeout: config.export_timeout,
            ..Default::default()
        },
    );
    info!(
        "Render pipeline initialized (output: {}, export timeout: {:?})",
        config.output_dir.display(),
        config.export_timeout
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        renderer: Arc::new(renderer),
        profile: Arc::new(profile),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
