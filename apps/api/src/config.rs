use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::render::drive::DEFAULT_API_BASE;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// OAuth bearer token for the Drive API. Minting it happens outside this service.
    pub drive_access_token: String,
    pub drive_api_base: String,
    /// JSON file holding the candidate's contact, education, and project links.
    pub profile_path: PathBuf,
    pub output_dir: PathBuf,
    pub export_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: optional_env("GEMINI_MODEL", DEFAULT_MODEL),
            drive_access_token: require_env("DRIVE_ACCESS_TOKEN")?,
            drive_api_base: optional_env("DRIVE_API_BASE", DEFAULT_API_BASE),
            profile_path: PathBuf::from(require_env("PROFILE_PATH")?),
            output_dir: PathBuf::from(optional_env("OUTPUT_DIR", "data/tailored_documents")),
            export_timeout: Duration::from_secs(
                optional_env("EXPORT_TIMEOUT_SECS", "120")
                    .parse::<u64>()
                    .context("EXPORT_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            port: optional_env("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
