//! In-memory collaborators for unit tests.

use std::collections::{BTreeSet, VecDeque};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use zip::ZipArchive;

use crate::config::Config;
use crate::document::profile::sample_profile;
use crate::llm_client::{LlmError, TextGenerator};
use crate::render::conversion::{
    ConversionError, ConversionService, ExportStream, ResourceMetadata,
};
use crate::render::pipeline::{RenderOptions, RenderPipeline};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// .docx inspection
// ────────────────────────────────────────────────────────────────────────────

/// Paragraph ids and relationship ids come from process-wide counters in the
/// writer, so they differ between otherwise identical packages.
static GENERATED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rId\w*|w14:(?:paraId|textId)="[^"]*""#).unwrap());

/// One part of a `.docx` archive as text; empty when the part is absent.
pub fn docx_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    if let Ok(mut part) = archive.by_name(name) {
        part.read_to_string(&mut xml).unwrap();
    }
    xml
}

/// [`docx_part`] with writer-generated ids blanked out.
pub fn docx_part_without_ids(bytes: &[u8], name: &str) -> String {
    GENERATED_ID.replace_all(&docx_part(bytes, name), "").into_owned()
}

// ────────────────────────────────────────────────────────────────────────────
// Conversion service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Upload,
    Copy,
    Export,
    Delete,
}

#[derive(Debug, Clone)]
pub struct FakeBehavior {
    pub fail_upload: bool,
    pub fail_copy: bool,
    pub fail_export: bool,
    pub fail_delete: bool,
    /// Chunks the export stream yields. Empty means a zero-byte export.
    pub export_chunks: Vec<Bytes>,
    /// Stream errors after yielding this many chunks.
    pub stream_error_after: Option<usize>,
    /// Stream hangs forever after yielding this many chunks.
    pub stall_after: Option<usize>,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            fail_upload: false,
            fail_copy: false,
            fail_export: false,
            fail_delete: false,
            export_chunks: vec![
                Bytes::from_static(b"%PDF-1.4\n"),
                Bytes::from_static(b"fake body\n%%EOF\n"),
            ],
            stream_error_after: None,
            stall_after: None,
        }
    }
}

#[derive(Default)]
struct FakeState {
    next_id: u32,
    live: BTreeSet<String>,
    calls: Vec<Op>,
    deleted: Vec<String>,
    uploads: Vec<(PathBuf, Bytes)>,
}

/// Records every call and tracks which remote ids are still alive.
pub struct FakeConverter {
    behavior: FakeBehavior,
    state: Mutex<FakeState>,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self::with(FakeBehavior::default())
    }

    pub fn with(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn calls(&self) -> Vec<Op> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn live(&self) -> Vec<String> {
        self.state.lock().unwrap().live.iter().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.calls().iter().filter(|op| **op == Op::Delete).count()
    }

    /// Local path and file content of every upload, read at upload time.
    pub fn uploads(&self) -> Vec<(PathBuf, Bytes)> {
        self.state.lock().unwrap().uploads.clone()
    }

    fn record(&self, op: Op) {
        self.state.lock().unwrap().calls.push(op);
    }

    fn allocate(&self, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("{prefix}-{}", state.next_id);
        state.live.insert(id.clone());
        id
    }
}

fn unavailable(message: &str) -> ConversionError {
    ConversionError::Api {
        status: 503,
        message: message.to_string(),
    }
}

#[async_trait]
impl ConversionService for FakeConverter {
    async fn upload(
        &self,
        local_path: &Path,
        _metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError> {
        self.record(Op::Upload);
        let content = Bytes::from(tokio::fs::read(local_path).await?);
        self.state
            .lock()
            .unwrap()
            .uploads
            .push((local_path.to_path_buf(), content));
        if self.behavior.fail_upload {
            return Err(unavailable("upload rejected"));
        }
        Ok(self.allocate("src"))
    }

    async fn copy_as_native(
        &self,
        resource_id: &str,
        _metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError> {
        self.record(Op::Copy);
        if self.behavior.fail_copy {
            return Err(unavailable("copy rejected"));
        }
        assert!(self.live().iter().any(|id| id == resource_id));
        Ok(self.allocate("native"))
    }

    async fn export(
        &self,
        _resource_id: &str,
        _target_mime: &str,
    ) -> Result<Box<dyn ExportStream>, ConversionError> {
        self.record(Op::Export);
        if self.behavior.fail_export {
            return Err(unavailable("export rejected"));
        }
        Ok(Box::new(FakeExport {
            chunks: self.behavior.export_chunks.iter().cloned().collect(),
            served: 0,
            error_after: self.behavior.stream_error_after,
            stall_after: self.behavior.stall_after,
        }))
    }

    async fn delete(&self, resource_id: &str) -> Result<(), ConversionError> {
        self.record(Op::Delete);
        let mut state = self.state.lock().unwrap();
        state.deleted.push(resource_id.to_string());
        if self.behavior.fail_delete {
            return Err(unavailable("delete rejected"));
        }
        state.live.remove(resource_id);
        Ok(())
    }
}

struct FakeExport {
    chunks: VecDeque<Bytes>,
    served: usize,
    error_after: Option<usize>,
    stall_after: Option<usize>,
}

#[async_trait]
impl ExportStream for FakeExport {
    fn total_len(&self) -> Option<u64> {
        Some(self.chunks.iter().map(|c| c.len() as u64).sum())
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConversionError> {
        if self.stall_after == Some(self.served) {
            std::future::pending::<()>().await;
        }
        if self.error_after == Some(self.served) {
            return Err(unavailable("stream reset"));
        }
        self.served += 1;
        Ok(self.chunks.pop_front())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text generation
// ────────────────────────────────────────────────────────────────────────────

/// Returns a canned response and records every prompt it was given.
pub struct FakeGenerator {
    response: Result<Option<String>, u16>,
    prompts: Mutex<Vec<(String, f32, u32)>>,
}

impl FakeGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            response: Ok(Some(text.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            response: Ok(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<(String, f32, u32)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<Option<String>, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature, max_output_tokens));
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(LlmError::Api {
                status: *status,
                message: "fake failure".to_string(),
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// App state
// ────────────────────────────────────────────────────────────────────────────

/// App state wired to fakes, writing into `output_dir`.
pub fn test_state(
    llm: Arc<FakeGenerator>,
    converter: Arc<FakeConverter>,
    output_dir: &Path,
) -> AppState {
    let config = Config {
        gemini_api_key: "test-key".to_string(),
        gemini_model: "test-model".to_string(),
        drive_access_token: "test-token".to_string(),
        drive_api_base: "http://localhost".to_string(),
        profile_path: PathBuf::from("profile.json"),
        output_dir: output_dir.to_path_buf(),
        export_timeout: std::time::Duration::from_secs(5),
        port: 0,
        rust_log: "debug".to_string(),
    };
    let renderer = RenderPipeline::new(
        converter,
        RenderOptions {
            export_timeout: config.export_timeout,
            ..Default::default()
        },
    );
    AppState {
        llm,
        renderer: Arc::new(renderer),
        profile: Arc::new(sample_profile()),
        config,
    }
}
