//! Rendering Pipeline — document tree in, fixed-layout artifact out.
//!
//! ```text
//! Idle → LocalPersisted → Uploaded → Converted → Exported → CleanedUp
//!   └──────────────┴─────────────┴──────────┴──────────┴──→ Failed
//! ```
//!
//! Every remote id obtained during an attempt is released before `render`
//! returns, whatever the outcome; the local intermediate file is removed
//! after that. A successful return always names a complete, non-empty file.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::document::docx::{write_docx, DocxError};
use crate::document::model::DocumentTree;
use crate::render::conversion::{
    ConversionError, ConversionService, ResourceMetadata, DOCX_MIME, NATIVE_DOCUMENT_MIME,
    PDF_MIME,
};
use crate::render::guard::{PartialArtifact, RemoteResourceGuard};

pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_TEMP_PREFIX: &str = "temp_resume_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderStage {
    Idle,
    LocalPersisted,
    Uploaded,
    Converted,
    Exported,
    CleanedUp,
    Failed,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Idle => "idle",
            RenderStage::LocalPersisted => "local_persisted",
            RenderStage::Uploaded => "uploaded",
            RenderStage::Converted => "converted",
            RenderStage::Exported => "exported",
            RenderStage::CleanedUp => "cleaned_up",
            RenderStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to persist intermediate document: {0}")]
    LocalPersist(#[source] DocxError),

    /// `stage` is the stage the pipeline was trying to reach.
    #[error("conversion service failed before reaching '{stage}': {source}")]
    RemoteUnavailable {
        stage: RenderStage,
        #[source]
        source: ConversionError,
    },

    #[error("export produced no content for {path}")]
    ExportIncomplete { path: PathBuf },

    #[error("export did not complete within {0:?}")]
    ExportTimedOut(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    fn remote(stage: RenderStage) -> impl FnOnce(ConversionError) -> RenderError {
        move |source| RenderError::RemoteUnavailable { stage, source }
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Deadline for the whole export download.
    pub export_timeout: Duration,
    pub temp_prefix: String,
    /// Directory for the intermediate file. System temp dir when `None`.
    pub temp_dir: Option<PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            temp_dir: None,
        }
    }
}

/// Holds no per-render state; concurrent `render` calls are independent.
pub struct RenderPipeline {
    converter: Arc<dyn ConversionService>,
    options: RenderOptions,
}

impl RenderPipeline {
    pub fn new(converter: Arc<dyn ConversionService>, options: RenderOptions) -> Self {
        Self { converter, options }
    }

    /// Renders `tree` to `<output_dir>/<base_filename>.pdf`.
    pub async fn render(
        &self,
        tree: DocumentTree,
        output_dir: &Path,
        base_filename: &str,
    ) -> Result<PathBuf, RenderError> {
        let span = info_span!("render", render_id = %Uuid::new_v4(), file = base_filename);
        self.render_attempt(tree, output_dir, base_filename)
            .instrument(span)
            .await
    }

    async fn render_attempt(
        &self,
        tree: DocumentTree,
        output_dir: &Path,
        base_filename: &str,
    ) -> Result<PathBuf, RenderError> {
        debug!(stage = %RenderStage::Idle, "Starting render into {}", output_dir.display());
        let temp = match self.persist(tree).await {
            Ok(temp) => temp,
            Err(e) => {
                warn!(stage = %RenderStage::Failed, "Render failed: {}", e);
                return Err(e);
            }
        };
        info!(
            stage = %RenderStage::LocalPersisted,
            "Intermediate document saved to {}",
            temp.path().display()
        );

        let mut guard = RemoteResourceGuard::new(Arc::clone(&self.converter));
        let result = self
            .convert_and_export(&mut guard, temp.path(), output_dir, base_filename)
            .await;

        guard.release_all().await;
        let temp_path = temp.path().to_path_buf();
        match temp.close() {
            Ok(()) => debug!("Removed intermediate document {}", temp_path.display()),
            Err(e) => warn!(
                "Could not remove intermediate document {}: {}",
                temp_path.display(),
                e
            ),
        }

        match &result {
            Ok(path) => info!(stage = %RenderStage::CleanedUp, "Rendered {}", path.display()),
            Err(e) => warn!(stage = %RenderStage::Failed, "Render failed: {}", e),
        }
        result
    }

    async fn persist(&self, tree: DocumentTree) -> Result<NamedTempFile, RenderError> {
        let prefix = self.options.temp_prefix.clone();
        let temp_dir = self.options.temp_dir.clone();
        tokio::task::spawn_blocking(move || -> Result<NamedTempFile, DocxError> {
            let mut builder = tempfile::Builder::new();
            builder.prefix(&prefix).suffix(".docx");
            let mut file = match &temp_dir {
                Some(dir) => builder.tempfile_in(dir)?,
                None => builder.tempfile()?,
            };
            write_docx(&tree, &mut file)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| RenderError::LocalPersist(DocxError::Io(std::io::Error::other(e))))?
        .map_err(RenderError::LocalPersist)
    }

    async fn convert_and_export(
        &self,
        guard: &mut RemoteResourceGuard,
        local_path: &Path,
        output_dir: &Path,
        base_filename: &str,
    ) -> Result<PathBuf, RenderError> {
        let source_meta =
            ResourceMetadata::new(format!("{base_filename}_original.docx"), DOCX_MIME);
        let source_id = self
            .converter
            .upload(local_path, &source_meta)
            .await
            .map_err(RenderError::remote(RenderStage::Uploaded))?;
        guard.register_source(source_id.clone());
        info!(stage = %RenderStage::Uploaded, "Uploaded as {}", source_id);

        let native_meta = ResourceMetadata::new(
            format!("{base_filename}_native_document"),
            NATIVE_DOCUMENT_MIME,
        );
        let native_id = self
            .converter
            .copy_as_native(&source_id, &native_meta)
            .await
            .map_err(RenderError::remote(RenderStage::Converted))?;
        guard.register_native(native_id.clone());
        info!(stage = %RenderStage::Converted, "Native copy is {}", native_id);

        tokio::fs::create_dir_all(output_dir).await?;
        let final_path = output_dir.join(format!("{base_filename}.pdf"));

        let timeout = self.options.export_timeout;
        match tokio::time::timeout(timeout, self.export_to(&native_id, final_path)).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::ExportTimedOut(timeout)),
        }
    }

    /// Streams the export into a partial file. Dropping this future (on
    /// deadline) drops the partial file with it.
    async fn export_to(&self, native_id: &str, final_path: PathBuf) -> Result<PathBuf, RenderError> {
        let mut stream = self
            .converter
            .export(native_id, PDF_MIME)
            .await
            .map_err(RenderError::remote(RenderStage::Exported))?;
        let mut artifact = PartialArtifact::create(final_path).await?;
        let total = stream.total_len();

        while let Some(chunk) = stream
            .next_chunk()
            .await
            .map_err(RenderError::remote(RenderStage::Exported))?
        {
            artifact.write_chunk(&chunk).await?;
            if let Some(total) = total.filter(|t| *t > 0) {
                debug!(
                    "Export progress: {}%",
                    artifact.bytes_written() * 100 / total
                );
            }
        }

        let size = artifact.finish().await?;
        if size == 0 {
            return Err(RenderError::ExportIncomplete {
                path: artifact.final_path().to_path_buf(),
            });
        }
        let path = artifact.commit().await?;
        info!(stage = %RenderStage::Exported, "Exported {} bytes", size);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::builder::{build_cover_letter, build_resume, ResumeSections};
    use crate::document::profile::sample_profile;
    use crate::testing::{docx_part, docx_part_without_ids, FakeBehavior, FakeConverter, Op};

    fn tree() -> DocumentTree {
        let sections = ResumeSections {
            summary: "Builds retrieval systems.".to_string(),
            work_experience: "Engineer | Acme\nJan 2020 - Present\n* Shipped it".to_string(),
            ..Default::default()
        };
        build_resume(&sample_profile(), &sections).tree
    }

    struct Harness {
        fake: Arc<FakeConverter>,
        pipeline: RenderPipeline,
        temp_dir: tempfile::TempDir,
        out_dir: tempfile::TempDir,
    }

    impl Harness {
        fn new(behavior: FakeBehavior) -> Self {
            Self::with_timeout(behavior, Duration::from_secs(5))
        }

        fn with_timeout(behavior: FakeBehavior, export_timeout: Duration) -> Self {
            let fake = Arc::new(FakeConverter::with(behavior));
            let temp_dir = tempfile::tempdir().unwrap();
            let options = RenderOptions {
                export_timeout,
                temp_dir: Some(temp_dir.path().to_path_buf()),
                ..Default::default()
            };
            Self {
                pipeline: RenderPipeline::new(fake.clone(), options),
                fake,
                temp_dir,
                out_dir: tempfile::tempdir().unwrap(),
            }
        }

        async fn render(&self, name: &str) -> Result<PathBuf, RenderError> {
            self.pipeline.render(tree(), self.out_dir.path(), name).await
        }

        fn temp_files(&self) -> usize {
            std::fs::read_dir(self.temp_dir.path()).unwrap().count()
        }

        fn out_files(&self) -> Vec<String> {
            std::fs::read_dir(self.out_dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_success_returns_complete_artifact_and_cleans_up() {
        let h = Harness::new(FakeBehavior::default());
        let path = h.render("AI_Acme_Lovelace_4YOE").await.unwrap();

        assert_eq!(path, h.out_dir.path().join("AI_Acme_Lovelace_4YOE.pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(h.fake.calls(), vec![Op::Upload, Op::Copy, Op::Export, Op::Delete, Op::Delete]);
        assert_eq!(h.fake.delete_calls(), 2);
        assert!(h.fake.live().is_empty());
        assert_eq!(h.temp_files(), 0);
        assert_eq!(h.out_files(), vec!["AI_Acme_Lovelace_4YOE.pdf"]);
    }

    #[tokio::test]
    async fn test_intermediate_is_a_docx_at_upload_time() {
        let h = Harness::new(FakeBehavior::default());
        h.render("cv").await.unwrap();
        let uploads = h.fake.uploads();
        assert_eq!(uploads.len(), 1);
        let (path, content) = &uploads[0];
        assert!(content.starts_with(b"PK"));
        assert!(docx_part(content, "word/document.xml").contains("Shipped it"));
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("temp_resume_") && name.ends_with(".docx"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upload_failure_needs_no_remote_cleanup() {
        let h = Harness::new(FakeBehavior {
            fail_upload: true,
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(
            err,
            RenderError::RemoteUnavailable {
                stage: RenderStage::Uploaded,
                ..
            }
        ));
        assert_eq!(h.fake.delete_calls(), 0);
        assert_eq!(h.temp_files(), 0);
        assert!(h.out_files().is_empty());
    }

    #[tokio::test]
    async fn test_copy_failure_deletes_the_upload() {
        let h = Harness::new(FakeBehavior {
            fail_copy: true,
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(
            err,
            RenderError::RemoteUnavailable {
                stage: RenderStage::Converted,
                ..
            }
        ));
        assert_eq!(h.fake.deleted(), vec!["src-1"]);
        assert!(h.fake.live().is_empty());
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_zero_byte_export_fails_and_deletes_both() {
        let h = Harness::new(FakeBehavior {
            export_chunks: Vec::new(),
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(err, RenderError::ExportIncomplete { .. }));
        assert_eq!(h.fake.delete_calls(), 2);
        assert!(h.fake.live().is_empty());
        assert!(h.out_files().is_empty());
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_export_request_failure_deletes_both() {
        let h = Harness::new(FakeBehavior {
            fail_export: true,
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(
            err,
            RenderError::RemoteUnavailable {
                stage: RenderStage::Exported,
                ..
            }
        ));
        assert_eq!(h.fake.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_stream_error_midway_leaves_no_partial_file() {
        let h = Harness::new(FakeBehavior {
            stream_error_after: Some(1),
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(err, RenderError::RemoteUnavailable { .. }));
        assert!(h.out_files().is_empty());
        assert_eq!(h.fake.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_export_deadline_removes_partial_file() {
        let h = Harness::with_timeout(
            FakeBehavior {
                stall_after: Some(1),
                ..Default::default()
            },
            Duration::from_millis(50),
        );
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(err, RenderError::ExportTimedOut(_)));
        assert!(h.out_files().is_empty());
        assert_eq!(h.fake.delete_calls(), 2);
        assert!(h.fake.live().is_empty());
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_delete_failures_do_not_fail_the_render() {
        let h = Harness::new(FakeBehavior {
            fail_delete: true,
            ..Default::default()
        });
        let path = h.render("cv").await.unwrap();
        assert!(path.exists());
        assert_eq!(h.fake.delete_calls(), 2);
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_mask_render_failure() {
        let h = Harness::new(FakeBehavior {
            fail_copy: true,
            fail_delete: true,
            ..Default::default()
        });
        let err = h.render("cv").await.unwrap_err();
        assert!(matches!(err, RenderError::RemoteUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_two_renders_are_equivalent_and_leave_nothing_behind() {
        let h = Harness::new(FakeBehavior::default());
        let a = h.render("first").await.unwrap();
        let b = h.render("second").await.unwrap();
        assert_ne!(a, b);

        let uploads = h.fake.uploads();
        assert_eq!(uploads.len(), 2);
        let (first, second) = (&uploads[0].1, &uploads[1].1);
        assert!(docx_part(first, "word/document.xml").contains("Shipped it"));
        // Only the creation timestamp in docProps/core.xml may differ.
        for part in [
            "word/document.xml",
            "word/styles.xml",
            "word/numbering.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert_eq!(
                docx_part_without_ids(first, part),
                docx_part_without_ids(second, part),
                "{part} differs between renders"
            );
        }

        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
        assert_eq!(h.fake.delete_calls(), 4);
        assert!(h.fake.live().is_empty());
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_different_trees_upload_different_documents() {
        let h = Harness::new(FakeBehavior::default());
        h.render("resume").await.unwrap();
        let letter = build_cover_letter(&sample_profile().contact, "Hello.");
        h.pipeline
            .render(letter, h.out_dir.path(), "letter")
            .await
            .unwrap();

        let uploads = h.fake.uploads();
        assert_ne!(
            docx_part_without_ids(&uploads[0].1, "word/document.xml"),
            docx_part_without_ids(&uploads[1].1, "word/document.xml")
        );
    }

    #[tokio::test]
    async fn test_concurrent_renders_use_separate_resources() {
        let h = Harness::new(FakeBehavior::default());
        let (a, b) = tokio::join!(h.render("resume"), h.render("letter"));
        assert!(a.unwrap().exists());
        assert!(b.unwrap().exists());
        assert_eq!(h.fake.uploads().len(), 2);
        assert_eq!(h.fake.delete_calls(), 4);
        assert!(h.fake.live().is_empty());
        assert_eq!(h.temp_files(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_render_is_cleaned_up() {
        let h = Harness::new(FakeBehavior {
            stall_after: Some(0),
            ..Default::default()
        });
        let attempt = tokio::time::timeout(Duration::from_millis(50), h.render("cv")).await;
        assert!(attempt.is_err());

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(h.fake.live().is_empty());
        assert_eq!(h.fake.delete_calls(), 2);
        assert_eq!(h.temp_files(), 0);
        assert!(h.out_files().is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RenderStage::LocalPersisted.to_string(), "local_persisted");
        assert_eq!(RenderStage::CleanedUp.to_string(), "cleaned_up");
    }
}
