//! The external conversion service, as the pipeline sees it: four remote
//! operations and a chunked byte stream for exports.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// The service's own editable document format.
pub const NATIVE_DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
pub const PDF_MIME: &str = "application/pdf";

/// Name and type attached to a remote resource when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMetadata {
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl ResourceMetadata {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("conversion service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("conversion service response carried no resource id")]
    MissingResourceId,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull-based export body. `Ok(None)` marks the end of the stream.
#[async_trait]
pub trait ExportStream: Send {
    /// Total size in bytes, when the service announces it.
    fn total_len(&self) -> Option<u64>;

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConversionError>;
}

/// Upload → native copy → export → delete.
///
/// Implementations do their own transport-level retries, if any. Every id
/// returned by `upload` or `copy_as_native` must eventually be passed to
/// `delete` by the caller.
#[async_trait]
pub trait ConversionService: Send + Sync {
    async fn upload(
        &self,
        local_path: &Path,
        metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError>;

    async fn copy_as_native(
        &self,
        resource_id: &str,
        metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError>;

    async fn export(
        &self,
        resource_id: &str,
        target_mime: &str,
    ) -> Result<Box<dyn ExportStream>, ConversionError>;

    async fn delete(&self, resource_id: &str) -> Result<(), ConversionError>;
}
