//! Drive v3 REST implementation of `ConversionService`.
//!
//! Authentication is a pre-minted OAuth bearer token; refreshing it is the
//! deployment's job.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::render::conversion::{
    ConversionError, ConversionService, ExportStream, ResourceMetadata,
};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Deserialize)]
struct FileResource {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveErrorEnvelope {
    error: DriveErrorBody,
}

#[derive(Debug, Deserialize)]
struct DriveErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct DriveClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl DriveClient {
    pub fn new(api_base: String, access_token: String) -> Result<Self, ConversionError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    async fn file_resource(response: Response) -> Result<String, ConversionError> {
        let response = ensure_success(response).await?;
        let file: FileResource = response.json().await?;
        debug!("Drive file resource: {:?} ({:?})", file.id, file.name);
        file.id
            .filter(|id| !id.is_empty())
            .ok_or(ConversionError::MissingResourceId)
    }
}

#[async_trait]
impl ConversionService for DriveClient {
    async fn upload(
        &self,
        local_path: &Path,
        metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError> {
        let content = tokio::fs::read(local_path).await?;
        let boundary = format!("tailor-{}", Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, metadata, &content)?;

        info!(
            "Uploading '{}' ({} bytes) to Drive",
            metadata.name,
            content.len()
        );
        let response = self
            .client
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;
        Self::file_resource(response).await
    }

    async fn copy_as_native(
        &self,
        resource_id: &str,
        metadata: &ResourceMetadata,
    ) -> Result<String, ConversionError> {
        info!("Copying Drive file {} as '{}'", resource_id, metadata.mime_type);
        let response = self
            .client
            .post(format!("{}/{}/copy", self.files_url(), resource_id))
            .query(&[("fields", "id,name")])
            .bearer_auth(&self.access_token)
            .json(metadata)
            .send()
            .await?;
        Self::file_resource(response).await
    }

    async fn export(
        &self,
        resource_id: &str,
        target_mime: &str,
    ) -> Result<Box<dyn ExportStream>, ConversionError> {
        info!("Exporting Drive file {} as {}", resource_id, target_mime);
        let response = self
            .client
            .get(format!("{}/{}/export", self.files_url(), resource_id))
            .query(&[("mimeType", target_mime)])
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(Box::new(DriveExport { response }))
    }

    async fn delete(&self, resource_id: &str) -> Result<(), ConversionError> {
        let response = self
            .client
            .delete(format!("{}/{}", self.files_url(), resource_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Streaming export body backed by the HTTP response.
struct DriveExport {
    response: Response,
}

#[async_trait]
impl ExportStream for DriveExport {
    fn total_len(&self) -> Option<u64> {
        self.response.content_length()
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ConversionError> {
        Ok(self.response.chunk().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ConversionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<DriveErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(ConversionError::Api {
        status: status.as_u16(),
        message,
    })
}

/// `multipart/related` upload body: JSON metadata part, then the file bytes.
fn multipart_related_body(
    boundary: &str,
    metadata: &ResourceMetadata,
    content: &[u8],
) -> Result<Vec<u8>, ConversionError> {
    let metadata_json = serde_json::to_string(metadata).map_err(std::io::Error::from)?;
    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata_json}\r\n--{boundary}\r\nContent-Type: {}\r\n\r\n",
            metadata.mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}
