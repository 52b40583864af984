//! Scoped ownership of everything one render acquires outside its own memory.
//!
//! `RemoteResourceGuard` holds the remote ids created during an attempt and
//! deletes them on `release_all`, or from `Drop` when the attempt is abandoned
//! mid-flight. `PartialArtifact` is the local counterpart for the export file.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::render::conversion::ConversionService;

/// Remote ids acquired so far in one attempt. Filled in stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteResourceHandle {
    pub uploaded_source_id: Option<String>,
    pub converted_native_id: Option<String>,
}

impl RemoteResourceHandle {
    pub fn is_empty(&self) -> bool {
        self.uploaded_source_id.is_none() && self.converted_native_id.is_none()
    }

    /// Next id to release: the native copy before the source it came from.
    fn next_live(&self) -> Option<String> {
        self.converted_native_id
            .clone()
            .or_else(|| self.uploaded_source_id.clone())
    }

    fn forget(&mut self, id: &str) {
        if self.converted_native_id.as_deref() == Some(id) {
            self.converted_native_id = None;
        } else if self.uploaded_source_id.as_deref() == Some(id) {
            self.uploaded_source_id = None;
        }
    }

    fn take_all(&mut self) -> Vec<String> {
        self.converted_native_id
            .take()
            .into_iter()
            .chain(self.uploaded_source_id.take())
            .collect()
    }
}

pub struct RemoteResourceGuard {
    service: Arc<dyn ConversionService>,
    handle: RemoteResourceHandle,
}

impl RemoteResourceGuard {
    pub fn new(service: Arc<dyn ConversionService>) -> Self {
        Self {
            service,
            handle: RemoteResourceHandle::default(),
        }
    }

    pub fn register_source(&mut self, id: String) {
        self.handle.uploaded_source_id = Some(id);
    }

    pub fn register_native(&mut self, id: String) {
        self.handle.converted_native_id = Some(id);
    }

    pub fn handle(&self) -> &RemoteResourceHandle {
        &self.handle
    }

    /// Deletes every registered id. Delete failures are logged and swallowed.
    ///
    /// An id stays registered until its delete call returns, so a release that
    /// is itself cancelled is finished by `Drop`.
    pub async fn release_all(&mut self) {
        while let Some(id) = self.handle.next_live() {
            delete_logged(self.service.as_ref(), &id).await;
            self.handle.forget(&id);
        }
    }
}

impl Drop for RemoteResourceGuard {
    fn drop(&mut self) {
        let ids = self.handle.take_all();
        if ids.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(
                    "Render abandoned with {} live remote resource(s); releasing in background",
                    ids.len()
                );
                let service = Arc::clone(&self.service);
                runtime.spawn(async move {
                    for id in ids {
                        delete_logged(service.as_ref(), &id).await;
                    }
                });
            }
            Err(_) => warn!("No async runtime to release remote resources {:?}; they leak", ids),
        }
    }
}

async fn delete_logged(service: &dyn ConversionService, id: &str) {
    match service.delete(id).await {
        Ok(()) => info!("Deleted remote resource {}", id),
        Err(e) => warn!("Could not delete remote resource {}: {}", id, e),
    }
}

/// Export destination. Bytes go to `<final>.part`; `commit` renames it into
/// place. Dropping an uncommitted artifact removes the partial file.
pub struct PartialArtifact {
    final_path: PathBuf,
    part_path: PathBuf,
    file: Option<File>,
    bytes_written: u64,
    committed: bool,
}

impl PartialArtifact {
    pub async fn create(final_path: PathBuf) -> io::Result<Self> {
        let mut part: OsString = final_path.clone().into_os_string();
        part.push(".part");
        let part_path = PathBuf::from(part);
        let file = File::create(&part_path).await?;
        Ok(Self {
            final_path,
            part_path,
            file: Some(file),
            bytes_written: 0,
            committed: false,
        })
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(closed)?;
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flushes and closes the file; returns its size on disk.
    pub async fn finish(&mut self) -> io::Result<u64> {
        let mut file = self.file.take().ok_or_else(closed)?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        Ok(tokio::fs::metadata(&self.part_path).await?.len())
    }

    pub async fn commit(mut self) -> io::Result<PathBuf> {
        if self.file.is_some() {
            self.finish().await?;
        }
        tokio::fs::rename(&self.part_path, &self.final_path).await?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for PartialArtifact {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        match std::fs::remove_file(&self.part_path) {
            Ok(()) => info!("Removed partial artifact {}", self.part_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove partial artifact {}: {}",
                self.part_path.display(),
                e
            ),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "artifact file already closed")
}
