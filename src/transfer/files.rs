//! File capability.
//!
//! The codec never touches the file system directly. Picking, reading and
//! saving go through [`FileCapability`] so the same import/export flow can run
//! against a platform file picker or the local disk. [`LocalFiles`] is the
//! disk-backed implementation used by the CLI.
//!
//! Saves are atomic: write to a temp file, sync to disk, then rename.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// How `read_file` should hand back the file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEncoding {
    /// Content as text, invalid UTF-8 replaced
    Utf8,
    /// Raw bytes, base64-encoded
    Base64,
}

/// A file the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadRequest<'a> {
    pub path: &'a Path,
    pub encoding: ReadEncoding,
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub content: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
}

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Platform file access.
///
/// Each call is a single in-flight operation; callers never overlap them.
pub trait FileCapability {
    /// Ask for a file. `None` means the user cancelled.
    fn pick_file(&self) -> impl Future<Output = io::Result<Option<PickedFile>>> + Send;

    /// Read a picked file. `None` means the platform returned no content.
    fn read_file(
        &self,
        request: ReadRequest<'_>,
    ) -> impl Future<Output = io::Result<Option<String>>> + Send;

    /// Save bytes under `file_name`.
    fn save_file(&self, request: SaveRequest) -> impl Future<Output = io::Result<SaveResult>> + Send;
}

/// Local disk implementation.
///
/// The "pick" is decided up front (the CLI passes the path as an argument);
/// saves go to `out_dir`.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    selection: Option<PathBuf>,
    out_dir: PathBuf,
}

impl LocalFiles {
    #[must_use]
    pub fn new(selection: Option<PathBuf>, out_dir: PathBuf) -> Self {
        Self { selection, out_dir }
    }

    /// A capability that only saves.
    #[must_use]
    pub fn saving_to(out_dir: PathBuf) -> Self {
        Self::new(None, out_dir)
    }
}

impl FileCapability for LocalFiles {
    async fn pick_file(&self) -> io::Result<Option<PickedFile>> {
        Ok(self.selection.clone().map(|path| PickedFile { path }))
    }

    async fn read_file(&self, request: ReadRequest<'_>) -> io::Result<Option<String>> {
        let bytes = tokio::fs::read(request.path).await?;
        debug!(path = %request.path.display(), bytes = bytes.len(), "Read file");
        let content = match request.encoding {
            ReadEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
            ReadEncoding::Base64 => STANDARD.encode(&bytes),
        };
        Ok(Some(content))
    }

    async fn save_file(&self, request: SaveRequest) -> io::Result<SaveResult> {
        let path = self.out_dir.join(&request.file_name);
        atomic_write(&path, &request.content).await?;
        debug!(path = %path.display(), mime_type = request.mime_type, "Saved file");
        Ok(SaveResult {
            path,
            bytes: request.content.len(),
        })
    }
}

/// Write content to a file atomically.
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub async fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.flush().await?;
        // Sync to disk before rename
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await
}
