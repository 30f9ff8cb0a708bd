use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::api::{ApiError, ApiResult, Backend, FileUpload};
use crate::event::{AppEvent, EventSink};
use crate::session::FileRef;

pub mod download;

/// Client-side mirror of the backend file list.
///
/// The list is only ever replaced wholesale from the server, except for the
/// local removal that follows a successful delete.
pub struct FileRoster {
    backend: Arc<dyn Backend>,
    events: EventSink,
    files: RwLock<Vec<FileRef>>,
    uploading: AtomicBool,
}

struct UploadSlot<'a>(&'a AtomicBool);

impl Drop for UploadSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl FileRoster {
    pub fn new(backend: Arc<dyn Backend>, events: EventSink) -> Self {
        Self {
            backend,
            events,
            files: RwLock::new(Vec::new()),
            uploading: AtomicBool::new(false),
        }
    }

    pub async fn files(&self) -> Vec<FileRef> {
        self.files.read().await.clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Replaces the roster with the server list. Any failure empties it.
    pub async fn fetch(&self) -> Vec<FileRef> {
        let files = match self.backend.list_files().await {
            Ok(files) => {
                debug!(count = files.len(), "fetched file roster");
                files
            }
            Err(err) => {
                error!(error = %err, "failed to fetch files");
                Vec::new()
            }
        };
        self.replace(files).await
    }

    /// Uploads one file and refetches the roster.
    ///
    /// Returns `false` without issuing a request while another upload is in
    /// flight; that case reports `UploadRejected` instead of a start/finish
    /// pair.
    pub async fn upload(&self, upload: FileUpload) -> bool {
        if self
            .uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(filename = %upload.filename, "upload rejected, another upload is in flight");
            self.events.send(AppEvent::UploadRejected(upload.filename));
            return false;
        }
        let _slot = UploadSlot(&self.uploading);

        let filename = upload.filename.clone();
        self.events.send(AppEvent::UploadStarted(filename.clone()));
        let ok = match self.backend.upload_file(upload).await {
            Ok(()) => {
                info!(%filename, "file uploaded");
                self.fetch().await;
                true
            }
            Err(err) => {
                error!(%filename, error = %err, "failed to upload file");
                false
            }
        };
        self.events.send(AppEvent::UploadFinished { filename, ok });
        ok
    }

    pub async fn delete(&self, file_id: &str) -> bool {
        match self.backend.delete_file(file_id).await {
            Ok(()) => {
                info!(file_id, "file deleted");
                let mut files = self.fetch().await;
                // The refetch may still list the file; drop it locally as well.
                files.retain(|file| file.file_id != file_id);
                self.replace(files).await;
                true
            }
            Err(err) => {
                error!(file_id, error = %err, "failed to delete file");
                false
            }
        }
    }

    pub async fn delete_all(&self) -> bool {
        match self.backend.delete_all_files().await {
            Ok(()) => {
                info!("all files deleted");
                self.fetch().await;
                self.replace(Vec::new()).await;
                true
            }
            Err(err) => {
                error!(error = %err, "failed to delete all files");
                false
            }
        }
    }

    /// Downloads one file into `dir` and returns where it was written.
    pub async fn download(&self, file: &FileRef, dir: &Path) -> ApiResult<PathBuf> {
        let bytes = self.backend.download_file(&file.file_id).await?;
        let filename = download::safe_filename(&file.filename, &file.file_id);
        let path = download::save(dir, &filename, &bytes).await?;
        info!(file_id = %file.file_id, path = %path.display(), "file downloaded");
        Ok(path)
    }

    async fn replace(&self, files: Vec<FileRef>) -> Vec<FileRef> {
        {
            let mut slot = self.files.write().await;
            *slot = files.clone();
        }
        self.events.send(AppEvent::FilesChanged(files.clone()));
        files
    }
}

pub async fn read_upload(path: &Path) -> ApiResult<FileUpload> {
    let bytes = fs::read(path).await.map_err(|source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok(FileUpload { filename, bytes })
}

/// Spawns roster operations on the runtime and reports their outcome.
#[derive(Clone)]
pub struct FileService {
    roster: Arc<FileRoster>,
    events: EventSink,
    runtime: Handle,
    download_dir: PathBuf,
}

impl FileService {
    pub fn new(roster: Arc<FileRoster>, events: EventSink, runtime: Handle, download_dir: PathBuf) -> Self {
        Self {
            roster,
            events,
            runtime,
            download_dir,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn refresh(&self) {
        let roster = Arc::clone(&self.roster);
        self.runtime.spawn(async move {
            roster.fetch().await;
        });
    }

    pub fn upload_path(&self, path: PathBuf) {
        let roster = Arc::clone(&self.roster);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let upload = match read_upload(&path).await {
                Ok(upload) => upload,
                Err(err) => {
                    error!(error = %err, "failed to read file for upload");
                    events.send(AppEvent::Diagnostic(err.to_string()));
                    return;
                }
            };
            roster.upload(upload).await;
        });
    }

    pub fn upload_bytes(&self, filename: String, bytes: Vec<u8>) {
        let roster = Arc::clone(&self.roster);
        self.runtime.spawn(async move {
            roster.upload(FileUpload { filename, bytes }).await;
        });
    }

    pub fn delete(&self, file_id: String) {
        let roster = Arc::clone(&self.roster);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let ok = roster.delete(&file_id).await;
            events.send(AppEvent::DeleteFinished { file_id, ok });
        });
    }

    pub fn delete_all(&self) {
        let roster = Arc::clone(&self.roster);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let ok = roster.delete_all().await;
            let outcome = if ok { "deleted all files" } else { "failed to delete all files" };
            events.send(AppEvent::Diagnostic(outcome.to_string()));
        });
    }

    pub fn download(&self, file: FileRef) {
        let roster = Arc::clone(&self.roster);
        let events = self.events.clone();
        let dir = self.download_dir.clone();
        self.runtime.spawn(async move {
            let result = roster
                .download(&file, &dir)
                .await
                .map(|path| path.display().to_string())
                .map_err(|err| {
                    error!(file_id = %file.file_id, error = %err, "failed to download file");
                    err.to_string()
                });
            events.send(AppEvent::DownloadFinished {
                filename: file.filename,
                result,
            });
        });
    }
}
