#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chatdesk::api::{
    ApiError, ApiResult, Backend, ChatReply, ChatRequest, FileUpload, SystemInfo,
};
use chatdesk::dispatch::CompletePayload;
use chatdesk::event::{self, AppEvent, EventSink};
use chatdesk::media::DataUrl;
use chatdesk::session::FileRef;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

pub enum ScriptedChat {
    Chunks(Vec<ApiResult<Vec<u8>>>),
    Complete(CompletePayload),
    Fail,
}

/// In-memory backend with call counters and scripted answers.
#[derive(Default)]
pub struct FakeBackend {
    pub system_info: Mutex<SystemInfo>,
    pub files: Mutex<Vec<FileRef>>,
    /// Answers for the next `list_files` calls; falls back to `files`.
    pub list_script: Mutex<VecDeque<ApiResult<Vec<FileRef>>>>,
    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub upload_fails: AtomicBool,
    pub upload_entered: Notify,
    pub upload_gate: Option<Notify>,
    pub delete_calls: AtomicUsize,
    pub delete_fails: AtomicBool,
    pub image_uploads: Mutex<Vec<DataUrl>>,
    pub image_fails: AtomicBool,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub chat_script: Mutex<Option<ScriptedChat>>,
    pub downloads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeBackend {
    pub fn with_files(files: Vec<FileRef>) -> Self {
        Self {
            files: Mutex::new(files),
            ..Default::default()
        }
    }

    pub fn gated() -> Self {
        Self {
            upload_gate: Some(Notify::new()),
            ..Default::default()
        }
    }

    pub fn script_chat(&self, script: ScriptedChat) {
        *self.chat_script.lock().expect("chat script lock should not be poisoned") = Some(script);
    }

    pub fn script_list(&self, answer: ApiResult<Vec<FileRef>>) {
        self.list_script
            .lock()
            .expect("list script lock should not be poisoned")
            .push_back(answer);
    }
}

pub fn file(id: &str, name: &str) -> FileRef {
    FileRef {
        file_id: id.to_string(),
        filename: name.to_string(),
        path: String::new(),
    }
}

pub fn payload_error(stage: &'static str) -> ApiError {
    ApiError::UnexpectedPayload {
        stage,
        message: "scripted failure".to_string(),
    }
}

pub fn sink() -> (EventSink, Receiver<AppEvent>) {
    event::channel()
}

pub fn drain(rx: &Receiver<AppEvent>) -> Vec<AppEvent> {
    rx.try_iter().collect()
}

#[async_trait]
impl Backend for FakeBackend {
    async fn system_info(&self) -> ApiResult<SystemInfo> {
        Ok(self
            .system_info
            .lock()
            .expect("system info lock should not be poisoned")
            .clone())
    }

    async fn list_files(&self) -> ApiResult<Vec<FileRef>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .list_script
            .lock()
            .expect("list script lock should not be poisoned")
            .pop_front();
        match scripted {
            Some(answer) => answer,
            None => Ok(self.files.lock().expect("files lock should not be poisoned").clone()),
        }
    }

    async fn upload_file(&self, upload: FileUpload) -> ApiResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_entered.notify_one();
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        if self.upload_fails.load(Ordering::SeqCst) {
            return Err(payload_error("upload-file"));
        }
        let id = format!("file-{}", upload.filename);
        self.files
            .lock()
            .expect("files lock should not be poisoned")
            .push(file(&id, &upload.filename));
        Ok(())
    }

    async fn delete_file(&self, file_id: &str) -> ApiResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.delete_fails.load(Ordering::SeqCst) {
            return Err(payload_error("delete-file"));
        }
        self.files
            .lock()
            .expect("files lock should not be poisoned")
            .retain(|file| file.file_id != file_id);
        Ok(())
    }

    async fn delete_all_files(&self) -> ApiResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.delete_fails.load(Ordering::SeqCst) {
            return Err(payload_error("delete-all-files"));
        }
        self.files.lock().expect("files lock should not be poisoned").clear();
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<Bytes> {
        self.downloads
            .lock()
            .expect("downloads lock should not be poisoned")
            .iter()
            .find(|(id, _)| id == file_id)
            .map(|(_, bytes)| Bytes::from(bytes.clone()))
            .ok_or_else(|| payload_error("download-file"))
    }

    /// The image payload is used as the returned URL suffix. Earlier images
    /// in a batch finish later so ordering does not fall out of completion
    /// order.
    async fn upload_image(&self, image: DataUrl) -> ApiResult<String> {
        if self.image_fails.load(Ordering::SeqCst) {
            return Err(payload_error("upload-image"));
        }
        let name = String::from_utf8_lossy(&image.bytes).to_string();
        let delay = 30u64.saturating_sub(10 * name.len() as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.image_uploads
            .lock()
            .expect("image uploads lock should not be poisoned")
            .push(image);
        Ok(format!("https://images.test/{name}"))
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.chat_requests
            .lock()
            .expect("chat requests lock should not be poisoned")
            .push(request.clone());
        let script = self
            .chat_script
            .lock()
            .expect("chat script lock should not be poisoned")
            .take();
        match script {
            Some(ScriptedChat::Chunks(chunks)) => {
                let body = futures::stream::iter(
                    chunks.into_iter().map(|chunk| chunk.map(Bytes::from)),
                )
                .boxed();
                Ok(ChatReply::Stream(body))
            }
            Some(ScriptedChat::Complete(payload)) => Ok(ChatReply::Complete(payload)),
            Some(ScriptedChat::Fail) | None => Err(payload_error("chat")),
        }
    }
}
