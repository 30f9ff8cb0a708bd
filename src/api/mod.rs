use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::dispatch::CompletePayload;
use crate::media::DataUrl;
use crate::session::{FileRef, ImageDetailLevel};

pub mod client;
pub mod routes;

pub use client::ApiClient;

pub const UPLOAD_SUCCESS_MARKER: &str = "File uploaded successfully";
pub const DELETE_SUCCESS_MARKER: &str = "File deleted successfully";
pub const DELETE_ALL_SUCCESS_MARKER: &str = "All files deleted successfully";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed on `{stage}`: {source}")]
    Transport {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("`{stage}` returned status {status}: {body}")]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[error("`{stage}` returned JSON of an unexpected shape: {source}")]
    Decode {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{stage}` returned an unexpected payload: {message}")]
    UnexpectedPayload {
        stage: &'static str,
        message: String,
    },
    #[error("invalid image data url: {reason}")]
    InvalidDataUrl { reason: String },
    #[error("file operation failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct SystemInfo {
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub vector_store_id: Option<String>,
}

/// A local file on its way to `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub text: String,
    pub content: Vec<ContentPart>,
}

impl ChatRequest {
    /// Text part first when there is any text, then one image part per URL.
    pub fn new(text: &str, image_urls: Vec<String>, detail: ImageDetailLevel) -> Self {
        let mut content = Vec::with_capacity(image_urls.len() + 1);
        if !text.is_empty() {
            content.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        content.extend(image_urls.into_iter().map(|url| ContentPart::ImageUrl {
            image_url: ImageUrl { url, detail },
        }));

        Self {
            text: text.to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    pub url: String,
    pub detail: ImageDetailLevel,
}

pub type ByteStream = BoxStream<'static, ApiResult<Bytes>>;

/// What `/api/chat` answered with.
pub enum ChatReply {
    /// Newline-delimited `{type, data}` event records.
    Stream(ByteStream),
    /// A single JSON object, equivalent to one `complete` event.
    Complete(CompletePayload),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("ChatReply::Stream(..)"),
            Self::Complete(payload) => f.debug_tuple("ChatReply::Complete").field(payload).finish(),
        }
    }
}

/// The assistant backend as seen by the client.
///
/// `ApiClient` is the HTTP implementation; services take `Arc<dyn Backend>`
/// so they can run against an in-memory backend in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn system_info(&self) -> ApiResult<SystemInfo>;
    async fn list_files(&self) -> ApiResult<Vec<FileRef>>;
    async fn upload_file(&self, upload: FileUpload) -> ApiResult<()>;
    async fn delete_file(&self, file_id: &str) -> ApiResult<()>;
    async fn delete_all_files(&self) -> ApiResult<()>;
    async fn download_file(&self, file_id: &str) -> ApiResult<Bytes>;
    /// Uploads one chat image and returns the URL the backend assigned it.
    async fn upload_image(&self, image: DataUrl) -> ApiResult<String>;
    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply>;
}
