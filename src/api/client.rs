use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::routes;
use super::{
    ApiError, ApiResult, Backend, ChatReply, ChatRequest, FileUpload, SystemInfo,
    DELETE_ALL_SUCCESS_MARKER, DELETE_SUCCESS_MARKER, UPLOAD_SUCCESS_MARKER,
};
use crate::config::ClientConfig;
use crate::media::DataUrl;
use crate::session::FileRef;

const CHAT_IMAGE_FILENAME: &str = "image.png";

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ImageUploadBody {
    #[serde(default)]
    url: Option<String>,
}

/// HTTP implementation of [`Backend`] on top of `reqwest`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                stage: "build-client",
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a backend path; legacy short paths are accepted too.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, routes::rewrite_legacy_path(path))
    }

    async fn send(&self, stage: &'static str, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Transport { stage, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            stage,
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        response: Response,
    ) -> ApiResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { stage, source })?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { stage, source })
    }

    async fn expect_marker(
        &self,
        stage: &'static str,
        response: Response,
        marker: &str,
    ) -> ApiResult<()> {
        let body: MessageBody = self.read_json(stage, response).await?;
        match body.message {
            Some(message) if message == marker => Ok(()),
            other => Err(ApiError::UnexpectedPayload {
                stage,
                message: format!("expected message {marker:?}, got {other:?}"),
            }),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url_for(path)).timeout(self.timeout)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn system_info(&self) -> ApiResult<SystemInfo> {
        let stage = "system-info";
        let response = self.send(stage, self.get(routes::SYSTEM_INFO)).await?;
        self.read_json(stage, response).await
    }

    async fn list_files(&self) -> ApiResult<Vec<FileRef>> {
        let stage = "list-files";
        let response = self.send(stage, self.get(routes::FILES)).await?;
        let mut body: Value = self.read_json(stage, response).await?;

        match body.get_mut("files").map(Value::take) {
            Some(files @ Value::Array(_)) => {
                serde_json::from_value(files).map_err(|source| ApiError::Decode { stage, source })
            }
            _ => Err(ApiError::UnexpectedPayload {
                stage,
                message: "response has no `files` array".to_string(),
            }),
        }
    }

    async fn upload_file(&self, upload: FileUpload) -> ApiResult<()> {
        let stage = "upload-file";
        debug!(filename = %upload.filename, bytes = upload.bytes.len(), "uploading file");
        let part = Part::bytes(upload.bytes).file_name(upload.filename);
        let request = self
            .http
            .post(self.url_for(routes::UPLOAD))
            .timeout(self.timeout)
            .multipart(Form::new().part("file", part));

        let response = self.send(stage, request).await?;
        self.expect_marker(stage, response, UPLOAD_SUCCESS_MARKER).await
    }

    async fn delete_file(&self, file_id: &str) -> ApiResult<()> {
        let stage = "delete-file";
        let request = self
            .http
            .delete(self.url_for(&routes::file(file_id)))
            .timeout(self.timeout);
        let response = self.send(stage, request).await?;
        self.expect_marker(stage, response, DELETE_SUCCESS_MARKER).await
    }

    async fn delete_all_files(&self) -> ApiResult<()> {
        let stage = "delete-all-files";
        let request = self
            .http
            .delete(self.url_for(routes::FILES))
            .timeout(self.timeout);
        let response = self.send(stage, request).await?;
        self.expect_marker(stage, response, DELETE_ALL_SUCCESS_MARKER).await
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<Bytes> {
        let stage = "download-file";
        let response = self
            .send(stage, self.get(&routes::file_download(file_id)))
            .await?;
        response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { stage, source })
    }

    async fn upload_image(&self, image: DataUrl) -> ApiResult<String> {
        let stage = "upload-image";
        let part = Part::bytes(image.bytes)
            .file_name(CHAT_IMAGE_FILENAME)
            .mime_str(&image.mime)
            .map_err(|source| ApiError::Transport { stage, source })?;
        let request = self
            .http
            .post(self.url_for(routes::UPLOAD_IMAGE))
            .timeout(self.timeout)
            .multipart(Form::new().part("file", part));

        let response = self.send(stage, request).await?;
        let body: ImageUploadBody = self.read_json(stage, response).await?;
        body.url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ApiError::UnexpectedPayload {
                stage,
                message: "response has no `url`".to_string(),
            })
    }

    async fn chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        let stage = "chat";
        // No total timeout: the event stream stays open for the whole run.
        let builder = self.http.post(self.url_for(routes::CHAT)).json(request);
        let response = self.send(stage, builder).await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start().starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let payload = self.read_json(stage, response).await?;
            return Ok(ChatReply::Complete(payload));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|source| ApiError::Transport {
                    stage: "chat-stream",
                    source,
                })
            })
            .boxed();
        Ok(ChatReply::Stream(body))
    }
}
