use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiResult, Backend, ByteStream, ChatReply, ChatRequest};
use crate::dispatch::ChatEvent;
use crate::event::{AppEvent, EventSink};
use crate::media::{self, DataUrl};
use crate::session::SendRequest;
use crate::stream::decode_records;

/// Runs send cycles on the tokio runtime and reports back through the sink.
#[derive(Clone)]
pub struct ChatService {
    backend: Arc<dyn Backend>,
    events: EventSink,
    runtime: Handle,
}

impl ChatService {
    pub fn new(backend: Arc<dyn Backend>, events: EventSink, runtime: Handle) -> Self {
        Self {
            backend,
            events,
            runtime,
        }
    }

    pub fn send(&self, request: SendRequest) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            run_send_cycle(backend.as_ref(), request, &events).await;
        });
    }

    /// Reads an image file off the UI thread and hands back its data URL.
    pub fn attach_image(&self, path: PathBuf) {
        let events = self.events.clone();
        self.runtime.spawn_blocking(move || match media::load_image(&path) {
            Ok(data_url) => {
                debug!(path = %path.display(), "image attached");
                events.send(AppEvent::ImageAttached(data_url));
            }
            Err(err) => {
                warn!(error = %err, "failed to attach image");
                events.send(AppEvent::Diagnostic(err.to_string()));
            }
        });
    }
}

/// One send cycle after the UI has accepted it.
///
/// Emits `Chat` for every decoded event, `SendFailed` when the cycle aborts,
/// and always ends with exactly one `SendFinished`.
pub async fn run_send_cycle(backend: &dyn Backend, request: SendRequest, events: &EventSink) {
    let image_count = request.images.len();
    match execute(backend, request, events).await {
        Ok(()) => info!(images = image_count, "send cycle finished"),
        Err(err) => {
            error!(error = %err, "send cycle failed");
            events.send(AppEvent::SendFailed(err.to_string()));
        }
    }
    events.send(AppEvent::SendFinished);
}

async fn execute(backend: &dyn Backend, request: SendRequest, events: &EventSink) -> ApiResult<()> {
    let image_urls = upload_images(backend, &request.images).await?;
    let chat_request = ChatRequest::new(&request.text, image_urls, request.detail);

    match backend.chat(&chat_request).await? {
        ChatReply::Complete(payload) => {
            events.send(AppEvent::Chat(ChatEvent::Complete(payload)));
            Ok(())
        }
        ChatReply::Stream(body) => consume_stream(body, events).await,
    }
}

/// Uploads every attachment concurrently and returns the backend URLs in
/// attachment order. The first failure aborts the batch; uploads that already
/// went through stay on the backend.
pub async fn upload_images(backend: &dyn Backend, images: &[String]) -> ApiResult<Vec<String>> {
    let uploads = images.iter().map(|data_url| async move {
        let image = DataUrl::parse(data_url)?;
        backend.upload_image(image).await
    });
    futures::future::try_join_all(uploads).await
}

async fn consume_stream(body: ByteStream, events: &EventSink) -> ApiResult<()> {
    let records = decode_records(body);
    futures::pin_mut!(records);

    let mut completed = false;
    while let Some(record) = records.next().await {
        match ChatEvent::from_record(record?) {
            Ok(Some(event)) => {
                debug!(tag = event.tag(), "stream event");
                completed |= matches!(event, ChatEvent::Complete(_));
                events.send(AppEvent::Chat(event));
            }
            Ok(None) => debug!("ignoring stream event with unknown type"),
            Err(err) => warn!(error = %err, "skipping malformed stream event"),
        }
    }

    if !completed {
        warn!("chat stream ended without a complete event");
    }
    Ok(())
}
