use std::sync::mpsc;
use std::sync::Arc;

use crate::api::SystemInfo;
use crate::dispatch::ChatEvent;
use crate::session::FileRef;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Chat(ChatEvent),
    SendFailed(String),
    SendFinished,
    SystemInfoLoading,
    SystemInfoLoaded(SystemInfo),
    SystemInfoFailed(String),
    FilesChanged(Vec<FileRef>),
    UploadStarted(String),
    UploadRejected(String),
    UploadFinished { filename: String, ok: bool },
    DeleteFinished { file_id: String, ok: bool },
    DownloadFinished { filename: String, result: Result<String, String> },
    ImageAttached(String),
    Diagnostic(String),
}

/// Sending half of the worker → UI channel.
///
/// Every send also calls the waker so an idle egui loop repaints and drains
/// the event.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AppEvent>,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AppEvent>) -> Self {
        Self { tx, waker: None }
    }

    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn send(&self, event: AppEvent) {
        let _ = self.tx.send(event);
        if let Some(waker) = &self.waker {
            waker();
        }
    }
}

pub fn channel() -> (EventSink, mpsc::Receiver<AppEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSink::new(tx), rx)
}
