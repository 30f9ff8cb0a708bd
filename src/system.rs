use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info};

use crate::api::{ApiError, ApiResult, Backend, SystemInfo};
use crate::event::{AppEvent, EventSink};

pub const STATUS_INITIALIZING: &str = "Initializing...";
pub const STATUS_SUCCESS: &str = "Initialization successful";

/// What the top bar shows about the backend assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemStatus {
    pub assistant_id: Option<String>,
    pub vector_store_id: Option<String>,
    pub status: String,
    pub is_initializing: bool,
}

impl SystemStatus {
    pub fn begin(&mut self) {
        self.is_initializing = true;
        self.status = STATUS_INITIALIZING.to_string();
    }

    pub fn succeed(&mut self, info: SystemInfo) {
        self.assistant_id = info.assistant_id;
        self.vector_store_id = info.vector_store_id;
        self.status = STATUS_SUCCESS.to_string();
        self.is_initializing = false;
    }

    pub fn fail(&mut self, reason: &str) {
        self.status = format!("Initialization failed: {reason}");
        self.is_initializing = false;
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|id| !id.trim().is_empty())
}

/// Fetches the assistant and vector-store ids; both must be present.
pub async fn initialize(backend: &dyn Backend) -> ApiResult<SystemInfo> {
    let info = backend.system_info().await?;
    if !present(&info.assistant_id) || !present(&info.vector_store_id) {
        return Err(ApiError::UnexpectedPayload {
            stage: "system-info",
            message: "assistant_id or vector_store_id missing".to_string(),
        });
    }
    Ok(info)
}

pub fn spawn_initialize(runtime: &Handle, backend: Arc<dyn Backend>, events: EventSink) {
    runtime.spawn(async move {
        events.send(AppEvent::SystemInfoLoading);
        match initialize(backend.as_ref()).await {
            Ok(info) => {
                info!(
                    assistant_id = info.assistant_id.as_deref().unwrap_or_default(),
                    vector_store_id = info.vector_store_id.as_deref().unwrap_or_default(),
                    "system initialized"
                );
                events.send(AppEvent::SystemInfoLoaded(info));
            }
            Err(err) => {
                error!(error = %err, "system initialization failed");
                events.send(AppEvent::SystemInfoFailed(err.to_string()));
            }
        }
    });
}
