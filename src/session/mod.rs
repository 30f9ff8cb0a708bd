use serde::{Deserialize, Serialize};

pub mod state;

pub use state::{SendRequest, SessionState, DEFAULT_THINKING_TEXT, SEND_FAILED_TEXT};

/// One file held by the backend file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileRef {
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    pub token_usage: Option<TokenUsage>,
    pub images: Option<Vec<String>>,
    pub files: Option<Vec<FileRef>>,
    pub run_steps: Option<Vec<RunStep>>,
    pub is_dxa_response: Option<bool>,
    /// Set on the local bubble that reports a failed send; never on the wire.
    #[serde(skip)]
    pub is_error: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            images: Some(images),
            ..Default::default()
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            ..Default::default()
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(text)
        }
    }
}

/// Hint forwarded with every image part telling the backend how closely to
/// analyse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageDetailLevel {
    Low,
    High,
    #[default]
    Auto,
}

impl ImageDetailLevel {
    pub const ALL: [ImageDetailLevel; 3] = [Self::Low, Self::High, Self::Auto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
            Self::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunStep {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub step_details: RunStepDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunStepDetails {
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolCall {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code_interpreter: Option<CodeInterpreterCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodeInterpreterCall {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub outputs: Vec<CodeInterpreterOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodeInterpreterOutput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub image: Option<OutputImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputImage {
    pub file_id: String,
}

/// Structured task breakdown produced by the backend's `dxa_factory` stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub answer: DxaAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaAnswer {
    #[serde(default)]
    pub response: DxaAnswerResponse,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaAnswerResponse {
    #[serde(default)]
    pub main_task: String,
    #[serde(default)]
    pub ooda_task_id: String,
    // The backend spells this field `substasks`.
    #[serde(default, rename = "substasks")]
    pub subtasks: Vec<DxaTask>,
    #[serde(default)]
    pub task_result: DxaTaskResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaTask {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_result: DxaTaskResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaTaskResult {
    #[serde(default)]
    pub citations: Vec<DxaCitation>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DxaCitation {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub image_src: Option<String>,
    #[serde(default)]
    pub page_index: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}
