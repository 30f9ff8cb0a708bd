use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::session::{DxaResponse, FileRef, Message, RunStep, TokenUsage};

/// Payload of the terminal `complete` event, and the whole body of the
/// non-streaming chat reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletePayload {
    pub text: String,
    #[serde(default)]
    pub token_usage: Option<TokenUsage>,
    #[serde(default)]
    pub files: Option<Vec<FileRef>>,
    #[serde(default)]
    pub run_steps: Option<Vec<RunStep>>,
    #[serde(default, rename = "isDxaResponse")]
    pub is_dxa_response: Option<bool>,
}

impl CompletePayload {
    pub fn into_message(self) -> Message {
        Message {
            text: self.text,
            is_user: false,
            token_usage: self.token_usage,
            images: None,
            files: self.files,
            run_steps: self.run_steps,
            is_dxa_response: self.is_dxa_response,
            is_error: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Thinking(String),
    FunctionCall(String),
    DxaFactory(DxaResponse),
    Complete(CompletePayload),
}

impl ChatEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Thinking(_) => "thinking",
            Self::FunctionCall(_) => "function_call",
            Self::DxaFactory(_) => "dxa_factory",
            Self::Complete(_) => "complete",
        }
    }

    /// Interprets one decoded `{type, data}` record.
    ///
    /// Unknown tags yield `Ok(None)`. A known tag whose `data` has the wrong
    /// shape is an error so the caller can skip it like any other malformed
    /// record.
    pub fn from_record(record: Value) -> Result<Option<Self>, RecordError> {
        let Value::Object(mut fields) = record else {
            return Err(RecordError::NotAnObject);
        };

        let tag = match fields.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            _ => return Err(RecordError::MissingType),
        };
        let data = fields.remove("data").unwrap_or(Value::Null);

        let event = match tag.as_str() {
            "thinking" => Self::Thinking(parse_data(&tag, data)?),
            "function_call" => Self::FunctionCall(parse_data(&tag, data)?),
            "dxa_factory" => Self::DxaFactory(parse_data(&tag, data)?),
            "complete" => Self::Complete(parse_data(&tag, data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("event record is not a JSON object")]
    NotAnObject,
    #[error("event record has no string `type`")]
    MissingType,
    #[error("`{tag}` event has invalid data: {source}")]
    BadData {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

fn parse_data<T: for<'de> Deserialize<'de>>(tag: &str, data: Value) -> Result<T, RecordError> {
    serde_json::from_value(data).map_err(|source| RecordError::BadData {
        tag: tag.to_string(),
        source,
    })
}
