use crate::dispatch::ChatEvent;
use crate::session::{DxaResponse, ImageDetailLevel, Message};

pub const DEFAULT_THINKING_TEXT: &str = "Thinking...";
pub const SEND_FAILED_TEXT: &str = "An error occurred. Please try again.";

/// Everything the send worker needs for one cycle, captured when the cycle
/// starts so later edits to the draft do not leak into the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub text: String,
    pub images: Vec<String>,
    pub detail: ImageDetailLevel,
}

/// Chat session state owned by the UI thread.
///
/// Mutated only through the methods below: user actions (`begin_send`,
/// `clear_messages`, attachment edits), decoded stream events
/// (`apply_event`) and the two cycle exits (`fail_send`, `finish_send`).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub messages: Vec<Message>,
    pub input: String,
    pub selected_images: Vec<String>,
    pub image_detail_level: ImageDetailLevel,
    pub is_loading: bool,
    pub thinking_text: String,
    pub dxa_response: Option<DxaResponse>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(ImageDetailLevel::default())
    }
}

impl SessionState {
    pub fn new(image_detail_level: ImageDetailLevel) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            selected_images: Vec::new(),
            image_detail_level,
            is_loading: false,
            thinking_text: DEFAULT_THINKING_TEXT.to_string(),
            dxa_response: None,
        }
    }

    pub fn can_send(&self) -> bool {
        !self.is_loading && (!self.input.trim().is_empty() || !self.selected_images.is_empty())
    }

    /// Starts a send cycle if the guard allows it.
    ///
    /// On success the user echo is already in `messages`, the draft and the
    /// attachment list are empty and `is_loading` is set. Returns `None`
    /// without touching anything when there is nothing to send or a cycle is
    /// already running.
    pub fn begin_send(&mut self) -> Option<SendRequest> {
        if !self.can_send() {
            return None;
        }

        self.is_loading = true;
        self.thinking_text = DEFAULT_THINKING_TEXT.to_string();

        let text = self.input.trim().to_string();
        let images = std::mem::take(&mut self.selected_images);
        self.input.clear();
        self.messages.push(Message::user(text.clone(), images.clone()));

        Some(SendRequest {
            text,
            images,
            detail: self.image_detail_level,
        })
    }

    /// Applies one decoded stream event.
    ///
    /// `thinking` and `function_call` share `thinking_text`; whichever arrives
    /// last is shown.
    pub fn apply_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Thinking(text) | ChatEvent::FunctionCall(text) => {
                self.thinking_text = text;
            }
            ChatEvent::DxaFactory(response) => {
                self.dxa_response = Some(response);
            }
            ChatEvent::Complete(payload) => {
                self.messages.push(payload.into_message());
            }
        }
    }

    pub fn fail_send(&mut self) {
        self.messages.push(Message::error(SEND_FAILED_TEXT));
    }

    /// Cycle exit, run on every path.
    pub fn finish_send(&mut self) {
        self.is_loading = false;
        self.thinking_text = DEFAULT_THINKING_TEXT.to_string();
        self.selected_images.clear();
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.input.clear();
        self.selected_images.clear();
        self.dxa_response = None;
    }

    pub fn attach_image(&mut self, data_url: String) {
        self.selected_images.push(data_url);
    }

    pub fn remove_image(&mut self, index: usize) -> Option<String> {
        if index < self.selected_images.len() {
            Some(self.selected_images.remove(index))
        } else {
            None
        }
    }
}
