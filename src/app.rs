use crate::chat::ChatService;
use crate::config::ClientConfig;
use crate::event::AppEvent;
use crate::files::FileService;
use crate::media;
use crate::session::{
    DxaResponse, DxaTaskResult, FileRef, ImageDetailLevel, Message, RunStep, SessionState,
};
use crate::system::SystemStatus;
use crate::theme::Theme;
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct ChatDeskApp {
    rx: Receiver<AppEvent>,
    chat: ChatService,
    files: FileService,
    theme: Theme,
    session: SessionState,
    system: SystemStatus,
    roster: Vec<FileRef>,
    uploads_in_flight: usize,
    upload_path: String,
    image_path: String,
    diagnostics_log: Vec<String>,
    scroll_to_bottom: bool,
}

enum FileAction {
    Download(FileRef),
    Delete(String),
}

impl ChatDeskApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        chat: ChatService,
        files: FileService,
        config: &ClientConfig,
        warnings: Vec<String>,
    ) -> Self {
        let mut app = Self {
            rx,
            chat,
            files,
            theme: Theme::default(),
            session: SessionState::new(config.image_detail),
            system: SystemStatus::default(),
            roster: Vec::new(),
            uploads_in_flight: 0,
            upload_path: String::new(),
            image_path: String::new(),
            diagnostics_log: Vec::new(),
            scroll_to_bottom: false,
        };

        for warning in warnings {
            app.log_diagnostic(format!("config warning: {warning}"));
        }
        app.log_diagnostic(format!("backend: {}", config.base_url));

        app
    }

    pub fn apply_theme(&self, ctx: &egui::Context) {
        self.theme.apply_visuals(ctx);
    }

    fn timestamp() -> String {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_secs().to_string(),
            Err(_) => "0".to_string(),
        }
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Self::timestamp(), message.into()));
    }

    fn status_color(&self) -> Color32 {
        if self.system.is_initializing {
            self.theme.warning
        } else if self.system.assistant_id.is_some() {
            self.theme.success
        } else {
            self.theme.danger
        }
    }

    fn submit(&mut self) {
        if let Some(request) = self.session.begin_send() {
            self.chat.send(request);
            self.scroll_to_bottom = true;
        }
    }

    fn attach_from_path(&mut self, path: PathBuf) {
        if media::is_image_path(&path) {
            self.chat.attach_image(path);
        } else {
            self.log_diagnostic(format!("not a supported image: {}", path.display()));
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                if media::is_image_path(&path) {
                    self.chat.attach_image(path);
                } else {
                    self.files.upload_path(path);
                }
            } else if let Some(bytes) = file.bytes {
                self.files.upload_bytes(file.name, bytes.to_vec());
            }
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Chat(event) => {
                self.session.apply_event(event);
                self.scroll_to_bottom = true;
            }
            AppEvent::SendFailed(reason) => {
                self.session.fail_send();
                self.log_diagnostic(format!("send failed: {reason}"));
                self.scroll_to_bottom = true;
            }
            AppEvent::SendFinished => self.session.finish_send(),
            AppEvent::SystemInfoLoading => self.system.begin(),
            AppEvent::SystemInfoLoaded(info) => {
                self.system.succeed(info);
                self.log_diagnostic("system info loaded");
            }
            AppEvent::SystemInfoFailed(reason) => {
                self.log_diagnostic(format!("system info failed: {reason}"));
                self.system.fail(&reason);
            }
            AppEvent::FilesChanged(files) => self.roster = files,
            AppEvent::UploadStarted(filename) => {
                self.uploads_in_flight += 1;
                self.log_diagnostic(format!("uploading {filename}"));
            }
            AppEvent::UploadRejected(filename) => {
                self.log_diagnostic(format!("upload of {filename} skipped, another upload is running"));
            }
            AppEvent::UploadFinished { filename, ok } => {
                self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                if ok {
                    self.log_diagnostic(format!("uploaded {filename}"));
                } else {
                    self.log_diagnostic(format!("upload failed: {filename}"));
                }
            }
            AppEvent::DeleteFinished { file_id, ok } => {
                if ok {
                    self.log_diagnostic(format!("deleted {file_id}"));
                } else {
                    self.log_diagnostic(format!("delete failed: {file_id}"));
                }
            }
            AppEvent::DownloadFinished { filename, result } => match result {
                Ok(path) => self.log_diagnostic(format!("downloaded {filename} to {path}")),
                Err(err) => self.log_diagnostic(format!("download of {filename} failed: {err}")),
            },
            AppEvent::ImageAttached(data_url) => self.session.attach_image(data_url),
            AppEvent::Diagnostic(message) => self.log_diagnostic(message),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let status_color = self.status_color();
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("ChatDesk");
                ui.separator();
                if self.system.is_initializing {
                    ui.spinner();
                }
                ui.label(RichText::new(&self.system.status).color(status_color));
                ui.separator();
                ui.label(format!(
                    "Assistant: {}",
                    self.system.assistant_id.as_deref().unwrap_or("-")
                ));
                ui.label(format!(
                    "Vector store: {}",
                    self.system.vector_store_id.as_deref().unwrap_or("-")
                ));
            });
        });
    }

    fn render_files_panel(&mut self, ctx: &egui::Context) {
        let uploading = self.uploads_in_flight > 0;
        let mut action: Option<FileAction> = None;
        let mut upload_now = false;
        let mut delete_all = false;
        let mut refresh = false;

        egui::SidePanel::left("files_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Files");
                ui.separator();

                ui.horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut self.upload_path)
                            .desired_width(160.0)
                            .hint_text("Path to upload"),
                    );
                    upload_now = ui
                        .add_enabled(
                            !uploading && !self.upload_path.trim().is_empty(),
                            egui::Button::new("Upload"),
                        )
                        .clicked();
                });
                if uploading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Uploading...").color(self.theme.text_muted));
                    });
                }
                ui.label(
                    RichText::new("Drop files on the window to upload")
                        .small()
                        .color(self.theme.text_muted),
                );

                ui.separator();
                ui.horizontal(|ui| {
                    refresh = ui.button("Refresh").clicked();
                    delete_all = ui
                        .add_enabled(!self.roster.is_empty(), egui::Button::new("Delete all"))
                        .clicked();
                });

                ScrollArea::vertical().id_salt("file_roster").show(ui, |ui| {
                    if self.roster.is_empty() {
                        ui.label(RichText::new("No files uploaded").color(self.theme.text_muted));
                    }
                    for file in &self.roster {
                        ui.horizontal(|ui| {
                            ui.label(&file.filename).on_hover_text(&file.file_id);
                            if ui.small_button("Download").clicked() {
                                action = Some(FileAction::Download(file.clone()));
                            }
                            if ui.small_button("Delete").clicked() {
                                action = Some(FileAction::Delete(file.file_id.clone()));
                            }
                        });
                    }
                });
            });

        if upload_now {
            let path = PathBuf::from(self.upload_path.trim());
            self.upload_path.clear();
            self.files.upload_path(path);
        }
        if refresh {
            self.files.refresh();
        }
        if delete_all {
            self.files.delete_all();
        }
        match action {
            Some(FileAction::Download(file)) => {
                self.log_diagnostic(format!(
                    "downloading {} into {}",
                    file.filename,
                    self.files.download_dir().display()
                ));
                self.files.download(file);
            }
            Some(FileAction::Delete(file_id)) => self.files.delete(file_id),
            None => {}
        }
    }

    fn render_dxa_panel(&self, ctx: &egui::Context) {
        let Some(response) = self.session.dxa_response.as_ref() else {
            return;
        };
        let theme = &self.theme;
        egui::SidePanel::right("dxa_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Task Factory");
                ui.separator();
                ScrollArea::vertical().id_salt("dxa_tree").show(ui, |ui| {
                    render_dxa(ui, theme, response);
                });
            });
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Chat");
                if ui
                    .add_enabled(!self.session.is_loading, egui::Button::new("Clear"))
                    .clicked()
                {
                    self.session.clear_messages();
                }
            });
            ui.separator();

            let transcript_height = (ui.available_height() - 220.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for (index, message) in self.session.messages.iter().enumerate() {
                        render_message(ui, &self.theme, index, message);
                    }

                    if self.session.is_loading {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label(
                                RichText::new(&self.session.thinking_text)
                                    .italics()
                                    .color(self.theme.text_muted),
                            );
                        });
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(entry);
                            }
                        });
                });

            ui.separator();
            self.render_composer(ui);
        });
    }

    fn render_composer(&mut self, ui: &mut egui::Ui) {
        let loading = self.session.is_loading;
        let mut remove: Option<usize> = None;
        let mut attach_now = false;
        let mut send_now = false;

        self.theme.composer_frame().show(ui, |ui| {
            if !self.session.selected_images.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for index in 0..self.session.selected_images.len() {
                        ui.label(format!("Image {}", index + 1));
                        if ui.add_enabled(!loading, egui::Button::new("x").small()).clicked() {
                            remove = Some(index);
                        }
                    }
                });
            }

            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.image_path)
                        .desired_width(220.0)
                        .hint_text("Image path"),
                );
                attach_now = ui
                    .add_enabled(
                        !loading && !self.image_path.trim().is_empty(),
                        egui::Button::new("Attach image"),
                    )
                    .clicked();

                ui.label("Detail");
                egui::ComboBox::from_id_salt("image_detail")
                    .selected_text(self.session.image_detail_level.as_str())
                    .show_ui(ui, |ui| {
                        for level in ImageDetailLevel::ALL {
                            ui.selectable_value(
                                &mut self.session.image_detail_level,
                                level,
                                level.as_str(),
                            );
                        }
                    });
            });

            let hint = if loading {
                "Waiting for response..."
            } else {
                "Type a message..."
            };
            ui.horizontal(|ui| {
                let width = (ui.available_width() - 70.0).max(120.0);
                let response = ui.add_enabled(
                    !loading,
                    egui::TextEdit::singleline(&mut self.session.input)
                        .desired_width(width)
                        .hint_text(hint),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    send_now = true;
                }
                send_now |= ui
                    .add_enabled(self.session.can_send(), egui::Button::new("Send"))
                    .clicked();
            });
        });

        if let Some(index) = remove {
            self.session.remove_image(index);
        }
        if attach_now {
            let path = PathBuf::from(self.image_path.trim());
            self.image_path.clear();
            self.attach_from_path(path);
        }
        if send_now {
            self.submit();
        }
    }
}

fn render_message(ui: &mut egui::Ui, theme: &Theme, index: usize, message: &Message) {
    let (speaker, fill) = if message.is_user {
        ("You", theme.user_bubble)
    } else if message.is_error {
        ("Assistant", theme.error_bubble)
    } else {
        ("Assistant", theme.assistant_bubble)
    };

    theme.bubble_frame(fill).show(ui, |ui| {
        ui.label(RichText::new(speaker).small().color(theme.text_muted));
        if !message.text.is_empty() {
            ui.label(&message.text);
        }

        if let Some(images) = message.images.as_ref().filter(|images| !images.is_empty()) {
            ui.label(
                RichText::new(format!("{} image(s) attached", images.len()))
                    .small()
                    .color(theme.text_muted),
            );
        }

        if let Some(files) = message.files.as_ref().filter(|files| !files.is_empty()) {
            for file in files {
                ui.label(RichText::new(format!("File: {}", file.filename)).small());
            }
        }

        if let Some(steps) = message.run_steps.as_ref().filter(|steps| !steps.is_empty()) {
            render_run_steps(ui, theme, index, steps);
        }

        if let Some(usage) = message.token_usage {
            ui.label(
                RichText::new(format!(
                    "Tokens: {} prompt, {} completion, {} total",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                ))
                .small()
                .color(theme.text_muted),
            );
        }
    });
    ui.add_space(theme.spacing_4);
}

fn render_run_steps(ui: &mut egui::Ui, theme: &Theme, index: usize, steps: &[RunStep]) {
    egui::CollapsingHeader::new(format!("Run steps ({})", steps.len()))
        .id_salt(("run_steps", index))
        .default_open(false)
        .show(ui, |ui| {
            for step in steps {
                ui.label(RichText::new(&step.kind).strong());
                let calls = step.step_details.tool_calls.as_deref().unwrap_or_default();
                for call in calls {
                    let Some(code) = call.code_interpreter.as_ref() else {
                        ui.label(RichText::new(&call.kind).color(theme.text_muted));
                        continue;
                    };
                    ui.label(RichText::new(&code.input).monospace());
                    for output in &code.outputs {
                        if let Some(logs) = &output.logs {
                            ui.label(RichText::new(logs).monospace().color(theme.text_muted));
                        }
                        if let Some(image) = &output.image {
                            ui.label(
                                RichText::new(format!("image output: {}", image.file_id))
                                    .small()
                                    .color(theme.text_muted),
                            );
                        }
                    }
                }
            }
        });
}

fn render_dxa(ui: &mut egui::Ui, theme: &Theme, response: &DxaResponse) {
    let answer = &response.answer.response;
    ui.label(format!("Status: {}", response.status));
    ui.label(format!("Task: {}", response.answer.task_id));
    if !answer.main_task.is_empty() {
        ui.label(RichText::new(&answer.main_task).strong());
    }

    for (index, task) in answer.subtasks.iter().enumerate() {
        egui::CollapsingHeader::new(format!("{} [{}]", task.task, task.status))
            .id_salt(("dxa_subtask", index))
            .default_open(false)
            .show(ui, |ui| {
                render_task_result(ui, theme, &task.task_result);
            });
    }

    ui.separator();
    ui.strong("Result");
    render_task_result(ui, theme, &answer.task_result);
}

fn render_task_result(ui: &mut egui::Ui, theme: &Theme, result: &DxaTaskResult) {
    if !result.content.is_empty() {
        ui.label(&result.content);
    }
    for citation in &result.citations {
        ui.label(
            RichText::new(format!(
                "{} ({}, page {})",
                citation.source, citation.file_path, citation.page_index
            ))
            .small()
            .color(theme.text_muted),
        );
    }
}

impl eframe::App for ChatDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.handle_dropped_files(ctx);
        self.render_top_bar(ctx);
        self.render_files_panel(ctx);
        self.render_dxa_panel(ctx);
        self.render_center_panel(ctx);
    }
}
