use chatdesk::api::{ApiClient, Backend};
use chatdesk::app::ChatDeskApp;
use chatdesk::chat::ChatService;
use chatdesk::config::ClientConfig;
use chatdesk::event;
use chatdesk::files::{FileRoster, FileService};
use chatdesk::{logging, system};
use eframe::egui;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, warnings) = ClientConfig::load();
    logging::init(config.log_filter.as_deref());
    info!(base_url = %config.base_url, "starting chatdesk");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("chatdesk-runtime")
        .build()?;

    let backend: Arc<dyn Backend> = Arc::new(ApiClient::from_config(&config)?);
    let (sink, rx) = event::channel();
    let handle = runtime.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([960.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "ChatDesk",
        native_options,
        Box::new(move |creation_context| {
            let repaint = creation_context.egui_ctx.clone();
            let events = sink.with_waker(move || repaint.request_repaint());

            let chat = ChatService::new(Arc::clone(&backend), events.clone(), handle.clone());
            let roster = Arc::new(FileRoster::new(Arc::clone(&backend), events.clone()));
            let files = FileService::new(roster, events.clone(), handle.clone(), config.download_dir.clone());

            system::spawn_initialize(&handle, Arc::clone(&backend), events);
            files.refresh();

            let app = ChatDeskApp::new(rx, chat, files, &config, warnings);
            app.apply_theme(&creation_context.egui_ctx);
            Ok(Box::new(app))
        }),
    )?;

    drop(runtime);
    Ok(())
}
