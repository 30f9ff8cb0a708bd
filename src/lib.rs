pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod files;
pub mod logging;
pub mod media;
pub mod session;
pub mod stream;
pub mod system;
pub mod theme;
