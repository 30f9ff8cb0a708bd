use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::session::ImageDetailLevel;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const BASE_URL_ENV: &str = "CHATDESK_BASE_URL";
pub const DOWNLOAD_DIR_ENV: &str = "CHATDESK_DOWNLOAD_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub image_detail: ImageDetailLevel,
    pub download_dir: PathBuf,
    pub log_filter: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            image_detail: ImageDetailLevel::default(),
            download_dir: default_download_dir(),
            log_filter: None,
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"))
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chatdesk").join("config.toml"))
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Loads the user config file, then applies environment overrides.
    ///
    /// Never fails: problems come back as warnings next to a usable config.
    pub fn load() -> (Self, Vec<String>) {
        let (config, warnings) = match config_path() {
            Some(path) => Self::load_from(&path),
            None => (Self::default(), Vec::new()),
        };
        (config.with_overrides(|key| std::env::var(key).ok()), warnings)
    }

    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        if !path.exists() {
            return (Self::default(), Vec::new());
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                return (
                    Self::default(),
                    vec![format!("failed to read {}: {err}", path.display())],
                )
            }
        };

        match Self::parse(&text) {
            Ok(config) => (config, Vec::new()),
            Err(err) => (
                Self::default(),
                vec![format!("failed to parse {}: {err}", path.display())],
            ),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.base_url = normalize_base_url(&base_url);
        }
        if let Some(dir) = lookup(DOWNLOAD_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            self.download_dir = PathBuf::from(dir);
        }
        self
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
