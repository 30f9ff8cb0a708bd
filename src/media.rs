use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fs;
use std::path::Path;

use crate::api::ApiError;

/// Decoded form of a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(url: &str) -> Result<Self, ApiError> {
        let Some(rest) = url.strip_prefix("data:") else {
            return Err(invalid("missing `data:` scheme"));
        };
        let Some((header, payload)) = rest.split_once(',') else {
            return Err(invalid("missing `,` separator"));
        };
        let Some(mime) = header.strip_suffix(";base64") else {
            return Err(invalid("payload is not base64 encoded"));
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|err| invalid(&format!("base64 payload does not decode: {err}")))?;

        Ok(Self {
            mime: if mime.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime.to_string()
            },
            bytes,
        })
    }

    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }
}

pub fn image_mime_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn is_image_path(path: &Path) -> bool {
    image_mime_for(path).is_some()
}

/// Reads an image file from disk as a data URL ready to attach.
pub fn load_image(path: &Path) -> Result<String, ApiError> {
    let Some(mime) = image_mime_for(path) else {
        return Err(invalid(&format!(
            "{} is not a supported image type",
            path.display()
        )));
    };
    let bytes = fs::read(path).map_err(|source| ApiError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(DataUrl::encode(mime, &bytes))
}

fn invalid(reason: &str) -> ApiError {
    ApiError::InvalidDataUrl {
        reason: reason.to_string(),
    }
}
