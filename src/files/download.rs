use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::api::ApiError;

/// Keeps only the final path component so a backend filename cannot escape
/// the download directory.
pub fn safe_filename(raw: &str, fallback: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

/// Writes `bytes` to `dir/filename`, replacing any existing file.
///
/// The data goes to a temporary sibling first and is renamed into place, so
/// a failed write never leaves a truncated file under the final name.
pub async fn save(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ApiError::Io { path, source }
    };

    fs::create_dir_all(dir).await.map_err(io_error(dir))?;

    let final_path = dir.join(filename);
    let tmp_path = dir.join(format!(".{filename}.part"));
    fs::write(&tmp_path, bytes).await.map_err(io_error(&tmp_path))?;

    match fs::rename(&tmp_path, &final_path).await {
        Ok(()) => Ok(final_path),
        Err(rename_err) => {
            if fs::try_exists(&final_path).await.unwrap_or(false) {
                fs::remove_file(&final_path)
                    .await
                    .map_err(io_error(&final_path))?;
                fs::rename(&tmp_path, &final_path)
                    .await
                    .map_err(io_error(&final_path))?;
                Ok(final_path)
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                Err(ApiError::Io {
                    path: final_path,
                    source: rename_err,
                })
            }
        }
    }
}
