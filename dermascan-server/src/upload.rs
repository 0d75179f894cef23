//! Multipart image intake for `POST /predict`.
//!
//! The image field is streamed to a scratch file under the configured upload
//! directory while its size is counted. The file lives exactly as long as the
//! returned `ScopedUpload`.

use std::path::{Path, PathBuf};

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use chrono::Utc;
use dermascan_core::config::UploadConfig;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Fallback message when an upload fails without a usable reason.
pub const DEFAULT_UPLOAD_ERROR: &str = "Terjadi kesalahan dalam melakukan prediksi";
pub const DISALLOWED_TYPE: &str = "Only image files are allowed";
pub const UNEXPECTED_FIELD: &str = "Unexpected field";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Payload content length greater than maximum allowed: {limit}")]
    PayloadTooLarge { limit: usize },

    #[error("{0}")]
    InvalidUpload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Build an `InvalidUpload`, substituting the default message for an empty reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.trim().is_empty() {
            UploadError::InvalidUpload(DEFAULT_UPLOAD_ERROR.to_string())
        } else {
            UploadError::InvalidUpload(reason)
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_bytes: usize,
    pub field_name: String,
    pub allowed_extensions: Vec<String>,
    pub dir: PathBuf,
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_bytes: config.max_bytes,
            field_name: config.field_name.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            dir: PathBuf::from(&config.dir),
        }
    }
}

/// An uploaded image on disk. The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct ScopedUpload {
    path: PathBuf,
    file_name: String,
    len: usize,
}

impl ScopedUpload {
    fn new(dir: &Path, file_name: &str) -> Self {
        let stored_name = format!(
            "{}_{}_{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        );
        Self {
            path: dir.join(stored_name),
            file_name: file_name.to_string(),
            len: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_existing(path: PathBuf, file_name: &str) -> Self {
        let len = std::fs::metadata(&path).map(|m| m.len() as usize).unwrap_or(0);
        Self {
            path,
            file_name: file_name.to_string(),
            len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name the client sent.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for ScopedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove upload {}: {}", self.path.display(), e),
        }
    }
}

fn is_path_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Extension of the final path component, leading dot included.
///
/// A name whose only dot is its first character (`.png`) has no extension,
/// and a trailing dot yields `"."`.
pub fn extension_of(file_name: &str) -> &str {
    let base = file_name.rsplit(is_path_separator).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

/// Case-sensitive membership check against the configured extensions.
pub fn is_allowed_extension(file_name: &str, allowed: &[String]) -> bool {
    let ext = extension_of(file_name);
    !ext.is_empty() && allowed.iter().any(|a| a == ext)
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(is_path_separator).next().unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn from_multipart_error(err: MultipartError, limit: usize) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge { limit }
    } else {
        UploadError::invalid(err.body_text())
    }
}

/// Read the single image field from a multipart body.
///
/// Text fields are skipped. Any other file field, or a second image, is
/// rejected; so is a body with no image at all.
pub async fn read_image_upload(
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<ScopedUpload, UploadError> {
    let limit = limits.max_bytes;
    let mut upload: Option<ScopedUpload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| from_multipart_error(e, limit))?
    {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        if field.name() != Some(limits.field_name.as_str()) || upload.is_some() {
            return Err(UploadError::invalid(UNEXPECTED_FIELD));
        }

        if !is_allowed_extension(&file_name, &limits.allowed_extensions) {
            return Err(UploadError::invalid(DISALLOWED_TYPE));
        }

        let mut scoped = ScopedUpload::new(&limits.dir, &file_name);
        let mut file = tokio::fs::File::create(scoped.path()).await?;

        let mut written = 0usize;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| from_multipart_error(e, limit))?
        {
            written += chunk.len();
            if written > limit {
                return Err(UploadError::PayloadTooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        scoped.len = written;
        tracing::debug!(
            "Received upload '{}' ({} bytes) at {}",
            scoped.file_name(),
            written,
            scoped.path().display()
        );
        upload = Some(scoped);
    }

    upload.ok_or_else(|| UploadError::invalid(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;

    const BOUNDARY: &str = "dermascan-unit-boundary";

    fn part(name: &str, file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
        let mut out = format!("--{}\r\n", BOUNDARY).into_bytes();
        let disposition = match file_name {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        out.extend_from_slice(disposition.as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    async fn multipart_from(parts: Vec<Vec<u8>>) -> Multipart {
        let mut body: Vec<u8> = parts.into_iter().flatten().collect();
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        let req = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    fn limits(dir: &Path, max_bytes: usize) -> UploadLimits {
        UploadLimits {
            max_bytes,
            dir: dir.to_path_buf(),
            ..UploadLimits::from(&UploadConfig::default())
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("scan.png"), ".png");
        assert_eq!(extension_of("archive.tar.jpeg"), ".jpeg");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".png"), "");
        assert_eq!(extension_of("trailing."), ".");
        assert_eq!(extension_of("dir.d/file"), "");
        assert_eq!(extension_of("C:\\photos\\mole.jpg"), ".jpg");
    }

    #[test]
    fn test_extension_check_is_case_sensitive() {
        let allowed = UploadConfig::default().allowed_extensions;
        assert!(is_allowed_extension("a.jpg", &allowed));
        assert!(is_allowed_extension("a.jpeg", &allowed));
        assert!(is_allowed_extension("a.png", &allowed));
        assert!(!is_allowed_extension("a.PNG", &allowed));
        assert!(!is_allowed_extension("a.gif", &allowed));
        assert!(!is_allowed_extension("png", &allowed));
    }

    #[test]
    fn test_sanitize_file_name_strips_paths() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my mole.png"), "my_mole.png");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn test_invalid_with_empty_reason_uses_default() {
        assert_eq!(UploadError::invalid("  ").to_string(), DEFAULT_UPLOAD_ERROR);
        assert_eq!(UploadError::invalid("boom").to_string(), "boom");
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = UploadError::PayloadTooLarge { limit: 1_000_000 };
        assert_eq!(
            err.to_string(),
            "Payload content length greater than maximum allowed: 1000000"
        );
    }

    #[tokio::test]
    async fn test_reads_image_and_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![
            part("note", None, b"ignored text field"),
            part("image", Some("mole.png"), b"\x89PNG fake image"),
        ])
        .await;

        let upload = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap();
        assert_eq!(upload.file_name(), "mole.png");
        assert_eq!(upload.len(), 15);
        assert!(upload.path().starts_with(dir.path()));
        assert!(upload.path().to_string_lossy().ends_with("_mole.png"));
        assert_eq!(upload.read().await.unwrap(), b"\x89PNG fake image");

        drop(upload);
        assert!(dir_is_empty(dir.path()), "upload must be removed on drop");
    }

    #[tokio::test]
    async fn test_oversized_image_rejected_and_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![part("image", Some("big.jpg"), &[7u8; 2048])]).await;

        let err = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::PayloadTooLarge { limit: 1024 }));
        assert!(dir_is_empty(dir.path()), "partial upload must be removed");
    }

    #[tokio::test]
    async fn test_image_exactly_at_limit_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![part("image", Some("edge.jpeg"), &[1u8; 1024])]).await;

        let upload = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap();
        assert_eq!(upload.len(), 1024);
    }

    #[tokio::test]
    async fn test_disallowed_extension_rejected_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![part("image", Some("notes.txt"), b"hello")]).await;

        let err = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), DISALLOWED_TYPE);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_unexpected_file_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![part("photo", Some("mole.png"), b"data")]).await;

        let err = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), UNEXPECTED_FIELD);
    }

    #[tokio::test]
    async fn test_second_image_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![
            part("image", Some("a.png"), b"first"),
            part("image", Some("b.png"), b"second"),
        ])
        .await;

        let err = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), UNEXPECTED_FIELD);
        assert!(dir_is_empty(dir.path()), "first image must not outlive the failure");
    }

    #[tokio::test]
    async fn test_missing_image_uses_default_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut mp = multipart_from(vec![part("note", None, b"just text")]).await;

        let err = read_image_upload(&mut mp, &limits(dir.path(), 1024))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_UPLOAD_ERROR);
    }
}
