//! Input validation surfaced synchronously, before any store mutation.

use std::path::Path;
use thiserror::Error;

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("only images can be uploaded, got `{0}`")]
    NotAnImage(String),

    #[error("file is larger than {max_mb} MB ({size} bytes)", max_mb = MAX_IMAGE_BYTES / 1024 / 1024)]
    FileTooLarge { size: u64 },

    #[error("expected a .csv file, got `{0}`")]
    NotCsv(String),
}

/// Check an image attachment by MIME type and size.
///
/// An empty MIME type is accepted; only an explicit non-image type is
/// rejected.
pub fn validate_image(mime: &str, size: u64) -> Result<(), ValidationError> {
    let mime = mime.trim();
    if !mime.is_empty() && !mime.starts_with("image/") {
        return Err(ValidationError::NotAnImage(mime.to_string()));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ValidationError::FileTooLarge { size });
    }
    Ok(())
}

/// Check that an import file looks like CSV by its extension.
pub fn validate_csv_path(path: &Path) -> Result<(), ValidationError> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        Ok(())
    } else {
        Err(ValidationError::NotCsv(path.display().to_string()))
    }
}
