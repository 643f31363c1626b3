use crate::error::GalleryError;
use crate::host::ImageUpload;

/// Default per-file size limit: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME prefix every accepted file must carry.
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// Type and size rules applied to every file before anything is uploaded.
///
/// Zero-byte files are rejected whether or not the policy is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    /// When false, only the non-empty check runs
    pub enforce: bool,

    /// Largest accepted file in bytes
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            enforce: true,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadPolicy {
    /// A policy that accepts any non-empty file.
    pub fn permissive() -> Self {
        Self {
            enforce: false,
            max_bytes: usize::MAX,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Check a single file.
    pub fn check(&self, file: &ImageUpload) -> Result<(), GalleryError> {
        if file.is_empty() {
            return Err(GalleryError::EmptyFile {
                filename: file.filename.clone(),
            });
        }

        if !self.enforce {
            return Ok(());
        }

        if !file
            .content_type
            .to_ascii_lowercase()
            .starts_with(IMAGE_MIME_PREFIX)
        {
            return Err(GalleryError::UnsupportedFileType {
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
            });
        }

        if file.len() > self.max_bytes {
            return Err(GalleryError::FileTooLarge {
                filename: file.filename.clone(),
                size: file.len(),
                limit: self.max_bytes,
            });
        }

        Ok(())
    }

    /// Check a whole batch; the first offending file decides the error.
    pub fn check_all(&self, files: &[ImageUpload]) -> Result<(), GalleryError> {
        if files.is_empty() {
            return Err(GalleryError::NoFilesProvided);
        }
        files.iter().try_for_each(|file| self.check(file))
    }
}
