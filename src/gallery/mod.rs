//! Gallery workflows: upload pipeline, listing, delete.
//!
//! # Components
//!
//! - [`GalleryService`]: orchestrates host uploads and record persistence
//! - [`UploadPolicy`]: type and size rules checked before any upload

mod policy;
mod service;

pub use policy::{UploadPolicy, DEFAULT_MAX_UPLOAD_BYTES, IMAGE_MIME_PREFIX};
pub use service::{GalleryService, DEFAULT_UPLOAD_CONCURRENCY, DEFAULT_UPLOAD_FOLDER};
