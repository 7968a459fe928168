//! Filesystem blob store for uploaded media.
//!
//! This crate provides:
//! - Blob writes named by a generated upload id plus the original extension
//! - An explicit upload-id index, rebuilt from disk at startup
//! - Blob reads by exact upload id

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{mime_for_extension, StoredUpload, UploadStore};
