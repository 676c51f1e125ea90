//! GalleryService - the gallery synchronization flow over the backend facade.
//!
//! The operations live in sibling modules, each adding an `impl` block:
//! - `upload`: files → blobs → URLs → documents
//! - `gallery_list`: ordered listing and row view models
//! - `editor`: caption/tag edits
//! - `deleter`: blob + document removal

use crate::backend::{BackendError, BlobApi, DocumentApi};
use clap::ValueEnum;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Status text shown when an upload is attempted with nothing selected.
pub const NO_FILE_SELECTED: &str = "Please select image(s) to upload.";

/// How the caption of each uploaded file is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CaptionPolicy {
    /// Every file gets the caption exactly as entered, even when empty.
    Shared,
    /// An empty caption falls back to each file's own name.
    #[default]
    Filename,
}

/// One file that failed somewhere in its upload pipeline.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FailedFile {
    pub file_name: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{}", NO_FILE_SELECTED)]
    NoFileSelected,
    #[error("Please enter your email and password.")]
    MissingCredentials,
    #[error("Delete this item? This cannot be undone.")]
    ConfirmationRequired,
    #[error("gallery item `{0}` not found")]
    ItemNotFound(String),
    /// At least one file failed. Files that succeeded stay uploaded.
    #[error("{message}")]
    UploadFailed {
        message: String,
        created: Vec<String>,
        failed: Vec<FailedFile>,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

#[derive(Clone)]
pub struct GalleryService {
    pub documents: Arc<dyn DocumentApi>,
    pub blobs: Arc<dyn BlobApi>,
    pub caption_policy: CaptionPolicy,
}

impl GalleryService {
    pub fn new(
        documents: Arc<dyn DocumentApi>,
        blobs: Arc<dyn BlobApi>,
        caption_policy: CaptionPolicy,
    ) -> Self {
        Self {
            documents,
            blobs,
            caption_policy,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::backend::memory::{MemoryBlobs, MemoryDocuments};

    pub struct Fixture {
        pub docs: Arc<MemoryDocuments>,
        pub blobs: Arc<MemoryBlobs>,
        pub service: GalleryService,
    }

    pub fn fixture(policy: CaptionPolicy) -> Fixture {
        let docs = Arc::new(MemoryDocuments::default());
        let blobs = Arc::new(MemoryBlobs::default());
        let service = GalleryService::new(docs.clone(), blobs.clone(), policy);
        Fixture {
            docs,
            blobs,
            service,
        }
    }
}
