//! Gallery upload pipeline.
//!
//! Each selected file runs its own three-step flow: write the blob, resolve
//! its URL, create the document. The flows run concurrently and all of them
//! run to completion; there is no rollback of the files that made it when a
//! sibling fails.

use super::gallery_service::{
    CaptionPolicy, FailedFile, GalleryError, GalleryResult, GalleryService,
};
use crate::{
    backend::NewDocument,
    models::gallery_item::{
        FIELD_CAPTION, FIELD_CREATED_AT, FIELD_TAGS, FIELD_URL, GALLERY_COLLECTION, parse_tags,
    },
};
use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

pub const UPLOAD_COMPLETE: &str = "Upload complete.";

/// Folder every gallery blob is written under.
const STORAGE_FOLDER: &str = "gallery";

/// A file picked for upload.
#[derive(Clone, Debug)]
pub struct LocalFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// The upload area: selected files plus the caption and tag inputs.
#[derive(Clone, Debug, Default)]
pub struct UploadForm {
    pub files: Vec<LocalFile>,
    pub caption: String,
    pub tags_input: String,
}

impl UploadForm {
    pub fn clear(&mut self) {
        self.files.clear();
        self.caption.clear();
        self.tags_input.clear();
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct UploadReport {
    /// Ids of the created documents, in selection order.
    pub created: Vec<String>,
    pub status: &'static str,
}

/// Blob path for a file: a millisecond timestamp prefix plus the file name.
///
/// Two files with the same name in the same millisecond map to the same
/// path and the later write wins.
pub fn storage_path(millis: i64, file_name: &str) -> String {
    format!("{STORAGE_FOLDER}/{millis}-{}", base_name(file_name))
}

/// Browsers may send a full client path; keep the last component only.
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name)
}

impl GalleryService {
    /// Upload every file in `form`, clearing the form on full success.
    pub async fn upload(&self, form: &mut UploadForm) -> GalleryResult<UploadReport> {
        if form.files.is_empty() {
            return Err(GalleryError::NoFileSelected);
        }

        let caption = form.caption.trim().to_string();
        let tags = parse_tags(&form.tags_input);

        let flows = form
            .files
            .iter()
            .map(|file| self.upload_one(file, &caption, &tags));
        let results = join_all(flows).await;

        let mut created = Vec::new();
        let mut failed = Vec::new();
        for (file, result) in form.files.iter().zip(results) {
            match result {
                Ok(id) => created.push(id),
                Err(err) => {
                    warn!(file = %file.file_name, error = %err, "gallery upload failed");
                    failed.push(FailedFile {
                        file_name: file.file_name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(first) = failed.first() {
            return Err(GalleryError::UploadFailed {
                message: first.message.clone(),
                created,
                failed,
            });
        }

        info!(count = created.len(), "gallery upload complete");
        form.clear();
        Ok(UploadReport {
            created,
            status: UPLOAD_COMPLETE,
        })
    }

    async fn upload_one(
        &self,
        file: &LocalFile,
        caption: &str,
        tags: &[String],
    ) -> GalleryResult<String> {
        let path = storage_path(Utc::now().timestamp_millis(), &file.file_name);
        let blob = self.blobs.write(&path, file.bytes.clone()).await?;
        let url = self.blobs.resolve_url(&blob).await?;

        let caption = match self.caption_policy {
            CaptionPolicy::Filename if caption.is_empty() => base_name(&file.file_name).to_string(),
            _ => caption.to_string(),
        };

        let doc = NewDocument::new()
            .field(FIELD_URL, url)
            .field(FIELD_CAPTION, caption)
            .field(FIELD_TAGS, tags.to_vec())
            .server_timestamp(FIELD_CREATED_AT);
        Ok(self.documents.create(GALLERY_COLLECTION, doc).await?)
    }
}
