//! Item removal: blob first, best effort, then the document, which must
//! succeed.

use super::gallery_service::{GalleryError, GalleryResult, GalleryService};
use crate::models::gallery_item::{GALLERY_COLLECTION, GalleryItem};
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of a step whose failure does not fail the operation.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum BestEffort {
    Completed,
    Tolerated(String),
}

#[derive(Serialize, Clone, Debug)]
pub struct DeleteOutcome {
    pub id: String,
    pub blob: BestEffort,
}

impl GalleryService {
    /// Delete `item` once the user has confirmed.
    pub async fn delete(&self, item: &GalleryItem, confirmed: bool) -> GalleryResult<DeleteOutcome> {
        if !confirmed {
            return Err(GalleryError::ConfirmationRequired);
        }

        let blob = match self.blobs.delete_by_url(&item.url).await {
            Ok(()) => BestEffort::Completed,
            Err(err) => {
                debug!(id = %item.id, url = %item.url, error = %err, "blob delete tolerated");
                BestEffort::Tolerated(err.to_string())
            }
        };

        self.documents.delete(GALLERY_COLLECTION, &item.id).await?;

        info!(id = %item.id, "gallery item deleted");
        Ok(DeleteOutcome {
            id: item.id.clone(),
            blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::BackendError,
        services::{
            gallery_service::{CaptionPolicy, fixtures::{Fixture, fixture}},
            upload::{LocalFile, UploadForm},
        },
    };
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    async fn upload(fx: &Fixture, names: &[&str]) -> Vec<GalleryItem> {
        let mut form = UploadForm {
            files: names
                .iter()
                .map(|n| LocalFile {
                    file_name: n.to_string(),
                    bytes: Bytes::from_static(b"img"),
                })
                .collect(),
            ..Default::default()
        };
        fx.service.upload(&mut form).await.unwrap();
        fx.service.list().await.unwrap()
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let fx = fixture(CaptionPolicy::Filename);
        let items = upload(&fx, &["a.jpg"]).await;
        let calls = fx.blobs.calls();

        let err = fx.service.delete(&items[0], false).await.unwrap_err();

        assert!(matches!(err, GalleryError::ConfirmationRequired));
        assert_eq!(fx.blobs.calls(), calls);
        assert_eq!(fx.service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_blob_and_document() {
        let fx = fixture(CaptionPolicy::Filename);
        let items = upload(&fx, &["a.jpg", "b.jpg"]).await;

        let outcome = fx.service.delete(&items[0], true).await.unwrap();

        assert_eq!(outcome.blob, BestEffort::Completed);
        assert_eq!(fx.blobs.len(), 1);
        let remaining = fx.service.list().await.unwrap();
        assert!(remaining.iter().all(|i| i.id != items[0].id));
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn blob_failure_does_not_block_document_delete() {
        let fx = fixture(CaptionPolicy::Filename);
        let items = upload(&fx, &["a.jpg"]).await;
        fx.blobs.fail_deletes();

        let outcome = fx.service.delete(&items[0], true).await.unwrap();

        assert_eq!(
            outcome.blob,
            BestEffort::Tolerated("storage unavailable".into())
        );
        assert!(fx.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmappable_url_is_tolerated() {
        let fx = fixture(CaptionPolicy::Filename);
        let mut item = upload(&fx, &["a.jpg"]).await.remove(0);
        item.url = "https://elsewhere.example/a.jpg".into();

        let outcome = fx.service.delete(&item, true).await.unwrap();

        assert!(matches!(outcome.blob, BestEffort::Tolerated(_)));
        assert!(fx.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn document_delete_failure_is_an_error() {
        let fx = fixture(CaptionPolicy::Filename);
        let item = upload(&fx, &["a.jpg"]).await.remove(0);
        fx.service.delete(&item, true).await.unwrap();

        let err = fx.service.delete(&item, true).await.unwrap_err();
        assert!(matches!(
            err,
            GalleryError::Backend(BackendError::NotFound { .. })
        ));
    }
}
