//! Gallery listing and the row view models the dashboard renders.

use super::gallery_service::{GalleryError, GalleryResult, GalleryService};
use crate::{
    backend::BackendError,
    models::gallery_item::{FIELD_CREATED_AT, GALLERY_COLLECTION, GalleryItem, join_tags},
};
use serde::Serialize;
use tracing::warn;

pub const EMPTY_GALLERY: &str = "No images uploaded yet.";
pub const SAVE_LABEL: &str = "Save";

/// One editable row: the image plus its caption/tag inputs and Save label.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GalleryRow {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub caption: String,
    pub tags: String,
    pub save_label: String,
}

impl From<&GalleryItem> for GalleryRow {
    fn from(item: &GalleryItem) -> Self {
        Self {
            id: item.id.clone(),
            url: item.url.clone(),
            alt: item.caption.clone(),
            caption: item.caption.clone(),
            tags: join_tags(&item.tags),
            save_label: SAVE_LABEL.to_string(),
        }
    }
}

/// What the gallery area shows.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GalleryView {
    Loading,
    Rows { rows: Vec<GalleryRow> },
    Empty { message: String },
    Failed { message: String },
}

impl GalleryService {
    /// Every gallery item, newest first. The whole collection is read on
    /// each call.
    pub async fn list(&self) -> GalleryResult<Vec<GalleryItem>> {
        let docs = self
            .documents
            .query_ordered(GALLERY_COLLECTION, FIELD_CREATED_AT, true)
            .await?;

        let items = docs
            .into_iter()
            .filter_map(|doc| match GalleryItem::from_document(doc) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(error = %err, "skipping malformed gallery document");
                    None
                }
            })
            .collect();
        Ok(items)
    }

    /// A single item by id.
    pub async fn find(&self, id: &str) -> GalleryResult<GalleryItem> {
        let doc = self
            .documents
            .get(GALLERY_COLLECTION, id)
            .await?
            .ok_or_else(|| GalleryError::ItemNotFound(id.to_string()))?;
        GalleryItem::from_document(doc).map_err(|err| match err {
            BackendError::InvalidField { id, .. } => GalleryError::ItemNotFound(id),
            other => GalleryError::Backend(other),
        })
    }

    /// Load and render the list. Failures are rendered, not returned.
    pub async fn render(&self) -> GalleryView {
        match self.list().await {
            Ok(items) if items.is_empty() => GalleryView::Empty {
                message: EMPTY_GALLERY.to_string(),
            },
            Ok(items) => GalleryView::Rows {
                rows: items.iter().map(GalleryRow::from).collect(),
            },
            Err(err) => GalleryView::Failed {
                message: format!("Error loading items: {}", err),
            },
        }
    }
}
