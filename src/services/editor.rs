//! Caption and tag edits for a single gallery item.

use super::gallery_service::{GalleryResult, GalleryService};
use crate::models::gallery_item::{GALLERY_COLLECTION, edit_fields, parse_tags};
use serde::Deserialize;
use tracing::info;

/// Current values of a row's editable inputs.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EditInput {
    #[serde(default)]
    pub caption: String,
    /// Comma-separated, as typed.
    #[serde(default)]
    pub tags: String,
}

impl GalleryService {
    /// Persist a row's caption and tags. Nothing else on the document is
    /// written.
    pub async fn save(&self, id: &str, input: &EditInput) -> GalleryResult<()> {
        let caption = input.caption.trim();
        let tags = parse_tags(&input.tags);

        self.documents
            .update(GALLERY_COLLECTION, id, edit_fields(caption, &tags))
            .await?;

        info!(id, tags = tags.len(), "gallery item saved");
        Ok(())
    }
}
