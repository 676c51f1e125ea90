//! Represents one photo in the public gallery.

use crate::backend::{BackendError, BackendResult, Document, Fields};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Collection holding one document per uploaded image.
pub const GALLERY_COLLECTION: &str = "gallery";

pub const FIELD_URL: &str = "url";
pub const FIELD_CAPTION: &str = "caption";
pub const FIELD_TAGS: &str = "tags";
pub const FIELD_CREATED_AT: &str = "createdAt";

/// A gallery entry as stored in the document collection.
///
/// The backing blob is linked only by `url`; nothing on the storage side
/// enforces that the blob still exists.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GalleryItem {
    /// Document id assigned by the store on creation.
    pub id: String,

    /// Public location of the image blob. Never changes after creation.
    pub url: String,

    /// Free-text caption, possibly empty.
    pub caption: String,

    /// Tags in the order they were typed. Duplicates are kept.
    pub tags: Vec<String>,

    /// Server-assigned creation time, the only sort key.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    /// Validate a raw document snapshot.
    ///
    /// Missing or mistyped `caption` and `tags` fall back to empty values.
    /// A document without a string `url` or a parseable `createdAt` is
    /// rejected since it cannot be rendered or ordered.
    pub fn from_document(doc: Document) -> BackendResult<Self> {
        let Document { id, fields } = doc;

        let url = match fields.get(FIELD_URL) {
            Some(Value::String(url)) if !url.is_empty() => url.clone(),
            _ => {
                return Err(BackendError::InvalidField {
                    id,
                    field: FIELD_URL.into(),
                });
            }
        };

        let created_at = match fields.get(FIELD_CREATED_AT).and_then(Value::as_str) {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(_) => {
                    return Err(BackendError::InvalidField {
                        id,
                        field: FIELD_CREATED_AT.into(),
                    });
                }
            },
            None => {
                return Err(BackendError::InvalidField {
                    id,
                    field: FIELD_CREATED_AT.into(),
                });
            }
        };

        let caption = fields
            .get(FIELD_CAPTION)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tags = match fields.get(FIELD_TAGS) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            id,
            url,
            caption,
            tags,
            created_at,
        })
    }
}

/// Fields touched by an edit. `url` and `createdAt` are deliberately absent.
pub fn edit_fields(caption: &str, tags: &[String]) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_CAPTION.into(), Value::String(caption.to_string()));
    fields.insert(
        FIELD_TAGS.into(),
        Value::Array(tags.iter().cloned().map(Value::String).collect()),
    );
    fields
}

/// Split comma-separated tag input: trim each entry, drop empties,
/// keep order and duplicates.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render tags back into the editable comma-separated form.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}
