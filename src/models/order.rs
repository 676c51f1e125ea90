//! Custom hat order requests submitted from the public site.

use serde::{Deserialize, Serialize};

/// Hat styles that are fitted to an exact head size.
pub const SIZED_HAT_TYPES: [&str; 2] = ["Wide Brim", "Fedora"];

/// Reference photos larger than this are refused.
pub const MAX_REFERENCE_PHOTO_BYTES: usize = 8 * 1024 * 1024;

/// Order form as posted by the site.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub event_date: String,
    pub hat_type: String,
    pub head_size: Option<String>,
    pub colours: Option<String>,
    pub materials: Vec<String>,
    pub notes: Option<String>,
}

impl OrderRequest {
    /// Whether the chosen style needs the head size field.
    pub fn needs_head_size(&self) -> bool {
        SIZED_HAT_TYPES.contains(&self.hat_type.trim())
    }
}

/// One field that failed validation.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Result of a successfully validated order.
#[derive(Serialize, Clone, Debug)]
pub struct OrderDraft {
    /// Plain-text order summary.
    pub summary: String,

    /// `mailto:` link the browser should open.
    pub mailto: String,
}

/// A file offered as a reference photo.
#[derive(Clone, Debug)]
pub struct ReferencePhoto {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RejectedPhoto {
    pub file_name: String,
    pub reason: String,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PhotoScreening {
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedPhoto>,
}
