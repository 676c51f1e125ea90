//! Core data models for the gallery admin service.
//!
//! Gallery items are validated out of loosely-shaped documents at the
//! backend boundary; sessions and orders are plain request/response types
//! serialized with `serde`.

pub mod gallery_item;
pub mod order;
pub mod session;
