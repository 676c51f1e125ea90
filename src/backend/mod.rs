//! Backend facade consumed by the gallery services.
//!
//! Three capabilities, each behind its own trait so the services can run
//! against the local implementations below or against in-memory fakes:
//! - [`SessionApi`]: credential sign-in, sign-out and an auth-state feed
//! - [`BlobApi`]: blob writes addressed by caller-chosen paths, plus URL issuance
//! - [`DocumentApi`]: schemaless document collections with ordered queries

pub mod disk_blobs;
pub mod local_sessions;
#[cfg(test)]
pub mod memory;
pub mod sqlite_documents;

use crate::models::session::{Session, User};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::{Map, Value};
use std::{io, sync::Mutex};
use thiserror::Error;
use tokio::sync::watch;

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Credentials refused. The message is shown to the user as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("document `{id}` not found in `{collection}`")]
    NotFound { collection: String, id: String },
    #[error("url `{0}` does not reference a stored blob")]
    UnmappedUrl(String),
    #[error("blob `{0}` not found")]
    BlobNotFound(String),
    #[error("invalid storage path `{0}`")]
    InvalidPath(String),
    #[error("invalid field name `{0}`")]
    InvalidFieldName(String),
    #[error("document `{id}` has no usable `{field}`")]
    InvalidField { id: String, field: String },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// A stored document snapshot: id plus whatever fields it carries.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Fields for a document about to be created. Names listed in
/// `server_timestamps` are filled in by the store at write time.
#[derive(Clone, Debug, Default)]
pub struct NewDocument {
    pub fields: Fields,
    pub server_timestamps: Vec<String>,
}

impl NewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn server_timestamp(mut self, name: &str) -> Self {
        self.server_timestamps.push(name.to_string());
        self
    }
}

/// Handle to a written blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    pub path: String,
}

#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Exchange credentials for a session. Refusals come back as
    /// [`BackendError::Rejected`].
    async fn sign_in(&self, identifier: &str, secret: &str) -> BackendResult<Session>;

    async fn sign_out(&self, token: &str) -> BackendResult<()>;

    async fn user_for_token(&self, token: &str) -> Option<User>;

    /// Auth-state feed. The current value is the signed-in admin, if any.
    fn on_state_change(&self) -> watch::Receiver<Option<User>>;
}

#[async_trait]
pub trait BlobApi: Send + Sync {
    /// Store `bytes` at `path`, replacing anything already there.
    async fn write(&self, path: &str, bytes: Bytes) -> BackendResult<BlobRef>;

    /// Public URL the blob can be fetched from.
    async fn resolve_url(&self, blob: &BlobRef) -> BackendResult<String>;

    /// Remove the blob a URL points at.
    async fn delete_by_url(&self, url: &str) -> BackendResult<()>;

    /// Readiness check for the underlying storage.
    async fn probe(&self) -> BackendResult<()>;
}

#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Insert a new document and return its generated id.
    async fn create(&self, collection: &str, doc: NewDocument) -> BackendResult<String>;

    /// Every document in `collection`, ordered by `sort_field`.
    async fn query_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        descending: bool,
    ) -> BackendResult<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> BackendResult<Option<Document>>;

    /// Overwrite the given top-level fields, leaving the rest untouched.
    async fn update(&self, collection: &str, id: &str, partial: Fields) -> BackendResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> BackendResult<()>;

    /// Readiness check for the underlying database.
    async fn ping(&self) -> BackendResult<()>;
}

/// Issues server timestamps that strictly increase, so two documents
/// created in the same clock tick still have a total order.
#[derive(Debug, Default)]
pub(crate) struct ServerClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ServerClock {
    pub(crate) fn next(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + TimeDelta::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }

    /// Fixed-width form so stored timestamps also sort as text.
    pub(crate) fn format(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

/// Field names are spliced into JSON paths, so keep them to identifiers.
pub(crate) fn ensure_field_name(name: &str) -> BackendResult<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(BackendError::InvalidFieldName(name.to_string()))
    }
}
