//! In-memory backends with call counting and failure injection.

use super::{
    BackendError, BackendResult, BlobApi, BlobRef, Document, DocumentApi, Fields, NewDocument,
    ServerClock,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use uuid::Uuid;

const URL_PREFIX: &str = "mem://blobs/";

#[derive(Default)]
pub struct MemoryBlobs {
    pub blobs: Mutex<HashMap<String, Bytes>>,
    pub calls: AtomicUsize,
    /// Writes to paths containing this marker fail.
    pub fail_write_containing: Mutex<Option<String>>,
    pub fail_deletes: Mutex<bool>,
}

impl MemoryBlobs {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn fail_writes_containing(&self, marker: &str) {
        *self.fail_write_containing.lock().unwrap() = Some(marker.to_string());
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }
}

#[async_trait]
impl BlobApi for MemoryBlobs {
    async fn write(&self, path: &str, bytes: Bytes) -> BackendResult<BlobRef> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = self.fail_write_containing.lock().unwrap().as_deref() {
            if path.contains(marker) {
                return Err(BackendError::Io(std::io::Error::other(format!(
                    "quota exceeded writing {path}"
                ))));
            }
        }
        self.blobs.lock().unwrap().insert(path.to_string(), bytes);
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn resolve_url(&self, blob: &BlobRef) -> BackendResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{URL_PREFIX}{}", blob.path))
    }

    async fn delete_by_url(&self, url: &str) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = url
            .strip_prefix(URL_PREFIX)
            .ok_or_else(|| BackendError::UnmappedUrl(url.to_string()))?;
        if *self.fail_deletes.lock().unwrap() {
            return Err(BackendError::Io(std::io::Error::other("storage unavailable")));
        }
        self.blobs
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BackendError::BlobNotFound(path.to_string()))
    }

    async fn probe(&self) -> BackendResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDocuments {
    pub docs: Mutex<Vec<(String, Document)>>,
    pub calls: AtomicUsize,
    pub fail_queries: Mutex<bool>,
    clock: ServerClock,
}

impl MemoryDocuments {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn fail_queries(&self) {
        *self.fail_queries.lock().unwrap() = true;
    }

    /// Insert a document verbatim, bypassing validation.
    pub fn insert_raw(&self, collection: &str, id: &str, fields: Value) {
        self.docs.lock().unwrap().push((
            collection.to_string(),
            Document {
                id: id.to_string(),
                fields: fields.as_object().cloned().unwrap_or_default(),
            },
        ));
    }
}

#[async_trait]
impl DocumentApi for MemoryDocuments {
    async fn create(&self, collection: &str, doc: NewDocument) -> BackendResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut fields = doc.fields;
        let stamp = ServerClock::format(self.clock.next());
        for name in doc.server_timestamps {
            fields.insert(name, Value::String(stamp.clone()));
        }
        let id = Uuid::new_v4().simple().to_string();
        self.docs.lock().unwrap().push((
            collection.to_string(),
            Document {
                id: id.clone(),
                fields,
            },
        ));
        Ok(id)
    }

    async fn query_ordered(
        &self,
        collection: &str,
        sort_field: &str,
        descending: bool,
    ) -> BackendResult<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_queries.lock().unwrap() {
            return Err(BackendError::Io(std::io::Error::other(
                "Missing or insufficient permissions.",
            )));
        }
        let mut docs: Vec<Document> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, d)| d.clone())
            .collect();
        docs.sort_by(|a, b| {
            let ka = a.fields.get(sort_field).and_then(Value::as_str).unwrap_or("");
            let kb = b.fields.get(sort_field).and_then(Value::as_str).unwrap_or("");
            ka.cmp(kb)
        });
        if descending {
            docs.reverse();
        }
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> BackendResult<Option<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|(c, d)| c == collection && d.id == id)
            .map(|(_, d)| d.clone()))
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .iter_mut()
            .find(|(c, d)| c == collection && d.id == id)
            .ok_or_else(|| BackendError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.1.fields.extend(partial);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        let before = docs.len();
        docs.retain(|(c, d)| !(c == collection && d.id == id));
        if docs.len() == before {
            return Err(BackendError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> BackendResult<()> {
        Ok(())
    }
}
