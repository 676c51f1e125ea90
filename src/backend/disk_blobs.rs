//! DiskBlobStore - blob payloads on local disk, served back over HTTP.
//!
//! Payloads live beneath `base_path/{shard}/{shard}/{path}` where the shards
//! come from MD5(path). Public URLs have the form
//! `{public_base_url}/blobs/{percent-encoded path}`, which is also how a URL
//! is mapped back to a blob when deleting.

use super::{BackendError, BackendResult, BlobApi, BlobRef};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_BLOB_PATH_LEN: usize = 1024;

/// Route prefix blobs are served under.
pub const BLOB_ROUTE_PREFIX: &str = "/blobs/";

#[derive(Clone, Debug)]
pub struct DiskBlobStore {
    /// Base directory on disk where blob payloads are stored.
    pub base_path: PathBuf,

    /// Externally reachable origin, without a trailing slash.
    pub public_base_url: String,
}

impl DiskBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reject empty, absolute, traversing or control-character paths.
    ///
    /// Dots inside a segment are fine (`boater..final.jpg`); only `.` and
    /// `..` segments, and empty ones, are refused.
    fn ensure_path_safe(path: &str) -> BackendResult<()> {
        let invalid = path.is_empty()
            || path.len() > MAX_BLOB_PATH_LEN
            || path.starts_with('/')
            || path
                .split('/')
                .any(|segment| segment.is_empty() || segment == "." || segment == "..")
            || path
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            Err(BackendError::InvalidPath(path.to_string()))
        } else {
            Ok(())
        }
    }

    /// Two-level shard directories for a blob path.
    fn shards(path: &str) -> (String, String) {
        let digest = md5::compute(path);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn file_path(&self, path: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(path);
        let mut file_path = self.base_path.clone();
        file_path.push(shard_a);
        file_path.push(shard_b);
        file_path.push(path);
        file_path
    }

    /// Map a URL issued by [`BlobApi::resolve_url`] back to its blob path.
    pub fn path_from_url(&self, url: &str) -> BackendResult<String> {
        let prefix = format!("{}{}", self.public_base_url, BLOB_ROUTE_PREFIX);
        let encoded = url
            .strip_prefix(&prefix)
            .ok_or_else(|| BackendError::UnmappedUrl(url.to_string()))?;

        let mut segments = Vec::new();
        for segment in encoded.split('/') {
            let decoded = urlencoding::decode(segment)
                .map_err(|_| BackendError::UnmappedUrl(url.to_string()))?;
            segments.push(decoded.into_owned());
        }
        let path = segments.join("/");
        Self::ensure_path_safe(&path).map_err(|_| BackendError::UnmappedUrl(url.to_string()))?;
        Ok(path)
    }

    /// Open a blob for streaming out, with its length and a content type
    /// guessed from the extension.
    pub async fn open(&self, path: &str) -> BackendResult<(File, u64, &'static str)> {
        Self::ensure_path_safe(path)?;
        let file = File::open(self.file_path(path)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                BackendError::BlobNotFound(path.to_string())
            } else {
                BackendError::Io(err)
            }
        })?;
        let len = file.metadata().await?.len();
        Ok((file, len, content_type_for(path)))
    }

    /// Remove empty shard directories up to the base path.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobApi for DiskBlobStore {
    /// Write to a temp file, fsync, then rename into place.
    async fn write(&self, path: &str, bytes: Bytes) -> BackendResult<BlobRef> {
        Self::ensure_path_safe(path)?;

        let file_path = self.file_path(path);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            BackendError::Io(io::Error::new(
                ErrorKind::Other,
                "blob path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        let written = async {
            file.write_all(&bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(BackendError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(BackendError::Io(err));
            }
        }

        debug!(path, size = bytes.len(), "stored blob");
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    async fn resolve_url(&self, blob: &BlobRef) -> BackendResult<String> {
        Self::ensure_path_safe(&blob.path)?;
        if !fs::try_exists(self.file_path(&blob.path)).await? {
            return Err(BackendError::BlobNotFound(blob.path.clone()));
        }

        let encoded = blob
            .path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!(
            "{}{}{}",
            self.public_base_url, BLOB_ROUTE_PREFIX, encoded
        ))
    }

    async fn delete_by_url(&self, url: &str) -> BackendResult<()> {
        let path = self.path_from_url(url)?;
        let file_path = self.file_path(&path);

        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed blob file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(BackendError::BlobNotFound(path));
            }
            Err(err) => return Err(BackendError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    /// Write, read back and delete a scratch file under `base_path`.
    async fn probe(&self) -> BackendResult<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;

        let read_back = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read_back? == b"readyz" {
            Ok(())
        } else {
            Err(BackendError::Io(io::Error::new(
                ErrorKind::InvalidData,
                "file content mismatch",
            )))
        }
    }
}

/// Content type from the file extension; blobs carry no other metadata.
fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
