//! Durable byte storage on the local filesystem.
//!
//! One regular file per object at `{root}/{bucket}/{key}`; slashes in the
//! key become directories, created on demand. Writes stream into a hidden
//! temporary file in the destination directory and become visible only
//! through a rename, so readers never observe a partially written object.
//! The MD5 digest is fed in the same pass as the bytes are written.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use crate::services::checksum::StreamingChecksum;
use crate::services::{StorageError, StorageResult};

/// Filesystem-backed content store rooted at `base_path`.
#[derive(Clone, Debug)]
pub struct ContentStore {
    base_path: PathBuf,
}

impl ContentStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.base_path.join(bucket)
    }

    /// Final path of an object's content file. Key validation guarantees
    /// every component stays below the bucket root.
    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.bucket_root(bucket);
        for component in key.split('/') {
            path.push(component);
        }
        path
    }

    /// Stream `stream` into the object's final path with atomic publish.
    ///
    /// Bytes land in a `.tmp-*` file next to the destination and are hashed
    /// as they are written; `flush` + `sync_all` precede the rename. On any
    /// failure the temporary file is removed and the final path is left
    /// untouched. Returns the byte count and the lowercase hex MD5 ETag.
    pub async fn write<S>(&self, bucket: &str, key: &str, stream: S) -> StorageResult<(i64, String)>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let file_path = self.object_path(bucket, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::InvalidInput,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size: i64 = 0;
        let mut digest = StreamingChecksum::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Io(err));
                }
            };
            size += chunk.len() as i64;
            digest.update(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }

        Ok((size, digest.finalize()))
    }

    /// Open the object's content for streaming out. Absence is reported as
    /// `ObjectNotFound`, never as a generic I/O error.
    pub async fn open_reader(&self, bucket: &str, key: &str) -> StorageResult<File> {
        File::open(self.object_path(bucket, key))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StorageError::ObjectNotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Io(err)
                }
            })
    }

    /// Remove the object's content file. Idempotent: a missing file is not
    /// an error. Returns whether a file was actually removed. Empty parent
    /// directories are pruned up to the bucket root.
    pub async fn remove(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let file_path = self.object_path(bucket, key);
        let removed = match fs::remove_file(&file_path).await {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(StorageError::Io(err)),
        };

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(bucket);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        Ok(removed)
    }

    /// Copy source bytes to the destination through the same atomic write
    /// path. Same-key copies are safe: the destination is materialized in a
    /// new temporary file before any replace, so the source is never
    /// clobbered while it is being read.
    pub async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StorageResult<(i64, String)> {
        let source = self.open_reader(src_bucket, src_key).await?;
        self.write(dst_bucket, dst_key, ReaderStream::new(source))
            .await
    }

    /// Remove empty directories from `start` up to (not including) `stop`.
    /// Stops at the first non-empty or missing directory.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(()) => {
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
