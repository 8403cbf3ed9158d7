//! StorageService — the object storage engine.
//!
//! Composes the key codec, content store, checksum engine and metadata
//! index into the S3-shaped operations (Put, Get, Head, Delete, Copy,
//! List). Owns the per-key mutation locks and the two-store consistency
//! protocol: content is published first, the metadata row is committed
//! second, so any reader that sees the row is guaranteed the bytes are
//! already durable.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use sqlx::SqlitePool;
use tokio::fs::File;
use tracing::{debug, error, warn};

use crate::models::content_type::ContentType;
use crate::models::object::ObjectRecord;
use crate::services::content_store::ContentStore;
use crate::services::key_locks::KeyLockMap;
use crate::services::keys;
use crate::services::metadata_index::{MetadataIndex, ObjectUpsert};
use crate::services::{StorageError, StorageResult};

/// Hard page-size ceiling for ListObjectsV2; larger requests are clamped.
pub const MAX_KEYS_LIMIT: i64 = 1000;

/// Default presigned URL expiry (seconds). Presigned URLs are unsupported
/// on local storage; the bound exists so bad requests are still rejected
/// as the client's fault rather than the deployment's.
pub const DEFAULT_PRESIGNED_URL_EXPIRES_IN: u64 = 3600;
/// Maximum presigned URL expiry (seconds): 7 days.
pub const MAX_PRESIGNED_URL_EXPIRES_IN: u64 = 604_800;

/// Metadata handling policy for Copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataDirective {
    /// Destination inherits the source's content type and user metadata.
    Copy,
    /// Destination uses only the caller-supplied metadata, no merge.
    Replace,
}

impl MetadataDirective {
    /// Parse the `x-amz-metadata-directive` header value. Anything other
    /// than REPLACE (case-insensitive) is treated as COPY.
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("REPLACE") => Self::Replace,
            _ => Self::Copy,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ListObjectsParams {
    pub prefix: Option<String>,
    pub continuation_token: Option<String>,
    pub max_keys: i64,
}

#[derive(Debug)]
pub struct ListObjectsResult {
    pub objects: Vec<ObjectRecord>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
    pub key_count: usize,
}

/// The object storage engine.
///
/// Cheap to clone; all clones share the same pool, lock table and root.
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite pool, also probed directly by the readiness handler.
    pub db: Arc<SqlitePool>,

    index: MetadataIndex,
    store: ContentStore,
    locks: Arc<KeyLockMap>,
}

impl StorageService {
    /// Create an engine backed by the given SQLite pool and content root.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            index: MetadataIndex::new(db.clone()),
            store: ContentStore::new(base_path),
            locks: Arc::new(KeyLockMap::new()),
            db,
        }
    }

    /// Root directory of the content store.
    pub fn base_path(&self) -> &Path {
        self.store.base_path()
    }

    /// Stream-upload an object: bytes go through the content store's
    /// atomic write (hashed in the same pass), then the metadata row is
    /// committed. Mutations to the same key are serialized on its lock.
    pub async fn put_object_stream<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        user_metadata: Option<BTreeMap<String, String>>,
        stream: S,
    ) -> StorageResult<ObjectRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        keys::ensure_bucket_name_safe(bucket)?;
        keys::ensure_key_safe(key)?;

        let _guard = self.locks.acquire(bucket, key).await;
        let (size, etag) = self.store.write(bucket, key, stream).await?;

        let content_type = content_type
            .map(ContentType::from_mime)
            .unwrap_or(ContentType::OctetStream);
        let metadata_json = encode_user_metadata(user_metadata.as_ref());
        let record = self
            .commit_metadata(ObjectUpsert {
                bucket_name: bucket,
                object_key: key,
                content_type: content_type.code(),
                content_length: size,
                size,
                etag: &etag,
                metadata: metadata_json.as_deref(),
                ut: Utc::now().timestamp_millis(),
            })
            .await?;

        debug!(bucket, key, size, %etag, "stored object");
        Ok(record)
    }

    /// Fetch an object for reading: the metadata row first, then an opened
    /// handle on the content file. A row without a content file is a
    /// consistency violation, surfaced as an internal error — never as
    /// absence, which would mask data loss.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(ObjectRecord, File)> {
        let record = self.get_object_metadata(bucket, key).await?;

        match self.store.open_reader(bucket, key).await {
            Ok(file) => Ok((record, file)),
            Err(StorageError::ObjectNotFound { .. }) => {
                error!(
                    bucket,
                    key, "metadata row exists but content file is missing"
                );
                Err(StorageError::ConsistencyViolation {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch only object metadata (the HEAD lookup).
    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<ObjectRecord> {
        keys::ensure_bucket_name_safe(bucket)?;
        keys::ensure_key_safe(key)?;

        self.index
            .fetch(bucket, key)
            .await?
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    /// Delete an object. Deleting an absent key is success, per S3
    /// semantics. The metadata row is removed first; if the content file
    /// cannot be removed afterwards the key already reads as absent, so
    /// the leak is logged for out-of-band cleanup rather than surfaced.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        keys::ensure_bucket_name_safe(bucket)?;
        keys::ensure_key_safe(key)?;

        let _guard = self.locks.acquire(bucket, key).await;
        let removed_row = self.index.delete(bucket, key).await?;

        match self.store.remove(bucket, key).await {
            Ok(removed_file) => {
                debug!(bucket, key, removed_row, removed_file, "deleted object");
            }
            Err(err) => {
                warn!(
                    bucket,
                    key,
                    %err,
                    "content file removal failed after metadata delete; orphan candidate"
                );
            }
        }

        Ok(())
    }

    /// Copy an object. The destination key's lock is held for the content
    /// copy and metadata commit; the source is read without a lock, so a
    /// concurrent delete of the source either loses (the bytes were read)
    /// or wins (`ObjectNotFound`) — both outcomes leave the destination
    /// uncorrupted. The destination ETag is recomputed from the copied
    /// bytes, never taken from the source row.
    pub async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        directive: MetadataDirective,
        new_content_type: Option<&str>,
        new_metadata: Option<BTreeMap<String, String>>,
    ) -> StorageResult<ObjectRecord> {
        keys::ensure_bucket_name_safe(src_bucket)?;
        keys::ensure_key_safe(src_key)?;
        keys::ensure_bucket_name_safe(dst_bucket)?;
        keys::ensure_key_safe(dst_key)?;

        let source = self.get_object_metadata(src_bucket, src_key).await?;

        let (content_type_code, metadata_json) = match directive {
            MetadataDirective::Copy => (source.content_type, source.metadata.clone()),
            MetadataDirective::Replace => (
                new_content_type
                    .map(ContentType::from_mime)
                    .unwrap_or(ContentType::OctetStream)
                    .code(),
                encode_user_metadata(new_metadata.as_ref()),
            ),
        };

        let _guard = self.locks.acquire(dst_bucket, dst_key).await;
        let (size, etag) = self
            .store
            .copy(src_bucket, src_key, dst_bucket, dst_key)
            .await?;

        let record = self
            .commit_metadata(ObjectUpsert {
                bucket_name: dst_bucket,
                object_key: dst_key,
                content_type: content_type_code,
                content_length: size,
                size,
                etag: &etag,
                metadata: metadata_json.as_deref(),
                ut: Utc::now().timestamp_millis(),
            })
            .await?;

        debug!(
            src_bucket,
            src_key, dst_bucket, dst_key, size, "copied object"
        );
        Ok(record)
    }

    /// List objects following S3 ListObjectsV2 rules: byte-lexicographic
    /// key order, prefix filtering, cursor pagination. The continuation
    /// token is the last returned key; the next page starts strictly after
    /// it, which keeps pages stable under concurrent mutation except for
    /// the boundary key itself. Listing an unknown or empty bucket yields
    /// an empty page.
    pub async fn list_objects_v2(
        &self,
        bucket: &str,
        params: ListObjectsParams,
    ) -> StorageResult<ListObjectsResult> {
        keys::ensure_bucket_name_safe(bucket)?;
        if params.max_keys < 1 {
            return Err(StorageError::InvalidArgument(
                "max-keys must be a positive integer".into(),
            ));
        }
        let max_keys = params.max_keys.min(MAX_KEYS_LIMIT);
        let fetch_limit = max_keys + 1;

        let mut rows = self
            .index
            .list_page(
                bucket,
                params.prefix.as_deref(),
                params.continuation_token.as_deref(),
                fetch_limit,
            )
            .await?;

        let mut is_truncated = false;
        let mut next_continuation_token = None;
        if rows.len() as i64 == fetch_limit {
            // Drop the probe row; the token is the last key actually returned.
            rows.pop();
            is_truncated = true;
            next_continuation_token = rows.last().map(|row| row.object_key.clone());
        }

        let key_count = rows.len();
        Ok(ListObjectsResult {
            objects: rows,
            is_truncated,
            next_continuation_token,
            key_count,
        })
    }

    /// Presigned URL generation is intentionally unsupported on local
    /// storage: after input validation this always fails with the
    /// configuration-error kind, so callers can tell "not applicable to
    /// this deployment" apart from "something broke".
    pub fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        client_method: &str,
        expires_in: Option<u64>,
    ) -> StorageResult<String> {
        keys::ensure_bucket_name_safe(bucket)?;
        keys::ensure_key_safe(key)?;
        if !matches!(client_method, "get_object" | "put_object" | "delete_object") {
            return Err(StorageError::InvalidArgument(format!(
                "unknown client method `{client_method}`"
            )));
        }
        let expires_in = expires_in.unwrap_or(DEFAULT_PRESIGNED_URL_EXPIRES_IN);
        if expires_in == 0 || expires_in > MAX_PRESIGNED_URL_EXPIRES_IN {
            return Err(StorageError::InvalidArgument(format!(
                "expires_in must be between 1 and {MAX_PRESIGNED_URL_EXPIRES_IN} seconds"
            )));
        }

        Err(StorageError::ConfigurationError(
            "presigned URLs are not supported by local object storage".into(),
        ))
    }

    /// Commit the metadata row for already-published content. The content
    /// is durable at this point, so a failed commit is retried once; if
    /// the retry fails too, both the published file and any stale row are
    /// removed so the key reads as fully absent.
    async fn commit_metadata(&self, object: ObjectUpsert<'_>) -> StorageResult<ObjectRecord> {
        let first = match self.index.upsert(object.clone()).await {
            Ok(record) => return Ok(record),
            Err(err) => err,
        };
        warn!(
            bucket = object.bucket_name,
            key = object.object_key,
            %first,
            "metadata commit failed; retrying"
        );

        match self.index.upsert(object.clone()).await {
            Ok(record) => Ok(record),
            Err(err) => {
                error!(
                    bucket = object.bucket_name,
                    key = object.object_key,
                    %err,
                    "metadata commit failed twice; rolling back published content"
                );
                if let Err(cleanup) = self.index.delete(object.bucket_name, object.object_key).await
                {
                    warn!(%cleanup, "stale metadata row cleanup failed");
                }
                if let Err(cleanup) = self.store.remove(object.bucket_name, object.object_key).await
                {
                    warn!(%cleanup, "published content cleanup failed");
                }
                Err(err)
            }
        }
    }
}

/// Serialize user metadata to its stored JSON form; empty maps store NULL.
fn encode_user_metadata(map: Option<&BTreeMap<String, String>>) -> Option<String> {
    match map {
        Some(map) if !map.is_empty() => serde_json::to_string(map).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::services::checksum::md5_hex;

    async fn test_service() -> (StorageService, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        for statement in include_str!("../../migrations/0001_init.sql")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement).execute(&db).await.unwrap();
        }
        let service = StorageService::new(Arc::new(db), tmp.path().join("objects"));
        (service, tmp)
    }

    fn body(data: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::iter(vec![Ok(Bytes::from_static(data))])
    }

    fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn read_all(mut file: File) -> Vec<u8> {
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn put_then_get_round_trips_bytes_and_metadata() {
        let (service, _tmp) = test_service().await;

        let stored = service
            .put_object_stream(
                "bucket",
                "docs/readme.txt",
                Some("text/plain"),
                Some(meta(&[("author", "alice"), ("rev", "7")])),
                body(b"round trip"),
            )
            .await
            .unwrap();
        assert_eq!(stored.size, 10);
        assert_eq!(stored.content_length, stored.size);
        assert_eq!(stored.content_type(), ContentType::TextPlain);

        let (record, file) = service
            .get_object_reader("bucket", "docs/readme.txt")
            .await
            .unwrap();
        assert_eq!(read_all(file).await, b"round trip");
        assert_eq!(record.etag, md5_hex(b"round trip"));
        assert_eq!(
            record.user_metadata(),
            meta(&[("author", "alice"), ("rev", "7")])
        );
    }

    #[tokio::test]
    async fn etag_is_md5_of_retrievable_bytes_including_empty() {
        let (service, _tmp) = test_service().await;

        let empty = service
            .put_object_stream("bucket", "empty", None, None, body(b""))
            .await
            .unwrap();
        assert_eq!(empty.etag, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(empty.size, 0);

        let head = service.get_object_metadata("bucket", "empty").await.unwrap();
        assert_eq!(head.etag, empty.etag);
    }

    #[tokio::test]
    async fn unknown_content_type_stores_octet_stream() {
        let (service, _tmp) = test_service().await;

        let stored = service
            .put_object_stream("bucket", "blob", Some("application/x-nonsense"), None, body(b"x"))
            .await
            .unwrap();
        assert_eq!(stored.content_type(), ContentType::OctetStream);
    }

    #[tokio::test]
    async fn overwrite_fully_replaces_metadata_and_content() {
        let (service, _tmp) = test_service().await;

        service
            .put_object_stream(
                "bucket",
                "key",
                Some("text/plain"),
                Some(meta(&[("old", "meta")])),
                body(b"version one"),
            )
            .await
            .unwrap();
        let replaced = service
            .put_object_stream("bucket", "key", Some("application/json"), None, body(b"{}"))
            .await
            .unwrap();

        assert_eq!(replaced.content_type(), ContentType::ApplicationJson);
        assert!(replaced.user_metadata().is_empty());

        let (record, file) = service.get_object_reader("bucket", "key").await.unwrap();
        assert_eq!(read_all(file).await, b"{}");
        assert_eq!(record.etag, md5_hex(b"{}"));
    }

    #[tokio::test]
    async fn get_of_absent_key_is_not_found() {
        let (service, _tmp) = test_service().await;
        assert!(matches!(
            service.get_object_reader("bucket", "ghost").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            service.get_object_metadata("bucket", "ghost").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn missing_content_behind_metadata_is_a_consistency_violation() {
        let (service, _tmp) = test_service().await;

        service
            .put_object_stream("bucket", "damaged", None, None, body(b"bytes"))
            .await
            .unwrap();
        tokio::fs::remove_file(service.base_path().join("bucket").join("damaged"))
            .await
            .unwrap();

        assert!(matches!(
            service.get_object_reader("bucket", "damaged").await,
            Err(StorageError::ConsistencyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_absent_delete_succeeds() {
        let (service, _tmp) = test_service().await;

        service.delete_object("bucket", "never-existed").await.unwrap();
        service.delete_object("bucket", "never-existed").await.unwrap();

        service
            .put_object_stream("bucket", "doomed", None, None, body(b"x"))
            .await
            .unwrap();
        service.delete_object("bucket", "doomed").await.unwrap();
        assert!(matches!(
            service.get_object_metadata("bucket", "doomed").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        service.delete_object("bucket", "doomed").await.unwrap();
    }

    #[tokio::test]
    async fn interrupted_upload_leaves_key_absent() {
        let (service, _tmp) = test_service().await;

        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "client disconnected",
            )),
        ]);
        assert!(
            service
                .put_object_stream("bucket", "torn", None, None, broken)
                .await
                .is_err()
        );

        assert!(matches!(
            service.get_object_metadata("bucket", "torn").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn traversal_keys_never_reach_the_stores() {
        let (service, tmp) = test_service().await;

        for key in ["../escape", "/etc/passwd", "a/../b"] {
            assert!(matches!(
                service
                    .put_object_stream("bucket", key, None, None, body(b"x"))
                    .await,
                Err(StorageError::InvalidObjectKey)
            ));
        }
        // Nothing was written anywhere under the root.
        assert!(!tmp.path().join("objects").exists());
    }

    #[tokio::test]
    async fn copy_directive_copy_inherits_metadata_verbatim() {
        let (service, _tmp) = test_service().await;

        service
            .put_object_stream(
                "bucket",
                "src",
                Some("text/plain"),
                Some(meta(&[("k", "v")])),
                body(b"copy me"),
            )
            .await
            .unwrap();

        let copied = service
            .copy_object(
                "bucket",
                "src",
                "bucket",
                "dst",
                MetadataDirective::Copy,
                Some("application/json"),
                Some(meta(&[("ignored", "yes")])),
            )
            .await
            .unwrap();

        assert_eq!(copied.content_type(), ContentType::TextPlain);
        assert_eq!(copied.user_metadata(), meta(&[("k", "v")]));
        assert_eq!(copied.etag, md5_hex(b"copy me"));

        let (_, file) = service.get_object_reader("bucket", "dst").await.unwrap();
        assert_eq!(read_all(file).await, b"copy me");
        // Source is untouched.
        let (_, file) = service.get_object_reader("bucket", "src").await.unwrap();
        assert_eq!(read_all(file).await, b"copy me");
    }

    #[tokio::test]
    async fn copy_directive_replace_uses_only_new_metadata() {
        let (service, _tmp) = test_service().await;

        service
            .put_object_stream(
                "bucket",
                "src",
                Some("text/plain"),
                Some(meta(&[("k", "v")])),
                body(b"payload"),
            )
            .await
            .unwrap();

        let copied = service
            .copy_object(
                "bucket",
                "src",
                "bucket",
                "dst",
                MetadataDirective::Replace,
                Some("application/json"),
                Some(meta(&[("k2", "v2")])),
            )
            .await
            .unwrap();

        assert_eq!(copied.content_type(), ContentType::ApplicationJson);
        assert_eq!(copied.user_metadata(), meta(&[("k2", "v2")]));
    }

    #[tokio::test]
    async fn same_key_replace_copy_updates_metadata_without_changing_bytes() {
        let (service, _tmp) = test_service().await;

        let original = service
            .put_object_stream(
                "bucket",
                "key",
                Some("text/plain"),
                Some(meta(&[("old", "1")])),
                body(b"stable bytes"),
            )
            .await
            .unwrap();

        let updated = service
            .copy_object(
                "bucket",
                "key",
                "bucket",
                "key",
                MetadataDirective::Replace,
                Some("text/html"),
                Some(meta(&[("new", "2")])),
            )
            .await
            .unwrap();

        assert_eq!(updated.etag, original.etag);
        assert_eq!(updated.content_type(), ContentType::TextHtml);
        assert_eq!(updated.user_metadata(), meta(&[("new", "2")]));

        let (_, file) = service.get_object_reader("bucket", "key").await.unwrap();
        assert_eq!(read_all(file).await, b"stable bytes");
    }

    #[tokio::test]
    async fn copy_of_absent_source_is_not_found() {
        let (service, _tmp) = test_service().await;
        assert!(matches!(
            service
                .copy_object(
                    "bucket",
                    "ghost",
                    "bucket",
                    "dst",
                    MetadataDirective::Copy,
                    None,
                    None,
                )
                .await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn listing_is_ordered_filtered_and_paginated() {
        let (service, _tmp) = test_service().await;
        for key in ["b/1", "a/2", "a/1"] {
            service
                .put_object_stream("bucket", key, None, None, body(b"x"))
                .await
                .unwrap();
        }

        let all = service
            .list_objects_v2(
                "bucket",
                ListObjectsParams {
                    prefix: Some("a/".into()),
                    continuation_token: None,
                    max_keys: 1000,
                },
            )
            .await
            .unwrap();
        let keys: Vec<_> = all.objects.iter().map(|o| o.object_key.as_str()).collect();
        assert_eq!(keys, ["a/1", "a/2"]);
        assert!(!all.is_truncated);
        assert!(all.next_continuation_token.is_none());

        // Page size one: a/1, then a/2 via the token, then done.
        let first = service
            .list_objects_v2(
                "bucket",
                ListObjectsParams {
                    prefix: Some("a/".into()),
                    continuation_token: None,
                    max_keys: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(first.objects[0].object_key, "a/1");
        assert!(first.is_truncated);
        let token = first.next_continuation_token.clone().unwrap();
        assert_eq!(token, "a/1");

        let second = service
            .list_objects_v2(
                "bucket",
                ListObjectsParams {
                    prefix: Some("a/".into()),
                    continuation_token: Some(token),
                    max_keys: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(second.objects[0].object_key, "a/2");
        assert!(!second.is_truncated);
        assert!(second.next_continuation_token.is_none());
        assert_eq!(second.key_count, 1);
    }

    #[tokio::test]
    async fn listing_unknown_bucket_is_empty_not_an_error() {
        let (service, _tmp) = test_service().await;
        let result = service
            .list_objects_v2(
                "no-such-bucket",
                ListObjectsParams {
                    prefix: None,
                    continuation_token: None,
                    max_keys: 10,
                },
            )
            .await
            .unwrap();
        assert!(result.objects.is_empty());
        assert!(!result.is_truncated);
    }

    #[tokio::test]
    async fn non_positive_max_keys_is_rejected() {
        let (service, _tmp) = test_service().await;
        for max_keys in [0, -5] {
            assert!(matches!(
                service
                    .list_objects_v2(
                        "bucket",
                        ListObjectsParams {
                            prefix: None,
                            continuation_token: None,
                            max_keys,
                        },
                    )
                    .await,
                Err(StorageError::InvalidArgument(_))
            ));
        }
    }

    #[tokio::test]
    async fn concurrent_same_key_puts_leave_one_consistent_object() {
        let (service, _tmp) = test_service().await;

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let data = Bytes::from(vec![i; 256]);
                let stream = stream::iter(vec![Ok(data)]);
                service
                    .put_object_stream("bucket", "contended", None, None, stream)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let (record, file) = service
            .get_object_reader("bucket", "contended")
            .await
            .unwrap();
        let bytes = read_all(file).await;
        assert_eq!(record.size as usize, bytes.len());
        assert_eq!(record.etag, md5_hex(&bytes));
    }

    #[tokio::test]
    async fn presigned_urls_fail_with_configuration_error() {
        let (service, _tmp) = test_service().await;

        assert!(matches!(
            service.presigned_url("bucket", "key", "get_object", None),
            Err(StorageError::ConfigurationError(_))
        ));
        // Bad inputs are still the client's fault, not the deployment's.
        assert!(matches!(
            service.presigned_url("bucket", "key", "list_objects", None),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.presigned_url("bucket", "key", "put_object", Some(0)),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            service.presigned_url("bucket", "key", "put_object", Some(605_000)),
            Err(StorageError::InvalidArgument(_))
        ));
    }
}
