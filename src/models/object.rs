//! Represents the metadata row for an object stored in a bucket.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::content_type::ContentType;

/// One row of the metadata index, the source of truth for an object's
/// existence and shape. The payload bytes live in the content store; this
/// struct never carries them.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ObjectRecord {
    /// Surrogate insertion id. Strictly increasing, used only to
    /// disambiguate equal-key races; never exposed to callers.
    pub id: i64,

    /// Bucket the object lives in.
    pub bucket_name: String,

    /// Object key (path-like identifier within the bucket).
    pub object_key: String,

    /// Content type as its closed-table code (see [`ContentType`]).
    pub content_type: i64,

    /// Byte count declared by the writer; reconciled to `size` on commit.
    pub content_length: i64,

    /// Authoritative on-disk size in bytes.
    pub size: i64,

    /// Lowercase hex MD5 of the bytes currently on disk.
    pub etag: String,

    /// User metadata as a JSON object, or NULL when empty. Opaque to the
    /// engine; echoed verbatim on GET/HEAD.
    pub metadata: Option<String>,

    /// Update time, milliseconds since the Unix epoch. Display only.
    pub ut: i64,
}

impl ObjectRecord {
    /// Decoded content type. Unknown stored codes read as octet-stream.
    pub fn content_type(&self) -> ContentType {
        ContentType::from_code(self.content_type)
    }

    /// Parsed user metadata. Malformed or absent JSON reads as empty.
    pub fn user_metadata(&self) -> BTreeMap<String, String> {
        self.metadata
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or_default()
    }

    /// Update time as a UTC timestamp for header formatting.
    pub fn last_modified(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.ut)
            .single()
            .unwrap_or_else(Utc::now)
    }
}
