//! Bucket-name and object-key validation.
//!
//! Both stores address objects by (bucket, key), and the content store turns
//! that pair into a filesystem path. Validation runs before any mutation so
//! a hostile key can never reach either store.

use crate::services::{StorageError, StorageResult};

pub const MAX_BUCKET_NAME_LEN: usize = 255;
/// Matches the metadata column width.
pub const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Validate a bucket name: 1–255 characters from `[A-Za-z0-9._-]`.
pub fn ensure_bucket_name_safe(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.len() > MAX_BUCKET_NAME_LEN {
        return Err(StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: "must be between 1 and 255 characters".into(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
    {
        return Err(StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: "allowed characters are letters, digits, hyphens, dots, and underscores"
                .into(),
        });
    }
    // "." and ".." are valid by charset but resolve outside the storage root
    if name.bytes().all(|b| b == b'.') {
        return Err(StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: "must contain a character other than dots".into(),
        });
    }
    Ok(())
}

/// Validate an object key.
///
/// Keys may contain `/` and map to nested directories under the bucket root.
/// Rejected: empty keys, keys over 1024 bytes, absolute paths, `.` or `..`
/// path segments, empty segments (`a//b` would collide with `a/b` on disk),
/// control characters, backslashes and NUL.
pub fn ensure_key_safe(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
        return Err(StorageError::InvalidObjectKey);
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
    {
        return Err(StorageError::InvalidObjectKey);
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidObjectKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_bucket_names() {
        for name in ["b", "my-bucket", "My_Bucket.2024", "a".repeat(255).as_str()] {
            assert!(ensure_bucket_name_safe(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_bucket_names() {
        for name in ["", "has space", "slash/inside", ".", "..", "a".repeat(256).as_str()] {
            assert!(ensure_bucket_name_safe(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn accepts_nested_keys() {
        for key in ["file.txt", "photos/2025/img.jpg", "a..b", "deep/é/utf8"] {
            assert!(ensure_key_safe(key).is_ok(), "{key}");
        }
    }

    #[test]
    fn rejects_traversal_and_malformed_keys() {
        for key in [
            "",
            "/absolute",
            "../escape",
            "a/../b",
            "a/..",
            "a//b",
            "trailing/",
            ".",
            "a/./b",
            "back\\slash",
            "nul\0byte",
        ] {
            assert!(
                matches!(ensure_key_safe(key), Err(StorageError::InvalidObjectKey)),
                "{key:?}"
            );
        }
        assert!(ensure_key_safe(&"k".repeat(1025)).is_err());
        assert!(ensure_key_safe(&"k".repeat(1024)).is_ok());
    }
}
