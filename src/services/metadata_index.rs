//! SQLite-backed metadata index.
//!
//! A single `objects` table keyed by (bucket_name, object_key) is the source
//! of truth for object existence. The content store is never consulted for
//! existence checks; readers go there only after a row confirms the object.

use std::sync::Arc;

use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqlitePool};

use crate::models::object::ObjectRecord;
use crate::services::StorageResult;

const COLUMNS: &str =
    "id, bucket_name, object_key, content_type, content_length, size, etag, metadata, ut";

/// Field set for an insert-or-replace of one object row.
#[derive(Debug, Clone)]
pub struct ObjectUpsert<'a> {
    pub bucket_name: &'a str,
    pub object_key: &'a str,
    pub content_type: i64,
    pub content_length: i64,
    pub size: i64,
    pub etag: &'a str,
    pub metadata: Option<&'a str>,
    pub ut: i64,
}

/// Handle to the metadata table.
#[derive(Clone)]
pub struct MetadataIndex {
    db: Arc<SqlitePool>,
}

impl MetadataIndex {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Fetch one object row, or None when the key is absent.
    pub async fn fetch(&self, bucket: &str, key: &str) -> StorageResult<Option<ObjectRecord>> {
        let row = sqlx::query_as::<_, ObjectRecord>(&format!(
            "SELECT {COLUMNS} FROM objects WHERE bucket_name = ? AND object_key = ?"
        ))
        .bind(bucket)
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Insert a new row or fully replace the existing one for the key.
    /// Returns the stored row.
    pub async fn upsert(&self, object: ObjectUpsert<'_>) -> StorageResult<ObjectRecord> {
        let row = sqlx::query_as::<_, ObjectRecord>(&format!(
            r#"
            INSERT INTO objects (
                bucket_name, object_key, content_type, content_length,
                size, etag, metadata, ut
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket_name, object_key) DO UPDATE SET
                content_type = excluded.content_type,
                content_length = excluded.content_length,
                size = excluded.size,
                etag = excluded.etag,
                metadata = excluded.metadata,
                ut = excluded.ut
            RETURNING {COLUMNS}
            "#
        ))
        .bind(object.bucket_name)
        .bind(object.object_key)
        .bind(object.content_type)
        .bind(object.content_length)
        .bind(object.size)
        .bind(object.etag)
        .bind(object.metadata)
        .bind(object.ut)
        .fetch_one(&*self.db)
        .await?;
        Ok(row)
    }

    /// Remove the row for (bucket, key). Returns whether a row existed.
    pub async fn delete(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM objects WHERE bucket_name = ? AND object_key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of keys in byte-lexicographic order: rows matching the
    /// prefix, strictly after `start_after` when given, at most `limit`.
    pub async fn list_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        start_after: Option<&str>,
        limit: i64,
    ) -> StorageResult<Vec<ObjectRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {COLUMNS} FROM objects WHERE bucket_name = "
        ));
        builder.push_bind(bucket);

        if let Some(prefix) = prefix {
            builder.push(" AND object_key LIKE ");
            builder.push_bind(format!("{}%", escape_like(prefix)));
            builder.push(" ESCAPE '\\'");
        }

        if let Some(after) = start_after {
            builder.push(" AND object_key > ");
            builder.push_bind(after);
        }

        builder.push(" ORDER BY object_key ASC LIMIT ");
        builder.push_bind(limit);

        let rows = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(rows)
    }
}

/// Escape LIKE metacharacters so a prefix matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn test_index() -> MetadataIndex {
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
        MetadataIndex::new(Arc::new(db))
    }

    fn upsert_for<'a>(key: &'a str, etag: &'a str) -> ObjectUpsert<'a> {
        ObjectUpsert {
            bucket_name: "bucket",
            object_key: key,
            content_type: 1,
            content_length: 3,
            size: 3,
            etag,
            metadata: None,
            ut: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let index = test_index().await;

        let first = index.upsert(upsert_for("key", "aaa")).await.unwrap();
        let second = index.upsert(upsert_for("key", "bbb")).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.etag, "bbb");

        let fetched = index.fetch("bucket", "key").await.unwrap().unwrap();
        assert_eq!(fetched.etag, "bbb");
    }

    #[tokio::test]
    async fn surrogate_ids_increase_across_keys() {
        let index = test_index().await;

        let a = index.upsert(upsert_for("a", "x")).await.unwrap();
        let b = index.upsert(upsert_for("b", "x")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let index = test_index().await;

        index.upsert(upsert_for("key", "x")).await.unwrap();
        assert!(index.delete("bucket", "key").await.unwrap());
        assert!(!index.delete("bucket", "key").await.unwrap());
        assert!(index.fetch("bucket", "key").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_page_orders_and_paginates() {
        let index = test_index().await;
        for key in ["b/1", "a/2", "a/1"] {
            index.upsert(upsert_for(key, "x")).await.unwrap();
        }

        let page = index.list_page("bucket", Some("a/"), None, 10).await.unwrap();
        let keys: Vec<_> = page.iter().map(|r| r.object_key.as_str()).collect();
        assert_eq!(keys, ["a/1", "a/2"]);

        let page = index
            .list_page("bucket", None, Some("a/1"), 10)
            .await
            .unwrap();
        let keys: Vec<_> = page.iter().map(|r| r.object_key.as_str()).collect();
        assert_eq!(keys, ["a/2", "b/1"]);
    }

    #[tokio::test]
    async fn like_metacharacters_match_literally() {
        let index = test_index().await;
        index.upsert(upsert_for("a%1", "x")).await.unwrap();
        index.upsert(upsert_for("ab1", "x")).await.unwrap();
        index.upsert(upsert_for("a_1", "x")).await.unwrap();

        let page = index.list_page("bucket", Some("a%"), None, 10).await.unwrap();
        let keys: Vec<_> = page.iter().map(|r| r.object_key.as_str()).collect();
        assert_eq!(keys, ["a%1"]);

        let page = index.list_page("bucket", Some("a_"), None, 10).await.unwrap();
        let keys: Vec<_> = page.iter().map(|r| r.object_key.as_str()).collect();
        assert_eq!(keys, ["a_1"]);
    }
}
