//! Defines routes for all S3-like object operations.
//!
//! ## Structure
//! - **Bucket-level endpoints**
//!   - `GET    /{bucket}` — list objects (supports prefix, max-keys,
//!     continuation-token; ListObjectsV2 only)
//!
//! - **Object-level endpoints**
//!   - `PUT    /{bucket}/{*key}` — upload object, or CopyObject when the
//!     `x-amz-copy-source` header is present
//!   - `GET    /{bucket}/{*key}` — download object
//!   - `HEAD   /{bucket}/{*key}` — retrieve metadata only
//!   - `DELETE /{bucket}/{*key}` — delete object (idempotent)
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.
//! Buckets are implicit namespaces: there is no bucket CRUD, directories
//! appear on first write.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{delete_object, get_object, head_object, list_objects, upload_object},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    routing::{get, put},
};

/// Build and return the router for all S3-compatible routes.
///
/// The router carries shared state (`StorageService`) to all handlers.
pub fn routes() -> Router<StorageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Object-level routes
        .route(
            "/{bucket}/{*key}",
            put(upload_object)
                .get(get_object)
                .head(head_object)
                .delete(delete_object),
        )
        // Bucket-level routes
        .route("/{bucket}", get(list_objects))
}
