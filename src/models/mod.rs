//! Core data models for the S3-compatible object storage service.
//!
//! These entities represent the logical shape of stored objects. The row
//! model maps to the metadata table via `sqlx::FromRow`; the content-type
//! table is the closed code enumeration persisted in that row.

pub mod content_type;
pub mod object;
