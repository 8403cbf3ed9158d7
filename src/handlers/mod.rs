//! HTTP handler layer: the S3 protocol adapter plus health probes.

pub mod health_handlers;
pub mod object_handlers;
