//! HTTP handlers for the S3-compatible object operations.
//! Streams object bodies to avoid buffering in memory and delegates storage
//! concerns to `StorageService`; this layer only translates HTTP shapes
//! (headers, query strings, XML) to and from engine calls.

use std::collections::BTreeMap;
use std::io;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::Response,
};
use base64::{Engine as _, engine::general_purpose};
use chrono::SecondsFormat;
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::{
    errors::AppError,
    models::object::ObjectRecord,
    services::storage_service::{
        ListObjectsParams, ListObjectsResult, MetadataDirective, StorageService,
    },
};

const COPY_SOURCE_HEADER: &str = "x-amz-copy-source";
const METADATA_DIRECTIVE_HEADER: &str = "x-amz-metadata-directive";
const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// Query params accepted by ListObjectsV2.
#[derive(Debug, Deserialize)]
pub struct ListObjectsV2Query {
    #[serde(rename = "list-type")]
    pub list_type: Option<u8>,
    pub prefix: Option<String>,
    #[serde(rename = "max-keys")]
    pub max_keys: Option<i64>,
    #[serde(rename = "continuation-token")]
    pub continuation_token: Option<String>,
}

/// PUT `/{bucket}/{*key}` — upload an object, or copy one when the
/// `x-amz-copy-source` header is present (S3 CopyObject rides on PUT).
pub async fn upload_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, AppError> {
    if headers.contains_key(COPY_SOURCE_HEADER) {
        return handle_copy(service, &bucket, &key, &headers).await;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let user_metadata = collect_user_metadata(&headers);

    let stream = body
        .into_data_stream()
        .map(|chunk| chunk.map_err(|err| io::Error::new(io::ErrorKind::Other, err)));

    let record = service
        .put_object_stream(
            &bucket,
            &key,
            content_type.as_deref(),
            user_metadata,
            stream,
        )
        .await?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", record.etag)) {
        response.headers_mut().insert(header::ETAG, value);
    }
    Ok(response)
}

/// CopyObject: resolve the `/bucket/key` source, apply the metadata
/// directive, and answer with a `CopyObjectResult` document.
async fn handle_copy(
    service: StorageService,
    dst_bucket: &str,
    dst_key: &str,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let raw_source = headers
        .get(COPY_SOURCE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::new(StatusCode::BAD_REQUEST, "invalid x-amz-copy-source header")
        })?;
    let decoded = percent_decode_str(raw_source)
        .decode_utf8()
        .map_err(|_| AppError::new(StatusCode::BAD_REQUEST, "invalid x-amz-copy-source encoding"))?;
    let source = decoded.trim_start_matches('/');
    let (src_bucket, src_key) = source.split_once('/').ok_or_else(|| {
        AppError::new(StatusCode::BAD_REQUEST, "invalid x-amz-copy-source format")
    })?;
    if src_key.is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "invalid x-amz-copy-source: missing key",
        ));
    }

    let directive = MetadataDirective::from_header(
        headers
            .get(METADATA_DIRECTIVE_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    let new_content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let new_metadata = collect_user_metadata(headers);

    let record = service
        .copy_object(
            src_bucket,
            src_key,
            dst_bucket,
            dst_key,
            directive,
            new_content_type,
            new_metadata,
        )
        .await?;

    let xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<CopyObjectResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
            r#"<ETag>"{}"</ETag>"#,
            r#"<LastModified>{}</LastModified>"#,
            r#"</CopyObjectResult>"#
        ),
        xml_escape(&record.etag),
        record
            .last_modified()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    let mut response = Response::new(Body::from(xml));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    Ok(response)
}

/// GET `/{bucket}/{*key}` — download an object as a streaming response.
pub async fn get_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (record, file) = service.get_object_reader(&bucket, &key).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &record);
    Ok(response)
}

/// HEAD `/{bucket}/{*key}` — same headers as GET but no body.
pub async fn head_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let record = service.get_object_metadata(&bucket, &key).await?;
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &record);
    Ok(response)
}

/// DELETE `/{bucket}/{*key}` — idempotent delete; absent keys succeed.
pub async fn delete_object(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    service.delete_object(&bucket, &key).await?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    Ok(response)
}

/// GET `/{bucket}` — ListObjectsV2, supports ?prefix=&max-keys=&continuation-token=
pub async fn list_objects(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    Query(q): Query<ListObjectsV2Query>,
) -> Result<Response, AppError> {
    let list_type = q.list_type.unwrap_or(2);
    if list_type != 2 {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Only list-type=2 is supported",
        ));
    }

    let params = ListObjectsParams {
        prefix: q.prefix.clone(),
        continuation_token: q
            .continuation_token
            .as_deref()
            .map(decode_continuation_token),
        max_keys: q.max_keys.unwrap_or(1000),
    };

    let result = service.list_objects_v2(&bucket, params).await?;
    let xml = build_list_objects_v2_xml(
        &bucket,
        q.prefix.as_deref(),
        q.max_keys.unwrap_or(1000),
        q.continuation_token.as_deref(),
        &result,
    );

    let mut response = Response::new(Body::from(xml));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml"),
    );
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

/// Collect `x-amz-meta-*` request headers as user metadata.
fn collect_user_metadata(headers: &HeaderMap) -> Option<BTreeMap<String, String>> {
    let mut metadata = BTreeMap::new();
    for (name, value) in headers {
        if let Some(meta_key) = name.as_str().strip_prefix(USER_METADATA_PREFIX) {
            if let Ok(value) = value.to_str() {
                metadata.insert(meta_key.to_string(), value.to_string());
            }
        }
    }
    if metadata.is_empty() { None } else { Some(metadata) }
}

/// Standard object response headers: content type, length, ETag,
/// Last-Modified, and the `x-amz-meta-*` echo.
fn set_object_headers(headers: &mut HeaderMap, record: &ObjectRecord) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(record.content_type().as_mime()),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&record.size.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", record.etag)) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&record.last_modified().to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    for (meta_key, meta_value) in record.user_metadata() {
        let name = HeaderName::from_bytes(format!("{USER_METADATA_PREFIX}{meta_key}").as_bytes());
        let value = HeaderValue::from_str(&meta_value);
        if let (Ok(name), Ok(value)) = (name, value) {
            headers.insert(name, value);
        }
    }
}

fn build_list_objects_v2_xml(
    bucket: &str,
    prefix: Option<&str>,
    max_keys: i64,
    continuation_token: Option<&str>,
    result: &ListObjectsResult,
) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
    );
    xml.push_str(&format!("<Name>{}</Name>", xml_escape(bucket)));
    xml.push_str(&format!(
        "<Prefix>{}</Prefix>",
        xml_escape(prefix.unwrap_or(""))
    ));
    xml.push_str(&format!("<KeyCount>{}</KeyCount>", result.key_count));
    xml.push_str(&format!("<MaxKeys>{max_keys}</MaxKeys>"));
    if let Some(token) = continuation_token {
        xml.push_str(&format!(
            "<ContinuationToken>{}</ContinuationToken>",
            xml_escape(token)
        ));
    }
    xml.push_str(&format!(
        "<IsTruncated>{}</IsTruncated>",
        if result.is_truncated { "true" } else { "false" }
    ));
    if let Some(next) = &result.next_continuation_token {
        let encoded = encode_continuation_token(next);
        xml.push_str(&format!(
            "<NextContinuationToken>{}</NextContinuationToken>",
            xml_escape(&encoded)
        ));
    }

    for record in &result.objects {
        xml.push_str("<Contents>");
        xml.push_str(&format!("<Key>{}</Key>", xml_escape(&record.object_key)));
        xml.push_str(&format!(
            "<LastModified>{}</LastModified>",
            record
                .last_modified()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        xml.push_str(&format!("<ETag>\"{}\"</ETag>", xml_escape(&record.etag)));
        xml.push_str(&format!("<Size>{}</Size>", record.size));
        xml.push_str("<StorageClass>STANDARD</StorageClass>");
        xml.push_str("</Contents>");
    }

    xml.push_str("</ListBucketResult>");
    xml
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Continuation tokens are opaque to callers: base64 over the engine's
/// last-key cursor.
fn encode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD.encode(token)
}

fn decode_continuation_token(token: &str) -> String {
    general_purpose::STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_tokens_round_trip_opaquely() {
        let token = "photos/2025/img.jpg";
        let encoded = encode_continuation_token(token);
        assert_ne!(encoded, token);
        assert_eq!(decode_continuation_token(&encoded), token);
    }

    #[test]
    fn user_metadata_headers_are_collected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-amz-meta-author", HeaderValue::from_static("alice"));
        headers.insert("x-amz-meta-rev", HeaderValue::from_static("7"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let metadata = collect_user_metadata(&headers).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata["author"], "alice");
        assert_eq!(metadata["rev"], "7");

        assert!(collect_user_metadata(&HeaderMap::new()).is_none());
    }

    #[test]
    fn xml_escape_covers_markup_characters() {
        assert_eq!(
            xml_escape(r#"a&b<c>d"e'f"#),
            "a&amp;b&lt;c&gt;d&quot;e&apos;f"
        );
    }
}
