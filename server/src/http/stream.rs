use std::sync::{Arc, LazyLock};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use serde::Deserialize;

use api::range::parse_range_header;
use api::{align_chunks, ObjectId, StreamRequest, CHUNK_SIZE, MAX_OBJECT_SIZE};
use common::GatewayError;

use crate::chunkgen;
use crate::http::AppError;
use crate::state::AppState;

static COMPACT_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_-]{6})(\d+)$").unwrap());

#[derive(Deserialize)]
pub struct StreamQuery {
    pub hash: Option<String>,
    pub download: Option<String>,
}

/// `GET/HEAD /{hash}{id}` — the compact path form, hash and object id
/// packed into one path segment.
pub async fn stream_compact(
    State(state): State<Arc<AppState>>,
    Path(compact): Path<String>,
    Query(query): Query<StreamQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // The compact form packs hash+id into one path segment
    // (`{hash}{id}`); when a bare id doesn't fit that shape (no filename
    // segment, `?hash=...` carried in the query instead), fall back to the
    // split form's own parsing.
    let Some(captures) = COMPACT_FORM.captures(&compact) else {
        let Ok(object_id) = compact.parse::<ObjectId>() else {
            return Ok(StatusCode::NOT_FOUND.into_response());
        };
        let hash = query.hash.clone().unwrap_or_default();
        return stream_object(state, object_id, hash, download_requested(&query), method, headers).await;
    };
    let hash = captures[1].to_string();
    let object_id: ObjectId = captures[2].parse().map_err(|_| GatewayError::UnknownToken)?;

    stream_object(state, object_id, hash, download_requested(&query), method, headers).await
}

/// `GET/HEAD /{id}/{name}?hash=...` — the split path form, hash carried in
/// the query string.
pub async fn stream_split(
    State(state): State<Arc<AppState>>,
    Path((id, _name)): Path<(ObjectId, String)>,
    Query(query): Query<StreamQuery>,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let hash = query.hash.clone().unwrap_or_default();
    stream_object(state, id, hash, download_requested(&query), method, headers).await
}

fn download_requested(query: &StreamQuery) -> bool {
    query.download.as_deref() == Some("1")
}

async fn stream_object(
    state: Arc<AppState>,
    object_id: ObjectId,
    provided_hash: String,
    is_download: bool,
    method: Method,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let descriptor = state.locate(object_id).await?;

    if provided_hash != descriptor.hash() {
        return Err(GatewayError::BadHash.into());
    }

    if descriptor.file_size > MAX_OBJECT_SIZE {
        return Err(GatewayError::ObjectTooLarge.into());
    }

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    let parsed = match parse_range_header(range_header, descriptor.file_size) {
        Ok(parsed) => parsed,
        Err(_) => {
            return Err(GatewayError::BadRange {
                file_size: descriptor.file_size,
            }
            .into());
        }
    };

    let (range_from, range_to, status) = match parsed {
        Some(range) => (range.from, range.to, StatusCode::PARTIAL_CONTENT),
        None => (0, descriptor.file_size.saturating_sub(1), StatusCode::OK),
    };

    let stream_request = StreamRequest {
        object_id,
        provided_hash,
        range_from,
        range_to,
        is_download,
        player_hint: None,
    };
    let body_length = stream_request.body_length();

    let content_type = if descriptor.mime_type.is_empty() {
        mime_guess::from_path(&descriptor.file_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        descriptor.mime_type.clone()
    };

    let inline = !is_download
        && (content_type.starts_with("video/") || content_type.starts_with("audio/"));
    let disposition = format!(
        "{}; filename=\"{}\"",
        if inline { "inline" } else { "attachment" },
        descriptor.file_name
    );

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, body_length.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "no-cache");

    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range_from, range_to, descriptor.file_size),
        );
    }

    if method == Method::HEAD {
        return Ok(builder.body(Body::empty()).unwrap());
    }

    let identity = state.session_pool.acquire_identity();
    let plan = align_chunks(range_from, range_to, CHUNK_SIZE);
    let stream = chunkgen::generate(state.session_pool.clone(), descriptor, identity, plan);

    Ok(builder.body(Body::from_stream(stream)).unwrap())
}
