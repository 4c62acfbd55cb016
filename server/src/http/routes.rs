use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use api::link::Token;
use common::ratelimit::Admission;
use common::GatewayError;

use crate::archive;
use crate::http::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct LivenessBody {
    service: &'static str,
    version: &'static str,
}

pub async fn liveness() -> Json<LivenessBody> {
    Json(LivenessBody {
        service: "streamgate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn robots_txt() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

pub async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn fallback() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Scheme a client-facing URL should use: the reverse proxy's declared
/// scheme if present, else the configured SSL flag.
fn resolve_scheme(state: &AppState, headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| state.config.scheme().to_string())
}

pub async fn prepare(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Html<String>, AppError> {
    let token = Token::parse(&token).ok_or(GatewayError::UnknownToken)?;
    let record = state
        .link_store
        .get_scoped(&token, state.config.required_domain_tag())
        .await?
        .ok_or(GatewayError::UnknownToken)?;

    Ok(Html(format!(
        "<!doctype html><title>{name}</title><body>preparing {name}…</body>",
        name = html_escape(&record.display.file_name)
    )))
}

#[derive(Deserialize)]
pub struct WatchQuery {
    /// Passed straight through to the rendered page; the original only used
    /// it to pick a JS player widget, which is template rendering and out
    /// of scope here.
    player: Option<String>,
}

pub async fn watch(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<WatchQuery>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let token = Token::parse(&token).ok_or(GatewayError::UnknownToken)?;
    let record = state
        .link_store
        .get_scoped(&token, state.config.required_domain_tag())
        .await?
        .ok_or(GatewayError::UnknownToken)?;

    let descriptor = state.locate(record.object_id).await?;
    let stream_url = format!(
        "{}://{}/{}{}",
        resolve_scheme(&state, &headers),
        state.config.advertised_fqdn(),
        descriptor.hash(),
        descriptor.object_id
    );

    let player_attr = match &query.player {
        Some(hint) => format!(" data-player=\"{}\"", html_escape(hint)),
        None => String::new(),
    };

    Ok(Html(format!(
        "<!doctype html><title>{name}</title><body><video controls{player_attr} src=\"{url}\"></video></body>",
        name = html_escape(&record.display.file_name),
        url = html_escape(&stream_url),
    )))
}

#[derive(Serialize)]
struct GenerateBody {
    success: bool,
    stream_url: String,
    file_name: String,
    thumbnail_url: Option<String>,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = Token::parse(&token).ok_or(GatewayError::UnknownToken)?;
    let record = state
        .link_store
        .get_scoped(&token, state.config.required_domain_tag())
        .await?
        .ok_or(GatewayError::UnknownToken)?;

    let archived_id = archive::copy_to_archive(&state, record.object_id).await?;
    let descriptor = state.locate(archived_id).await?;

    let stream_url = format!(
        "{}://{}/{}{}",
        resolve_scheme(&state, &headers),
        state.config.advertised_fqdn(),
        descriptor.hash(),
        descriptor.object_id
    );

    Ok(Json(GenerateBody {
        success: true,
        stream_url,
        file_name: record.display.file_name,
        thumbnail_url: record.thumbnail_url,
    })
    .into_response())
}

#[derive(Serialize)]
struct DownloadBody {
    success: bool,
    stream_url: String,
    file_name: String,
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, AppError> {
    match state.rate_limiter.check(&addr.ip().to_string()) {
        Admission::Proceed => {}
        Admission::Wait { retry_after } => {
            return Err(GatewayError::RateLimited(format!(
                "too many requests, retry after {}s",
                retry_after.as_secs()
            ))
            .into());
        }
    }

    let parsed = Token::parse(&token).ok_or(GatewayError::UnknownToken)?;
    let record = state
        .link_store
        .get_scoped(&parsed, state.config.required_domain_tag())
        .await?
        .ok_or(GatewayError::UnknownToken)?;

    let result = async {
        let archived_id = archive::copy_to_archive(&state, record.object_id).await?;
        let descriptor = state.locate(archived_id).await?;

        let stream_url = format!(
            "{}://{}/{}{}?download=1",
            resolve_scheme(&state, &headers),
            state.config.advertised_fqdn(),
            descriptor.hash(),
            descriptor.object_id
        );

        Ok::<_, AppError>(Json(DownloadBody {
            success: true,
            stream_url,
            file_name: record.display.file_name,
        })
        .into_response())
    }
    .await;

    // This handler hands back a stream URL rather than holding a byte
    // stream open, so the admitted slot's "stream" ends here, not at some
    // later point — release it before returning either way.
    state.rate_limiter.release(&addr.ip().to_string());
    result
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
