use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tower::Service;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::routes;
use crate::http::stream::{stream_compact, stream_split};
use crate::state::AppState;

/// Builds the full route table against shared state. Exposed so integration
/// tests can drive it directly with `tower::ServiceExt::oneshot` instead of
/// going through [`serve`]'s TCP accept loop.
pub fn router(state: Arc<AppState>) -> Router<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::HEAD,
            axum::http::Method::OPTIONS,
        ])
        .expose_headers([
            axum::http::header::CONTENT_RANGE,
            axum::http::header::CONTENT_LENGTH,
            axum::http::header::ACCEPT_RANGES,
        ]);

    Router::new()
        .route("/", get(routes::liveness))
        .route("/robots.txt", get(routes::robots_txt))
        .route("/favicon.ico", get(routes::favicon))
        .route("/prepare/{token}", get(routes::prepare))
        .route("/watch/{token}", get(routes::watch))
        .route("/api/generate/{token}", get(routes::generate))
        .route("/api/download/{token}", get(routes::download))
        .route("/{compact}", get(stream_compact).head(stream_compact))
        .route("/{id}/{name}", get(stream_split).head(stream_split))
        .fallback(routes::fallback)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Plain `hyper`/`axum` server loop: accept a TCP connection, wrap it in a
/// `TokioIo`, and hand it to the auto (HTTP/1.1 or h2) connection builder.
/// No TLS here — termination is assumed to happen in a front proxy.
pub async fn serve(socket: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let router = router(state);

    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .context("failed to bind http listener")?;

    tracing::info!(%socket, "listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "failed to accept connection");
                continue;
            }
        };

        let router = router.clone();
        let io = hyper_util::rt::TokioIo::new(stream);

        tokio::task::spawn(async move {
            let service = hyper::service::service_fn(move |mut request| {
                request
                    .extensions_mut()
                    .insert(axum::extract::ConnectInfo(peer));
                router.clone().call(request)
            });

            if let Err(err) = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                tracing::debug!(%peer, error = %err, "connection error");
            }
        });
    }
}
