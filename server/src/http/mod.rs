use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use common::GatewayError;

pub mod routes;
pub mod stream;
pub mod svc;

/// Maps a `GatewayError` raised before the first response byte is committed
/// to the status codes this front promises callers. Errors raised *inside*
/// the Chunk Generator, after headers are already on the wire, never reach
/// this impl — they just truncate the body.
pub struct AppError(pub GatewayError);

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError(GatewayError::Other(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // `BadRange` carries the file size it was rejected against, which the
        // 416 response must echo back in `Content-Range: bytes */{size}`
        // instead of the generic JSON error body every other variant gets.
        if let GatewayError::BadRange { file_size } = &self.0 {
            let mut resp = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
            resp.headers_mut().insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!("bytes */{file_size}")).unwrap(),
            );
            return resp;
        }

        #[derive(Serialize)]
        struct ErrorBody {
            success: bool,
            error: String,
        }

        let status = match &self.0 {
            GatewayError::UnknownToken => StatusCode::NOT_FOUND,
            GatewayError::BadHash => StatusCode::FORBIDDEN,
            GatewayError::BadRange { .. } => unreachable!("handled above"),
            GatewayError::ObjectTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::FileNotFound => StatusCode::NOT_FOUND,
            GatewayError::UpstreamFlood { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::AuthInvalid => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::EmptyChunk => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::ClientDisconnect => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
