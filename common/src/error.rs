use thiserror::Error;

/// Error kinds the streaming engine can raise. Variants that happen *inside* the Chunk
/// Generator after the first byte has already been written to the socket
/// can't change the response status — they just truncate the body — but the
/// same enum is used there too so logging stays uniform.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown token")]
    UnknownToken,

    #[error("hash mismatch")]
    BadHash,

    #[error("range not satisfiable")]
    BadRange { file_size: u64 },

    #[error("object exceeds the maximum servable size")]
    ObjectTooLarge,

    #[error("object not found upstream")]
    FileNotFound,

    #[error("upstream is flooding, retry after {wait_secs}s")]
    UpstreamFlood { wait_secs: u64 },

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream session authorization failed")]
    AuthInvalid,

    #[error("upstream returned an empty chunk mid-stream")]
    EmptyChunk,

    #[error("client disconnected")]
    ClientDisconnect,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<api::descriptor::DescriptorError> for GatewayError {
    fn from(err: api::descriptor::DescriptorError) -> Self {
        GatewayError::Other(anyhow::Error::new(err))
    }
}

impl From<crate::upstream::UpstreamError> for GatewayError {
    fn from(err: crate::upstream::UpstreamError) -> Self {
        use crate::upstream::UpstreamError as U;
        match err {
            U::NotFound => GatewayError::FileNotFound,
            U::RateLimited { wait_seconds } => GatewayError::UpstreamFlood { wait_secs: wait_seconds },
            U::AuthInvalid => GatewayError::AuthInvalid,
            U::Transport(reason) => GatewayError::Transport(reason),
        }
    }
}
