use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::Stream;
use tracing::{debug, instrument, warn, Level};

use api::{ChunkPlan, ObjectDescriptor};
use common::upstream::UpstreamError;
use common::GatewayError;

use crate::session_pool::{IdentityIndex, SessionPool};

const PACING_DELAY: Duration = Duration::from_millis(100);
const MAX_TRANSPORT_RETRIES: u32 = 5;

/// Releases the stream's identity slot exactly once, on whichever path the
/// generator exits by — normal completion, a propagated error, or the
/// future being dropped mid-await because the client disconnected.
struct IdentityGuard {
    pool: Arc<SessionPool>,
    identity: IdentityIndex,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        self.pool.release(self.identity);
    }
}

/// Produces the byte sequence for one HTTP response body: `part_count`
/// sequential chunk-sized reads through the session for `descriptor`'s data
/// center, trimmed at the edges so the concatenation is exactly
/// `plan.body_length` bytes. Finite, non-restartable, and sequential within
/// itself — chunk `k+1` is never requested before chunk `k` has been
/// yielded.
#[instrument(level = Level::DEBUG, skip(session_pool, descriptor), fields(object_id = descriptor.object_id))]
pub fn generate(
    session_pool: Arc<SessionPool>,
    descriptor: ObjectDescriptor,
    identity: IdentityIndex,
    plan: ChunkPlan,
) -> impl Stream<Item = Result<Bytes, GatewayError>> {
    try_stream! {
        let _guard = IdentityGuard { pool: session_pool.clone(), identity };
        let data_center_id = descriptor.data_center_id;
        let chunk_size = api::CHUNK_SIZE;

        let mut yielded: u64 = 0;

        for k in 0..plan.part_count {
            let part_offset = plan.offset + k * chunk_size;
            let is_first = k == 0;
            let is_last = k + 1 == plan.part_count;

            let chunk = read_with_recovery(
                &session_pool,
                identity,
                data_center_id,
                &descriptor,
                part_offset,
                chunk_size,
            )
            .await?;

            if chunk.is_empty() {
                Err(GatewayError::EmptyChunk)?;
            }

            let trimmed = if plan.part_count == 1 {
                chunk.slice((plan.head_trim as usize).min(chunk.len())..(plan.tail_trim as usize).min(chunk.len()))
            } else if is_first {
                chunk.slice((plan.head_trim as usize).min(chunk.len())..)
            } else if is_last {
                chunk.slice(..(plan.tail_trim as usize).min(chunk.len()))
            } else {
                chunk
            };

            yielded += trimmed.len() as u64;
            yield trimmed;

            if !is_last {
                tokio::time::sleep(PACING_DELAY).await;
            }
        }

        if yielded != plan.body_length {
            warn!(
                expected = plan.body_length,
                actual = yielded,
                "chunk generator yielded a different total than the planned body length"
            );
        }
    }
}

/// Issues one `read` call, handling the two locally-recoverable upstream
/// failure modes: transport errors (tear down the session, exponential
/// backoff, retry) and rate limiting (sleep the supplied duration, retry
/// without tearing anything down).
async fn read_with_recovery(
    session_pool: &SessionPool,
    identity: IdentityIndex,
    data_center_id: api::DataCenterId,
    descriptor: &ObjectDescriptor,
    offset: u64,
    limit: u64,
) -> Result<Bytes, GatewayError> {
    let mut attempt = 0u32;

    loop {
        let session = session_pool
            .session(identity, data_center_id)
            .await
            .map_err(to_gateway_error)?;

        match session.read(descriptor, offset, limit).await {
            Ok(bytes) => return Ok(Bytes::from(bytes)),
            Err(UpstreamError::RateLimited { wait_seconds }) => {
                debug!(wait_seconds, "upstream rate limited, sleeping and retrying in place");
                tokio::time::sleep(Duration::from_secs(wait_seconds)).await;
            }
            Err(UpstreamError::Transport(reason)) => {
                session_pool.invalidate(identity, data_center_id);
                attempt += 1;
                if attempt > MAX_TRANSPORT_RETRIES {
                    return Err(GatewayError::Transport(reason));
                }
                let backoff = Duration::from_secs(1u64 << attempt.min(5));
                warn!(attempt, reason = %reason, "transport error reading upstream chunk, backing off");
                tokio::time::sleep(backoff).await;
            }
            Err(err) => return Err(to_gateway_error(err)),
        }
    }
}

fn to_gateway_error(err: UpstreamError) -> GatewayError {
    match err {
        UpstreamError::NotFound => GatewayError::FileNotFound,
        UpstreamError::RateLimited { wait_seconds } => GatewayError::UpstreamFlood { wait_secs: wait_seconds },
        UpstreamError::AuthInvalid => GatewayError::AuthInvalid,
        UpstreamError::Transport(reason) => GatewayError::Transport(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::descriptor::{LocationKey, LocationKind};
    use common::upstream::MockUpstream;
    use futures_util::StreamExt;

    fn descriptor(size: u64) -> ObjectDescriptor {
        ObjectDescriptor::new(
            1,
            2,
            "abcdef01".into(),
            size,
            "video/mp4".into(),
            "clip.mp4".into(),
            LocationKind::Document,
            LocationKey::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn yields_the_exact_requested_range() {
        let upstream = Arc::new(MockUpstream::new());
        let bytes: Vec<u8> = (0..=255u8).cycle().take(3 * 1024 * 1024).collect();
        upstream.insert(descriptor(bytes.len() as u64), bytes.clone());

        let pool = Arc::new(SessionPool::new(upstream, 1));
        let identity = pool.acquire_identity();

        let plan = api::align_chunks(1_000_000, 2_000_000, api::CHUNK_SIZE);
        let stream = generate(pool.clone(), descriptor(bytes.len() as u64), identity, plan);
        tokio::pin!(stream);

        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(out.len(), 1_000_001);
        assert_eq!(out, bytes[1_000_000..=2_000_000]);
    }

    #[tokio::test]
    async fn single_byte_range_yields_one_byte() {
        let upstream = Arc::new(MockUpstream::new());
        let bytes = vec![42u8; 10];
        upstream.insert(descriptor(10), bytes.clone());

        let pool = Arc::new(SessionPool::new(upstream, 1));
        let identity = pool.acquire_identity();

        let plan = api::align_chunks(0, 0, api::CHUNK_SIZE);
        let stream = generate(pool.clone(), descriptor(10), identity, plan);
        tokio::pin!(stream);

        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, vec![42u8]);
    }
}
