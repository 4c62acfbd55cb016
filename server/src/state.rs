use std::sync::Arc;
use std::time::Duration;

use api::{ObjectDescriptor, ObjectId};
use common::{AwaitCache, GatewayConfig, GatewayError, LinkStore, RateLimiter, UpstreamBackend};

use crate::session_pool::SessionPool;

const DESCRIPTOR_CACHE_FLUSH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Everything a request handler needs, built once at startup and shared
/// behind an `Arc`. Plain fields, not an actor: the hot path (locate a
/// descriptor, acquire a session, read a chunk) never goes through message
/// passing.
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub link_store: Arc<dyn LinkStore>,
    pub upstream: Arc<dyn UpstreamBackend>,
    pub descriptor_cache: AwaitCache<ObjectId, ObjectDescriptor>,
    pub session_pool: Arc<SessionPool>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: Arc<GatewayConfig>,
        link_store: Arc<dyn LinkStore>,
        upstream: Arc<dyn UpstreamBackend>,
    ) -> Self {
        let session_pool = Arc::new(SessionPool::new(upstream.clone(), config.workers));
        AppState {
            config,
            link_store,
            upstream,
            descriptor_cache: AwaitCache::new(),
            session_pool,
            rate_limiter: RateLimiter::with_default_policy(),
        }
    }

    /// `locate(object_id)`: cached descriptor or a fresh upstream lookup,
    /// coalesced so concurrent requests for the same object share one
    /// upstream call.
    pub async fn locate(&self, object_id: ObjectId) -> Result<ObjectDescriptor, GatewayError> {
        self.descriptor_cache
            .get_or_try_init(object_id, || async {
                self.upstream.locate(object_id).await.map_err(GatewayError::from)
            })
            .await
    }
}

/// Spawns the background task that clears the descriptor cache on a fixed
/// interval. A full flush, not an LRU: at this scale a periodic clear is
/// simpler and cheap enough.
pub fn spawn_descriptor_cache_flush(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(DESCRIPTOR_CACHE_FLUSH_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            let before = state.descriptor_cache.len();
            state.descriptor_cache.clear();
            tracing::debug!(entries_cleared = before, "flushed descriptor cache");
        }
    })
}
