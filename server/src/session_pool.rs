use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use api::DataCenterId;
use common::upstream::{UpstreamBackend, UpstreamError, UpstreamSession, AUTH_IMPORT_ATTEMPTS};

pub use api::IdentityIndex;

/// N upstream client identities, each with its own session table keyed by
/// data center, plus the in-flight counters the load balancer reads to pick
/// the least-busy identity for a new stream.
///
/// Sessions are cached for the life of the process and recreated lazily on
/// first use of a (identity, data center) pair or after a transport failure
/// invalidates the entry — the same lazily-populated-map shape as the
/// descriptor cache, without the periodic flush since sessions don't go
/// stale on their own.
pub struct SessionPool {
    upstream: Arc<dyn UpstreamBackend>,
    in_flight: Vec<AtomicI64>,
    sessions: DashMap<(IdentityIndex, DataCenterId), Arc<dyn UpstreamSession>>,
}

impl SessionPool {
    pub fn new(upstream: Arc<dyn UpstreamBackend>, identities: usize) -> Self {
        let identities = identities.max(1);
        SessionPool {
            upstream,
            in_flight: (0..identities).map(|_| AtomicI64::new(0)).collect(),
            sessions: DashMap::new(),
        }
    }

    /// Picks the identity with the smallest in-flight count, ties broken by
    /// lowest index, and increments its counter. The caller MUST call
    /// [`SessionPool::release`] on every exit path of the stream it starts.
    pub fn acquire_identity(&self) -> IdentityIndex {
        let (idx, counter) = self
            .in_flight
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.load(Ordering::SeqCst))
            .expect("identity pool is never empty");
        counter.fetch_add(1, Ordering::SeqCst);
        idx
    }

    pub fn release(&self, identity: IdentityIndex) {
        self.in_flight[identity].fetch_sub(1, Ordering::SeqCst);
    }

    pub fn in_flight(&self, identity: IdentityIndex) -> i64 {
        self.in_flight[identity].load(Ordering::SeqCst)
    }

    /// Acquire algorithm for identity `I` and data center `D`:
    /// 1. If `sessions[(I, D)]` exists, return it.
    /// 2. Else, if `D == I`'s home DC, open a session directly with `I`'s
    ///    own auth key.
    /// 3. Else, open an unauthenticated session and perform the
    ///    export/import handshake, retrying the import up to
    ///    `AUTH_IMPORT_ATTEMPTS` times; on exhaustion, tear the session
    ///    down and raise `AuthInvalid`.
    /// 4. Store and return.
    pub async fn session(
        &self,
        identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError> {
        if let Some(session) = self.sessions.get(&(identity, data_center_id)) {
            return Ok(session.clone());
        }

        let session = if data_center_id == self.upstream.home_dc(identity) {
            self.upstream
                .open_home_session(identity, data_center_id)
                .await?
        } else {
            self.authorize_cross_dc_session(identity, data_center_id).await?
        };

        self.sessions
            .insert((identity, data_center_id), session.clone());
        Ok(session)
    }

    async fn authorize_cross_dc_session(
        &self,
        identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError> {
        let session = self
            .upstream
            .open_unauthenticated_session(identity, data_center_id)
            .await?;

        for attempt in 1..=AUTH_IMPORT_ATTEMPTS {
            match self.upstream.import_authorization(identity, &session).await {
                Ok(()) => return Ok(session),
                Err(UpstreamError::AuthInvalid) => {
                    debug!(identity, data_center_id, attempt, "authorization import rejected, retrying");
                }
                Err(other) => return Err(other),
            }
        }

        Err(UpstreamError::AuthInvalid)
    }

    /// Drops a broken session so the next [`SessionPool::session`] call
    /// rebuilds it from scratch.
    pub fn invalidate(&self, identity: IdentityIndex, data_center_id: DataCenterId) {
        self.sessions.remove(&(identity, data_center_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::upstream::MockUpstream;

    #[test]
    fn acquire_picks_the_least_busy_identity() {
        let pool = SessionPool::new(Arc::new(MockUpstream::new()), 3);
        let a = pool.acquire_identity();
        assert_eq!(a, 0);
        let b = pool.acquire_identity();
        assert_eq!(b, 1);
        pool.release(a);
        let c = pool.acquire_identity();
        assert_eq!(c, 0);
    }

    #[test]
    fn release_decrements_the_counter() {
        let pool = SessionPool::new(Arc::new(MockUpstream::new()), 1);
        let id = pool.acquire_identity();
        assert_eq!(pool.in_flight(id), 1);
        pool.release(id);
        assert_eq!(pool.in_flight(id), 0);
    }

    #[tokio::test]
    async fn session_is_cached_across_calls() {
        let pool = SessionPool::new(Arc::new(MockUpstream::new()), 1);
        let s1 = pool.session(0, 2).await.unwrap();
        let s2 = pool.session(0, 2).await.unwrap();
        assert_eq!(s1.data_center_id(), s2.data_center_id());
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_session() {
        let pool = SessionPool::new(Arc::new(MockUpstream::new()), 1);
        pool.session(0, 2).await.unwrap();
        pool.invalidate(0, 2);
        assert!(pool.sessions.is_empty());
    }

    #[tokio::test]
    async fn home_dc_session_skips_the_import_handshake() {
        // MockUpstream's home dc is 1; requesting it must never consult
        // import_authorization, so rejecting every import still succeeds.
        let upstream = Arc::new(MockUpstream::new().reject_imports(i64::MAX));
        let pool = SessionPool::new(upstream, 1);
        let session = pool.session(0, 1).await.unwrap();
        assert_eq!(session.data_center_id(), 1);
    }

    #[tokio::test]
    async fn cross_dc_session_retries_the_import_until_it_succeeds() {
        let upstream = Arc::new(MockUpstream::new().reject_imports(3));
        let pool = SessionPool::new(upstream, 1);
        let session = pool.session(0, 2).await.unwrap();
        assert_eq!(session.data_center_id(), 2);
    }

    #[tokio::test]
    async fn cross_dc_session_raises_auth_invalid_after_exhausting_retries() {
        let upstream = Arc::new(MockUpstream::new().reject_imports(AUTH_IMPORT_ATTEMPTS as i64));
        let pool = SessionPool::new(upstream, 1);
        assert!(matches!(
            pool.session(0, 2).await,
            Err(UpstreamError::AuthInvalid)
        ));
    }
}
