use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use api::{DataCenterId, IdentityIndex, ObjectDescriptor, ObjectId};

mod mock;
pub use mock::MockUpstream;

/// Number of authorization-import attempts the Session Pool makes for a
/// cross-data-center session before giving up and raising `AuthInvalid`.
pub const AUTH_IMPORT_ATTEMPTS: u32 = 6;

/// Failure modes the Upstream Capability can surface, kept distinct from
/// `GatewayError` because the streaming engine handles each one with a
/// different recovery strategy before it ever becomes an HTTP
/// response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("object not found")]
    NotFound,

    #[error("rate limited, retry after {wait_seconds}s")]
    RateLimited { wait_seconds: u64 },

    #[error("session authorization failed")]
    AuthInvalid,

    #[error("transport error: {0}")]
    Transport(String),
}

/// An authenticated, per-data-center read session. Opaque to everything
/// above the Session Pool; the pool is the only thing that constructs,
/// heals, or tears one down.
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    fn data_center_id(&self) -> DataCenterId;

    /// Reads up to `limit` bytes starting at `offset`, aligned to a chunk
    /// boundary by the caller. May return fewer bytes at EOF, never more.
    async fn read(
        &self,
        descriptor: &ObjectDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, UpstreamError>;
}

/// The assumed external contract: locate an object, then read chunks of it
/// through a session for its data center. The streaming engine is built
/// generically against this trait; it never assumes a concrete wire
/// protocol.
///
/// Session *construction* is split into the primitives the Session Pool's
/// acquire algorithm needs (home-DC vs. cross-DC export/import), rather
/// than a single `session()` call, because the pool — not the backend —
/// owns that algorithm: it has to know which identity is asking and decide
/// the home-DC-vs-cross-DC branch and the import retry loop itself.
#[async_trait]
pub trait UpstreamBackend: Send + Sync + 'static {
    async fn locate(&self, object_id: ObjectId) -> Result<ObjectDescriptor, UpstreamError>;

    /// The data center `identity` is natively authorized against. A session
    /// at this data center can be opened directly with `identity`'s own
    /// auth key; any other data center needs the export/import handshake.
    fn home_dc(&self, identity: IdentityIndex) -> DataCenterId;

    /// Starts a session at `identity`'s home data center using its own auth
    /// key. Only ever called when `data_center_id == home_dc(identity)`.
    async fn open_home_session(
        &self,
        identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError>;

    /// Starts an unauthenticated session at `data_center_id`, pending an
    /// authorization import from `identity`'s home session.
    async fn open_unauthenticated_session(
        &self,
        identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError>;

    /// One export-from-home-session/import-into-`session` attempt.
    /// `Err(UpstreamError::AuthInvalid)` means the imported bytes were
    /// rejected and the caller should retry with a fresh export; any other
    /// error is not retryable.
    async fn import_authorization(
        &self,
        identity: IdentityIndex,
        session: &Arc<dyn UpstreamSession>,
    ) -> Result<(), UpstreamError>;

    /// Copies `object_id` into the archive channel and returns the copy's
    /// id, so that public links address a stable, long-lived message
    /// instead of a possibly-ephemeral source one.
    async fn copy_to_archive(
        &self,
        object_id: ObjectId,
        bin_channel: i64,
    ) -> Result<ObjectId, UpstreamError>;
}
