use anyhow::Result;
use async_trait::async_trait;

use api::link::{DomainTag, LinkRecord, Token};
use api::ObjectId;

mod memory;
mod mongo;

pub use memory::MemoryLinkStore;
pub use mongo::MongoLinkStore;

/// The set of RPCs any link-store backend must serve. Mirrors this
/// codebase's pattern of a trait naming the operations a durable backend
/// owns, with a pluggable implementation behind it.
///
/// Links carry no expiry; lookups always go by `Token`, never the reverse,
/// except `find_by_object` which exists only for the copy-to-archive path.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    async fn put(&self, record: LinkRecord) -> Result<()>;

    async fn get(&self, token: &Token) -> Result<Option<LinkRecord>>;

    async fn delete(&self, token: &Token) -> Result<()>;

    /// All links pointing at `object_id`, used by the copy-to-archive path
    /// to retag display metadata after a re-upload.
    async fn find_by_object(&self, object_id: ObjectId) -> Result<Vec<LinkRecord>>;

    /// `get`, scoped to a domain: if `require_domain_tag` is set and the
    /// stored record's tag is set and differs, the record is treated as
    /// absent. Keeps two front-end domains' tokens independent even when
    /// backed by the same store, without every backend having to reimplement
    /// the filter.
    async fn get_scoped(
        &self,
        token: &Token,
        require_domain_tag: Option<DomainTag>,
    ) -> Result<Option<LinkRecord>> {
        let record = self.get(token).await?;
        Ok(record.filter(|r| match (require_domain_tag, r.domain_tag) {
            (Some(required), Some(actual)) => required == actual,
            _ => true,
        }))
    }
}
