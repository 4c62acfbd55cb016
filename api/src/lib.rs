pub mod descriptor;
pub mod link;
pub mod range;
pub mod stream;

pub use descriptor::{LocationKey, LocationKind, ObjectDescriptor};
pub use link::{DomainTag, LinkDisplay, LinkRecord, Token};
pub use range::{align_chunks, ChunkPlan, CHUNK_SIZE};
pub use stream::StreamRequest;

/// Integer identity of a message in the upstream archive channel.
pub type ObjectId = i64;

/// Upstream shard that holds the bytes for a given object.
pub type DataCenterId = i32;

/// One upstream client identity's index into the Session Pool, used as the
/// load balancer's unit of selection, the session table's partition key,
/// and (since each identity has its own home data center) the key the
/// session-acquire algorithm uses to decide whether a data center is local
/// or requires the cross-DC export/import handshake.
pub type IdentityIndex = usize;

/// Maximum object size this gateway will stream; larger objects are
/// rejected by the HTTP front rather than partially served.
pub const MAX_OBJECT_SIZE: u64 = 1024 * 1024 * 1024;
