use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use api::{DataCenterId, IdentityIndex, ObjectDescriptor, ObjectId};

use super::{UpstreamBackend, UpstreamError, UpstreamSession};

#[derive(Clone)]
struct MockObject {
    descriptor: ObjectDescriptor,
    bytes: Vec<u8>,
}

/// Reference upstream backend serving bytes out of an in-process table.
/// Stands in for the real chat/file-storage backend in tests and local
/// development, where no such service is reachable. Not used in
/// production: a real deployment must provide its own `UpstreamBackend`.
///
/// Every identity's home data center is fixed at construction; import
/// rejections are injectable so tests can exercise the Session Pool's
/// retry-then-`AuthInvalid` escalation without a real export/import
/// handshake to fail.
pub struct MockUpstream {
    objects: Arc<Mutex<HashMap<ObjectId, MockObject>>>,
    next_archive_id: AtomicI64,
    home_dc: DataCenterId,
    import_rejections: AtomicI64,
}

impl Default for MockUpstream {
    fn default() -> Self {
        MockUpstream {
            objects: Arc::new(Mutex::new(HashMap::new())),
            next_archive_id: AtomicI64::new(1_000_000),
            home_dc: 1,
            import_rejections: AtomicI64::new(0),
        }
    }
}

impl MockUpstream {
    pub fn new() -> Self {
        MockUpstream::default()
    }

    pub fn insert(&self, descriptor: ObjectDescriptor, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert(descriptor.object_id, MockObject { descriptor, bytes });
    }

    /// Reject the next `count` cross-DC authorization imports before
    /// letting one through, for exercising the Session Pool's retry loop.
    pub fn reject_imports(mut self, count: i64) -> Self {
        self.import_rejections = AtomicI64::new(count);
        self
    }
}

struct MockSession {
    data_center_id: DataCenterId,
    objects: Arc<Mutex<HashMap<ObjectId, MockObject>>>,
}

#[async_trait]
impl UpstreamSession for MockSession {
    fn data_center_id(&self) -> DataCenterId {
        self.data_center_id
    }

    async fn read(
        &self,
        descriptor: &ObjectDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<u8>, UpstreamError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(&descriptor.object_id)
            .ok_or(UpstreamError::NotFound)?;

        let start = offset as usize;
        if start >= object.bytes.len() {
            return Ok(Vec::new());
        }
        let end = (start + limit as usize).min(object.bytes.len());
        Ok(object.bytes[start..end].to_vec())
    }
}

#[async_trait]
impl UpstreamBackend for MockUpstream {
    async fn locate(&self, object_id: ObjectId) -> Result<ObjectDescriptor, UpstreamError> {
        self.objects
            .lock()
            .unwrap()
            .get(&object_id)
            .map(|o| o.descriptor.clone())
            .ok_or(UpstreamError::NotFound)
    }

    fn home_dc(&self, _identity: IdentityIndex) -> DataCenterId {
        self.home_dc
    }

    async fn open_home_session(
        &self,
        _identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError> {
        // The mock has no real transport, so every data center is always
        // reachable with a session backed by the same shared table.
        Ok(Arc::new(MockSession {
            data_center_id,
            objects: self.objects.clone(),
        }))
    }

    async fn open_unauthenticated_session(
        &self,
        _identity: IdentityIndex,
        data_center_id: DataCenterId,
    ) -> Result<Arc<dyn UpstreamSession>, UpstreamError> {
        Ok(Arc::new(MockSession {
            data_center_id,
            objects: self.objects.clone(),
        }))
    }

    async fn import_authorization(
        &self,
        _identity: IdentityIndex,
        _session: &Arc<dyn UpstreamSession>,
    ) -> Result<(), UpstreamError> {
        let remaining = self.import_rejections.load(Ordering::SeqCst);
        if remaining > 0 {
            self.import_rejections.fetch_sub(1, Ordering::SeqCst);
            return Err(UpstreamError::AuthInvalid);
        }
        Ok(())
    }

    async fn copy_to_archive(
        &self,
        object_id: ObjectId,
        _bin_channel: i64,
    ) -> Result<ObjectId, UpstreamError> {
        let mut objects = self.objects.lock().unwrap();
        let source = objects.get(&object_id).ok_or(UpstreamError::NotFound)?.clone();
        let archive_id = self.next_archive_id.fetch_add(1, Ordering::SeqCst);

        let mut descriptor = source.descriptor;
        descriptor.object_id = archive_id;
        objects.insert(
            archive_id,
            MockObject {
                descriptor,
                bytes: source.bytes,
            },
        );
        Ok(archive_id)
    }
}
