use serde::{Deserialize, Serialize};

use crate::{DataCenterId, ObjectId};

/// Selects which upstream read variant is needed to fetch an object's bytes.
///
/// Telegram (the archetype this gateway fronts) addresses documents, photos,
/// and chat photos with three distinct `InputFileLocation` variants; which
/// one applies is a property of the object, not of the request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LocationKind {
    Document,
    Photo,
    ChatPhoto,
}

/// The opaque bag of fields the upstream needs to build a file location for
/// a `read` call. Fields are a superset across the three `LocationKind`
/// variants; which ones are populated depends on `location_kind`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocationKey {
    pub media_id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
    pub thumb_size: String,
    pub volume_id: i64,
    pub local_id: i32,
    pub chat_id: i64,
    pub chat_access_hash: i64,
    pub big: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("unique_id must be at least 6 characters, got {0}")]
    UniqueIdTooShort(usize),
}

/// Immutable snapshot of an upstream object needed to read it. Once
/// constructed, an `ObjectDescriptor` is never mutated — concurrent readers
/// of a cached descriptor never observe a partial update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub object_id: ObjectId,
    pub data_center_id: DataCenterId,
    unique_id: String,
    pub file_size: u64,
    pub mime_type: String,
    pub file_name: String,
    pub location_kind: LocationKind,
    pub location_key: LocationKey,
}

impl ObjectDescriptor {
    pub fn new(
        object_id: ObjectId,
        data_center_id: DataCenterId,
        unique_id: String,
        file_size: u64,
        mime_type: String,
        file_name: String,
        location_kind: LocationKind,
        location_key: LocationKey,
    ) -> Result<Self, DescriptorError> {
        if unique_id.len() < 6 {
            return Err(DescriptorError::UniqueIdTooShort(unique_id.len()));
        }

        Ok(ObjectDescriptor {
            object_id,
            data_center_id,
            unique_id,
            file_size,
            mime_type,
            file_name,
            location_kind,
            location_key,
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// The first six characters of `unique_id`, used to authorize a link.
    /// This is tamper-deterrence only (36 bits of entropy), never a security
    /// boundary — no constant-time comparison is warranted.
    pub fn hash(&self) -> &str {
        &self.unique_id[..6]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LocationKey {
        LocationKey::default()
    }

    #[test]
    fn rejects_short_unique_id() {
        let err = ObjectDescriptor::new(
            1,
            2,
            "abcde".into(),
            10,
            "video/mp4".into(),
            "f.mp4".into(),
            LocationKind::Document,
            key(),
        )
        .unwrap_err();
        assert!(matches!(err, DescriptorError::UniqueIdTooShort(5)));
    }

    #[test]
    fn hash_is_first_six_chars() {
        let desc = ObjectDescriptor::new(
            1,
            2,
            "AbCdEfGhIj".into(),
            10,
            "video/mp4".into(),
            "f.mp4".into(),
            LocationKind::Document,
            key(),
        )
        .unwrap();
        assert_eq!(desc.hash(), "AbCdEf");
        assert_eq!(desc.unique_id(), "AbCdEfGhIj");
    }
}
