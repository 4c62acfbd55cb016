use crate::ObjectId;

/// Derived per HTTP hit; never persisted.
#[derive(Clone, Debug)]
pub struct StreamRequest {
    pub object_id: ObjectId,
    pub provided_hash: String,
    pub range_from: u64,
    pub range_to: u64,
    pub is_download: bool,
    pub player_hint: Option<String>,
}

impl StreamRequest {
    pub fn body_length(&self) -> u64 {
        self.range_to - self.range_from + 1
    }
}
