use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use api::link::{LinkRecord, Token};
use api::ObjectId;

use super::LinkStore;

/// In-memory fallback used when no durable backend is configured
/// (`DATABASE_URL` unset). Links do not survive a restart.
#[derive(Default)]
pub struct MemoryLinkStore {
    by_token: DashMap<Token, LinkRecord>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        MemoryLinkStore::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn put(&self, record: LinkRecord) -> Result<()> {
        self.by_token.insert(record.token.clone(), record);
        Ok(())
    }

    async fn get(&self, token: &Token) -> Result<Option<LinkRecord>> {
        Ok(self.by_token.get(token).map(|entry| entry.clone()))
    }

    async fn delete(&self, token: &Token) -> Result<()> {
        self.by_token.remove(token);
        Ok(())
    }

    async fn find_by_object(&self, object_id: ObjectId) -> Result<Vec<LinkRecord>> {
        Ok(self
            .by_token
            .iter()
            .filter(|entry| entry.value().object_id == object_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
