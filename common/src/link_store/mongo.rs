use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use api::link::{DomainTag, LinkDisplay, LinkRecord, Token};
use api::ObjectId;

use super::LinkStore;

/// Wire shape for the `links` collection. `LinkRecord` itself already
/// derives `Serialize`/`Deserialize`, but Mongo needs its own `_id`, so this
/// wraps it rather than reusing the API type directly as the document.
#[derive(Serialize, Deserialize)]
struct LinkDoc {
    #[serde(rename = "_id")]
    token: String,
    object_id: ObjectId,
    display: LinkDisplay,
    domain_tag: Option<DomainTag>,
    thumbnail_url: Option<String>,
    created_at: i64,
}

impl From<LinkRecord> for LinkDoc {
    fn from(record: LinkRecord) -> Self {
        LinkDoc {
            token: record.token.as_str().to_string(),
            object_id: record.object_id,
            display: record.display,
            domain_tag: record.domain_tag,
            thumbnail_url: record.thumbnail_url,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<LinkDoc> for LinkRecord {
    type Error = anyhow::Error;

    fn try_from(doc: LinkDoc) -> Result<Self> {
        let token = Token::parse(&doc.token).context("corrupt token stored in link store")?;
        Ok(LinkRecord {
            token,
            object_id: doc.object_id,
            display: doc.display,
            domain_tag: doc.domain_tag,
            thumbnail_url: doc.thumbnail_url,
            created_at: doc.created_at,
        })
    }
}

/// Durable link store backed by MongoDB, matching the document-oriented
/// storage this system originally used for link records.
pub struct MongoLinkStore {
    collection: Collection<LinkDoc>,
}

impl MongoLinkStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let client = Client::with_uri_str(database_url)
            .await
            .context("connecting to link store")?;
        let db = client.default_database().context(
            "DATABASE_URL must name a default database, e.g. mongodb://host/streamgate",
        )?;
        let collection = db.collection::<LinkDoc>("links");

        collection
            .create_index(IndexModel::builder().keys(doc! { "object_id": 1 }).build())
            .await
            .context("creating object_id index")?;

        Ok(MongoLinkStore { collection })
    }
}

#[async_trait]
impl LinkStore for MongoLinkStore {
    async fn put(&self, record: LinkRecord) -> Result<()> {
        let doc: LinkDoc = record.into();
        self.collection
            .replace_one(doc! { "_id": &doc.token }, &doc)
            .upsert(true)
            .await
            .context("inserting link record")?;
        Ok(())
    }

    async fn get(&self, token: &Token) -> Result<Option<LinkRecord>> {
        let found = self
            .collection
            .find_one(doc! { "_id": token.as_str() })
            .await
            .context("fetching link record")?;
        found.map(LinkRecord::try_from).transpose()
    }

    async fn delete(&self, token: &Token) -> Result<()> {
        self.collection
            .delete_one(doc! { "_id": token.as_str() })
            .await
            .context("deleting link record")?;
        Ok(())
    }

    async fn find_by_object(&self, object_id: ObjectId) -> Result<Vec<LinkRecord>> {
        use futures_util::TryStreamExt;

        let mut cursor = self
            .collection
            .find(doc! { "object_id": object_id })
            .await
            .context("querying links by object")?;
        let mut out = Vec::new();
        while let Some(doc) = cursor.try_next().await.context("reading link cursor")? {
            out.push(LinkRecord::try_from(doc)?);
        }
        Ok(out)
    }
}
