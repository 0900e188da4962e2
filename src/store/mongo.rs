//! MongoDB-backed document store.
//!
//! Wraps a single [`mongodb::Client`] (which owns its own connection pool) and
//! translates between JSON documents and BSON. Stored `ObjectId`s are rendered
//! as 24-character hex strings on the way out.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson};
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

use super::{
    Collection, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    UpdateResult, ID_FIELD,
};

/// Default Atlas cluster host.
pub const DEFAULT_DB_HOST: &str = "cluster0.jm3t3oc.mongodb.net";

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "onlinegroupstudyDB";

/// Default `appName` connection option.
pub const DEFAULT_DB_APP_NAME: &str = "Cluster0";

/// MongoDB implementation of [`DocumentStore`].
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect with the Stable API v1 (strict, deprecation errors enabled).
    ///
    /// The driver connects lazily; call [`DocumentStore::ping`] to verify the
    /// deployment is reachable.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let server_api = ServerApi::builder()
            .version(ServerApiVersion::V1)
            .strict(true)
            .deprecation_errors(true)
            .build();
        options.server_api = Some(server_api);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;
        let database = client.database(database);

        info!(database = database.name(), "MongoDB client created");
        Ok(Self { client, database })
    }

    /// Build an SRV connection string, percent-encoding the credentials.
    pub fn connection_uri(user: &str, password: &str, host: &str, app_name: &str) -> String {
        format!(
            "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority&appName={}",
            urlencoding::encode(user),
            urlencoding::encode(password),
            host,
            urlencoding::encode(app_name)
        )
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<bson::Document> {
        self.database.collection(collection.name())
    }
}

// =============================================================================
// JSON <-> BSON
// =============================================================================

fn id_filter(id: DocumentId) -> bson::Document {
    let mut filter = bson::Document::new();
    filter.insert(ID_FIELD, id.object_id());
    filter
}

fn to_bson_filter(filter: &Filter) -> StoreResult<bson::Document> {
    let mut query = bson::Document::new();
    for (field, value) in filter.conditions() {
        query.insert(field.clone(), bson::to_bson(value)?);
    }
    Ok(query)
}

fn to_bson_document(document: &Document) -> StoreResult<bson::Document> {
    Ok(bson::to_document(document)?)
}

fn to_json_document(mut document: bson::Document) -> StoreResult<Document> {
    if let Some(Bson::ObjectId(oid)) = document.get(ID_FIELD) {
        let hex = oid.to_hex();
        document.insert(ID_FIELD, Bson::String(hex));
    }
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn to_document_id(value: &Bson) -> StoreResult<DocumentId> {
    match value {
        Bson::ObjectId(oid) => Ok(DocumentId::from(*oid)),
        Bson::String(s) => ObjectId::parse_str(s)
            .map(DocumentId::from)
            .map_err(|e| StoreError::Serialization(e.to_string())),
        other => Err(StoreError::Serialization(format!(
            "unexpected id type: {}",
            other
        ))),
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        let query = to_bson_filter(filter)?;
        let cursor = self.collection(collection).find(query).await?;
        let documents: Vec<bson::Document> = cursor.try_collect().await?;

        debug!(collection = %collection, count = documents.len(), "find");
        documents.into_iter().map(to_json_document).collect()
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        self.collection(collection)
            .find_one(id_filter(id))
            .await?
            .map(to_json_document)
            .transpose()
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> StoreResult<InsertOneResult> {
        let mut document = to_bson_document(&document)?;
        let id = DocumentId::generate();
        document.insert(ID_FIELD, id.object_id());

        let result = self.collection(collection).insert_one(document).await?;
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: to_document_id(&result.inserted_id)?,
        })
    }

    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        mut fields: Document,
    ) -> StoreResult<UpdateResult> {
        fields.remove(ID_FIELD);
        let update = doc! { "$set": to_bson_document(&fields)? };

        let result = self
            .collection(collection)
            .update_one(id_filter(id), update)
            .upsert(true)
            .await?;

        let upserted_id = result
            .upserted_id
            .as_ref()
            .map(to_document_id)
            .transpose()?;

        Ok(UpdateResult {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(upserted_id.is_some()),
            upserted_id,
        })
    }

    async fn delete_one(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteResult> {
        let result = self.collection(collection).delete_one(id_filter(id)).await?;
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64> {
        let query = to_bson_filter(filter)?;
        Ok(self.collection(collection).count_documents(query).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}
