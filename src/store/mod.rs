//! Document storage layer.
//!
//! Handlers talk to the database through the [`DocumentStore`] trait, which
//! exposes the handful of collection operations the API needs. Documents
//! cross this boundary as JSON objects; the `_id` field is always rendered as
//! a 24-character hex string.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │          DocumentStore Trait            │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │   MongoStore    │    │    MemoryStore      │
//! │  (production)   │    │  (tests, dev mode)  │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod memory;
mod mongo;

use std::fmt;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{StoreResult, ValidationError};

pub use memory::MemoryStore;
pub use mongo::{MongoStore, DEFAULT_DB_APP_NAME, DEFAULT_DB_HOST, DEFAULT_DB_NAME};

/// Name of the identifier field on every stored document.
pub const ID_FIELD: &str = "_id";

/// A loosely-typed stored document.
pub type Document = serde_json::Map<String, Value>;

// =============================================================================
// Collections
// =============================================================================

/// The collections this server reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Assignments,
    Submissions,
    Users,
    Features,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Assignments,
        Collection::Submissions,
        Collection::Users,
        Collection::Features,
    ];

    /// Collection name in the database.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Assignments => "assignments",
            Collection::Submissions => "submitassignments",
            Collection::Users => "users",
            Collection::Features => "features",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Document Ids
// =============================================================================

/// Store-generated document identifier (a MongoDB ObjectId).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Parse a 24-character hex id taken from a request path.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        ObjectId::parse_str(raw)
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(raw.to_string()))
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Conjunction of field equality conditions. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Filter that matches every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching documents whose `field` equals `value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the filter against an in-memory document.
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }
}

// =============================================================================
// Operation Results
// =============================================================================

/// Result of a single insert, serialized the way the MongoDB driver reports it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

/// Result of an upserting update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<DocumentId>,
}

/// Result of a single delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

// =============================================================================
// DocumentStore Trait
// =============================================================================

/// Collection operations backing the HTTP API.
///
/// Every handler performs exactly one of these calls. Implementations must be
/// safe to share across concurrent requests.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Return every document in `collection` matching `filter`, in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Return the document with the given id, if any.
    async fn find_one(&self, collection: Collection, id: DocumentId)
        -> StoreResult<Option<Document>>;

    /// Insert a document under a freshly generated id.
    ///
    /// Any `_id` already present in `document` is replaced.
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> StoreResult<InsertOneResult>;

    /// Set `fields` on the document with the given id, creating it if absent.
    ///
    /// Fields not named in `fields` are left untouched.
    async fn upsert_one(
        &self,
        collection: Collection,
        id: DocumentId,
        fields: Document,
    ) -> StoreResult<UpdateResult>;

    /// Number of documents in `collection` matching `filter`.
    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<u64>;

    /// Delete the document with the given id.
    async fn delete_one(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteResult>;

    /// Round-trip to the backend to confirm it is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
