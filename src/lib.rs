//! # Group Study Server
//!
//! REST API behind the online group study web app: assignments, student
//! submissions and grading, user registration, and cookie-based credentials.
//!
//! Every endpoint maps to one document store operation (find, find one,
//! insert, upsert, delete). The only logic of its own is issuing and
//! verifying signed credentials and checking that a caller only lists their
//! own submissions.
//!
//! ## Architecture
//!
//! - [`store`] - `DocumentStore` trait with MongoDB and in-memory backends
//! - [`token`] - HS256 credential issuing and verification
//! - [`models`] - Validated request bodies
//! - [`server`] - Axum handlers, cookie auth middleware and router
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types shared across layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use group_study_server::{create_router, MemoryStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let router = create_router(MemoryStore::new(), RouterConfig::new("my-secret-key"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{
    CheckConfig, Cli, Command, DatabaseConfig, ServeConfig, StoreBackend, TokenConfig,
    TokenOutputFormat,
};
pub use error::{AuthError, StoreError, TokenError, ValidationError};
pub use models::{AssignmentUpdate, NewAssignment, NewSubmission, NewUser, SubmissionUpdate};
pub use server::{create_router, AppState, AuthenticatedUser, RouterConfig};
pub use store::{
    Collection, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    MemoryStore, MongoStore, UpdateResult,
};
pub use token::{TokenClaims, TokenService};
