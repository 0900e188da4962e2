//! HTTP server layer for the group study API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │      /assignments  /submits  /submition  /users  /jwt  ...      │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (requests)  │  │  (cookie)   │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                      DocumentStore (Mongo / memory)
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{
    auth_middleware, clear_token_cookie, token_cookie, AuthenticatedUser, TOKEN_COOKIE,
    UNAUTHORIZED_MESSAGE,
};
pub use handlers::{
    authorize_owner, health_handler, root_handler, ApiError, ApiQuery, AppState, ErrorResponse,
    HealthResponse, SubmissionsQueryParams, SuccessResponse, ValidatedJson, FORBIDDEN_MESSAGE,
    ROOT_MESSAGE,
};
pub use routes::{create_router, RouterConfig, DEFAULT_CORS_ORIGINS};
