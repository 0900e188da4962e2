//! Router configuration for the group study API.
//!
//! This module wires the handlers to their paths and applies the credential
//! check, CORS and request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /                       - Banner (public)
//! /health                 - Health check (public)
//! /features               - Feature listing (public)
//! /assignments[/{id}]     - Assignment CRUD (public)
//! /assignment/{id}        - Assignment read / upsert (public)
//! /submition              - All submissions (cookie credential)
//! /submits                - GET: own submissions (cookie credential), POST: public
//! /submits/{id}           - Submission read / upsert (public)
//! /users                  - Register (public)
//! /jwt, /logout           - Set / clear the credential cookie
//! ```
//!
//! # Example
//!
//! ```ignore
//! use group_study_server::server::routes::{create_router, RouterConfig};
//! use group_study_server::store::MemoryStore;
//!
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["http://localhost:5173".to_string()]);
//!
//! let router = create_router(MemoryStore::new(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::auth::auth_middleware;
use super::handlers::{
    all_submissions_handler, assignment_handler, assignments_handler, create_assignment_handler,
    create_submission_handler, create_user_handler, delete_assignment_handler, features_handler,
    health_handler, issue_token_handler, logout_handler, my_submissions_handler, root_handler,
    submission_handler, update_assignment_handler, update_submission_handler, AppState,
};
use crate::store::DocumentStore;
use crate::token::TokenService;

/// Browser origins of the hosted web client.
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = [
    "https://online-group-study-7e47f.web.app",
    "https://online-group-study-7e47f.firebaseapp.com",
];

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// HMAC secret for signing and verifying credentials
    pub token_secret: String,

    /// Allowed CORS origins; credentials are always allowed
    pub cors_origins: Vec<String>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration with the given token secret.
    ///
    /// By default:
    /// - CORS allows the hosted web client origins
    /// - Tracing is enabled
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            enable_tracing: true,
        }
    }

    /// Replace the allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router over `store`.
///
/// Only `GET /submition` and `GET /submits` sit behind the credential check;
/// every other route is public.
pub fn create_router<S: DocumentStore>(store: S, config: RouterConfig) -> Router {
    let tokens = TokenService::new(&config.token_secret);
    let app_state = AppState::new(store, tokens.clone());
    let require_auth = middleware::from_fn_with_state(tokens, auth_middleware);
    let cors = build_cors_layer(&config);

    // route_layer on a MethodRouter only wraps the methods added before it,
    // so POST /submits stays public.
    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/features", get(features_handler::<S>))
        .route(
            "/assignments",
            get(assignments_handler::<S>).post(create_assignment_handler::<S>),
        )
        .route(
            "/assignment/{id}",
            get(assignment_handler::<S>).put(update_assignment_handler::<S>),
        )
        .route(
            "/assignments/{id}",
            get(assignment_handler::<S>).delete(delete_assignment_handler::<S>),
        )
        .route(
            "/submition",
            get(all_submissions_handler::<S>).route_layer(require_auth.clone()),
        )
        .route(
            "/submits",
            get(my_submissions_handler::<S>)
                .route_layer(require_auth)
                .post(create_submission_handler::<S>),
        )
        .route(
            "/submits/{id}",
            get(submission_handler::<S>).put(update_submission_handler::<S>),
        )
        .route("/users", post(create_user_handler::<S>))
        .route("/jwt", post(issue_token_handler::<S>))
        .route("/logout", post(logout_handler))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
///
/// Credentialed CORS cannot use wildcards, so methods, headers and origins
/// are all listed explicitly.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
}

// =============================================================================
// Tests
// =============================================================================
