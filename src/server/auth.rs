//! Cookie-based credential authentication.
//!
//! `POST /jwt` stores a signed token in the `token` cookie; protected routes
//! run [`auth_middleware`], which reads that cookie back, verifies it and
//! makes the decoded claims available to the handler:
//!
//! ```text
//! request ──► cookie "token"? ──no──► 401 {"message":"Unauthorized access"}
//!                  │yes
//!                  ▼
//!             verify(token) ──err──► 401 {"message":"Unauthorized access"}
//!                  │ok
//!                  ▼
//!      extensions += AuthenticatedUser(claims) ──► handler
//! ```
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::get, Router};
//! use group_study_server::server::auth::auth_middleware;
//! use group_study_server::token::TokenService;
//!
//! let tokens = TokenService::new("secret-key");
//! let app = Router::new()
//!     .route("/submition", get(handler))
//!     .route_layer(middleware::from_fn_with_state(tokens, auth_middleware));
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use super::handlers::ErrorResponse;
use crate::error::AuthError;
use crate::token::{TokenClaims, TokenService};

/// Name of the cookie carrying the credential.
pub const TOKEN_COOKIE: &str = "token";

/// Body message for every 401 from the auth layer.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";

/// Claims of the caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl AuthenticatedUser {
    pub fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        debug!(reason = %self, "Authentication failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(UNAUTHORIZED_MESSAGE)),
        )
            .into_response()
    }
}

/// Reject requests without a valid `token` cookie; otherwise attach the
/// caller's claims and continue.
pub async fn auth_middleware(
    State(tokens): State<TokenService>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let claims = tokens.verify(&token)?;
    debug!(email = ?claims.email, "Authenticated request");

    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Cookie that carries a freshly issued credential.
pub fn token_cookie(token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build()
}

/// Removal cookie for `POST /logout`: empty value, `Max-Age=0`, expiry in
/// the past. Attributes match [`token_cookie`] so browsers drop it.
pub fn clear_token_cookie() -> Cookie<'static> {
    let mut cookie = token_cookie(String::new());
    cookie.make_removal();
    cookie
}

// =============================================================================
// Tests
// =============================================================================
