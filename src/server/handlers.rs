//! HTTP request handlers for the group study API.
//!
//! Each handler parses its path, query and body, performs exactly one store
//! operation and returns the result as JSON.
//!
//! # Endpoints
//!
//! - `GET /features` - Feature listing
//! - `GET /assignments`, `POST /assignments` - List / create assignments
//! - `GET|PUT /assignment/{id}`, `GET|DELETE /assignments/{id}` - Single assignment
//! - `GET /submition` - All submissions (authenticated)
//! - `GET /submits?email=` - Caller's own submissions (authenticated, owner only)
//! - `POST /submits`, `GET|PUT /submits/{id}` - Create / read / grade a submission
//! - `POST /users` - Register a user
//! - `POST /jwt`, `POST /logout` - Set / clear the credential cookie
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::error::{StoreError, TokenError, ValidationError};
use crate::models::{AssignmentUpdate, NewAssignment, NewSubmission, NewUser, SubmissionUpdate};
use crate::store::{
    Collection, DeleteResult, Document, DocumentId, DocumentStore, Filter, InsertOneResult,
    UpdateResult,
};
use crate::token::{TokenClaims, TokenService};

use super::auth::{clear_token_cookie, token_cookie, AuthenticatedUser};

/// Body message for owner-check failures.
pub const FORBIDDEN_MESSAGE: &str = "forbidden access";

/// Plain-text banner served at `/`.
pub const ROOT_MESSAGE: &str = "Online Group Study Server is Running.";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state: the document store and the token service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: DocumentStore> {
    pub store: Arc<S>,
    pub tokens: TokenService,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(store: S, tokens: TokenService) -> Self {
        Self {
            store: Arc::new(store),
            tokens,
        }
    }
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: self.tokens.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for `GET /submits`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionsQueryParams {
    /// Submitter email; must match the caller's token
    #[serde(default)]
    pub email: Option<String>,
}

/// JSON body extractor that also runs `validator` checks.
///
/// Malformed JSON and failed validation both become a 400 with a
/// `{"message": ...}` body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;
        value.validate().map_err(ValidationError::from)?;
        Ok(ValidatedJson(value))
    }
}

/// Query string extractor whose rejection is a 400 with a
/// `{"message": ...}` body.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ValidationError::MalformedQuery(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    DocumentId::parse(raw).map_err(ApiError::from)
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for every handled failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement returned by `/jwt` and `/logout`.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Failures a handler can return.
///
/// 4xx errors are logged at WARN level, 5xx at ERROR level.
#[derive(Debug)]
pub enum ApiError {
    /// Bad id, malformed body or failed field validation (400)
    Validation(ValidationError),

    /// Authenticated caller asked for someone else's data (403)
    Forbidden,

    /// Store failure (500)
    Store(StoreError),

    /// Could not sign a credential (500)
    Token(TokenError),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Token(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE.to_string()),
            ApiError::Store(_) | ApiError::Token(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        match &self {
            ApiError::Store(err) => error!(status = status.as_u16(), "Store error: {}", err),
            ApiError::Token(err) => error!(status = status.as_u16(), "Token error: {}", err),
            _ => warn!(status = status.as_u16(), "Request rejected: {}", message),
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Owner check for email-scoped listings: the token's `email` claim must
/// equal the requested email exactly.
pub fn authorize_owner(user: &AuthenticatedUser, requested: Option<&str>) -> Result<(), ApiError> {
    if user.email() != requested {
        warn!(
            token_email = ?user.email(),
            requested = ?requested,
            "Token owner does not match requested email"
        );
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

// =============================================================================
// Service Endpoints
// =============================================================================

/// `GET /`
pub async fn root_handler() -> &'static str {
    ROOT_MESSAGE
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Features
// =============================================================================

/// `GET /features`
pub async fn features_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let features = state
        .store
        .find(Collection::Features, &Filter::all())
        .await?;
    Ok(Json(features))
}

// =============================================================================
// Assignments
// =============================================================================

/// `GET /assignments`
pub async fn assignments_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let assignments = state
        .store
        .find(Collection::Assignments, &Filter::all())
        .await?;
    Ok(Json(assignments))
}

/// `GET /assignment/{id}` and `GET /assignments/{id}`
///
/// Responds with `null` when no assignment has the id.
pub async fn assignment_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = parse_id(&id)?;
    let assignment = state.store.find_one(Collection::Assignments, id).await?;
    Ok(Json(assignment))
}

/// `POST /assignments`
pub async fn create_assignment_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    ValidatedJson(assignment): ValidatedJson<NewAssignment>,
) -> Result<Json<InsertOneResult>, ApiError> {
    debug!(title = %assignment.title, "Creating assignment");
    let document = assignment.into_document()?;
    let result = state
        .store
        .insert_one(Collection::Assignments, document)
        .await?;
    info!(id = %result.inserted_id, "Assignment created");
    Ok(Json(result))
}

/// `PUT /assignment/{id}`
///
/// Overwrites the fields present in the body; creates the assignment under
/// `id` if it does not exist.
pub async fn update_assignment_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<AssignmentUpdate>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = parse_id(&id)?;
    let fields = update.into_fields()?;
    let result = state
        .store
        .upsert_one(Collection::Assignments, id, fields)
        .await?;
    Ok(Json(result))
}

/// `DELETE /assignments/{id}`
pub async fn delete_assignment_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let id = parse_id(&id)?;
    let result = state.store.delete_one(Collection::Assignments, id).await?;
    info!(id = %id, deleted = result.deleted_count, "Assignment delete");
    Ok(Json(result))
}

// =============================================================================
// Submissions
// =============================================================================

/// `GET /submition` (authenticated)
pub async fn all_submissions_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Document>>, ApiError> {
    debug!(email = ?user.email(), "Listing all submissions");
    let submissions = state
        .store
        .find(Collection::Submissions, &Filter::all())
        .await?;
    Ok(Json(submissions))
}

/// `GET /submits?email=` (authenticated, owner only)
///
/// The email query must equal the token's email claim, otherwise 403. The
/// listing is then filtered by that email, or unfiltered when none was given.
pub async fn my_submissions_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(params): ApiQuery<SubmissionsQueryParams>,
) -> Result<Json<Vec<Document>>, ApiError> {
    authorize_owner(&user, params.email.as_deref())?;

    let filter = match params.email {
        Some(email) => Filter::eq("email", email),
        None => Filter::all(),
    };
    let submissions = state.store.find(Collection::Submissions, &filter).await?;
    Ok(Json(submissions))
}

/// `GET /submits/{id}`
pub async fn submission_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let id = parse_id(&id)?;
    let submission = state.store.find_one(Collection::Submissions, id).await?;
    Ok(Json(submission))
}

/// `POST /submits`
pub async fn create_submission_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    ValidatedJson(submission): ValidatedJson<NewSubmission>,
) -> Result<Json<InsertOneResult>, ApiError> {
    debug!(
        email = %submission.email,
        assignment_id = %submission.assignment_id,
        "Creating submission"
    );
    let document = submission.into_document()?;
    let result = state
        .store
        .insert_one(Collection::Submissions, document)
        .await?;
    Ok(Json(result))
}

/// `PUT /submits/{id}`
pub async fn update_submission_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<SubmissionUpdate>,
) -> Result<Json<UpdateResult>, ApiError> {
    let id = parse_id(&id)?;
    let fields = update.into_fields()?;
    let result = state
        .store
        .upsert_one(Collection::Submissions, id, fields)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Users
// =============================================================================

/// `POST /users`
pub async fn create_user_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    ValidatedJson(user): ValidatedJson<NewUser>,
) -> Result<Json<InsertOneResult>, ApiError> {
    debug!(email = %user.email, "Creating user");
    let document = user.into_document()?;
    let result = state.store.insert_one(Collection::Users, document).await?;
    Ok(Json(result))
}

// =============================================================================
// Credentials
// =============================================================================

/// `POST /jwt`
///
/// Signs the body's claims and sets them as the `token` cookie.
pub async fn issue_token_handler<S: DocumentStore>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    ValidatedJson(claims): ValidatedJson<TokenClaims>,
) -> Result<(CookieJar, Json<SuccessResponse>), ApiError> {
    info!(email = ?claims.email, "Issuing token");
    let token = state.tokens.issue(&claims)?;
    Ok((
        jar.add(token_cookie(token)),
        Json(SuccessResponse { success: true }),
    ))
}

/// `POST /logout`
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    info!("Clearing token cookie");
    (
        jar.add(clear_token_cookie()),
        Json(SuccessResponse { success: true }),
    )
}

// =============================================================================
// Tests
// =============================================================================
