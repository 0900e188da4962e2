use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not reach or authenticate against the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected or failed an operation
    #[error("Database error: {0}")]
    Database(String),

    /// A document could not be converted between JSON and the wire format
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Request input that failed boundary checks (maps to HTTP 400).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Path id is not a 24-character hex ObjectId
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Body could not be parsed as the expected JSON shape
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Query string could not be parsed into the expected parameters
    #[error("Malformed query string: {0}")]
    MalformedQuery(String),

    /// Body parsed but one or more fields failed validation
    #[error("{0}")]
    InvalidFields(String),

    /// Upsert request carried no fields to write
    #[error("Update must set at least one field")]
    EmptyUpdate,
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::InvalidFields(format_validation_errors(&errors))
    }
}

/// Join every field and schema message into one line, `"; "` separated.
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .errors()
        .iter()
        .flat_map(|(field, kind)| match kind {
            validator::ValidationErrorsKind::Field(errs) => errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
                .collect::<Vec<_>>(),
            _ => vec![format!("{} is invalid", field)],
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Credential failures. Both variants surface as the same 401 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `token` cookie on the request
    #[error("Missing credential")]
    MissingToken,

    /// Signature mismatch, malformed token, or expired
    #[error("Invalid or expired credential")]
    InvalidOrExpired,
}

/// Failures while signing a new credential.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encode(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
