//! Request schemas for assignments, submissions and users.
//!
//! Bodies are deserialized into these structs and validated before anything
//! reaches the store. Field names on the wire follow the web client
//! (`imageURL`, `difficultyLevel`, `studentName`, `assignment_id`, ...).
//!
//! Creation bodies turn into a full [`Document`]; update bodies turn into the
//! set of fields to overwrite, leaving absent fields untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use validator::{Validate, ValidationError as FieldError};

use crate::error::ValidationError;
use crate::store::Document;

/// Difficulty label shown on an assignment card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

fn non_negative(value: &Number) -> Result<(), FieldError> {
    match value.as_f64() {
        Some(v) if v >= 0.0 => Ok(()),
        _ => Err(FieldError::new("non_negative").with_message("Marks cannot be negative".into())),
    }
}

/// Serialize a validated body into a store document.
fn into_document<T: Serialize>(value: &T) -> Result<Document, ValidationError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::MalformedBody(
            "expected a JSON object".to_string(),
        )),
        Err(e) => Err(ValidationError::MalformedBody(e.to_string())),
    }
}

/// Serialize an update body, refusing one that names no fields.
fn into_update<T: Serialize>(value: &T) -> Result<Document, ValidationError> {
    let fields = into_document(value)?;
    if fields.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    Ok(fields)
}

// =============================================================================
// Assignments
// =============================================================================

/// Body of `POST /assignments`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAssignment {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[validate(custom(function = "non_negative"))]
    pub marks: Number,

    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(rename = "difficultyLevel", default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,

    /// Due date as sent by the client (ISO date string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl NewAssignment {
    pub fn into_document(self) -> Result<Document, ValidationError> {
        into_document(&self)
    }
}

/// Body of `PUT /assignment/{id}`. Only present fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AssignmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "non_negative"))]
    pub marks: Option<Number>,

    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(rename = "difficultyLevel", default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<DifficultyLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl AssignmentUpdate {
    pub fn into_fields(self) -> Result<Document, ValidationError> {
        into_update(&self)
    }
}

// =============================================================================
// Submissions
// =============================================================================

/// Body of `POST /submits`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Link to (or inline reference of) the submitted PDF
    #[validate(length(min = 1, message = "PDF link cannot be empty"))]
    pub pdf: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "non_negative"))]
    pub marks: Option<Number>,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(rename = "studentName", default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,

    /// Id of the assignment being answered. Not checked against the
    /// assignments collection.
    #[validate(length(min = 1, message = "Assignment id cannot be empty"))]
    pub assignment_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "non_negative"))]
    pub givemark: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl NewSubmission {
    pub fn into_document(self) -> Result<Document, ValidationError> {
        into_document(&self)
    }
}

/// Body of `PUT /submits/{id}`, typically a grader recording `givemark`
/// and `feedback`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmissionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "non_negative"))]
    pub marks: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(rename = "studentName", default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "non_negative"))]
    pub givemark: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl SubmissionUpdate {
    pub fn into_fields(self) -> Result<Document, ValidationError> {
        into_update(&self)
    }
}

// =============================================================================
// Users
// =============================================================================

/// Body of `POST /users`.
///
/// Only `email` is required; profile fields the client adds are kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewUser {
    pub fn into_document(self) -> Result<Document, ValidationError> {
        into_document(&self)
    }
}
