use axum::http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

use super::event::Envelope;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("request body is not valid JSON-LD")]
    MalformedBody,

    #[error("request body is required")]
    MissingPayload,

    #[error("{0}")]
    IdentityMismatch(String),

    #[error("resource not found")]
    NotFound,

    #[error("resource already exists")]
    Conflict,

    #[error("Failed to render response")]
    Render,

    #[error("mutation failed")]
    Mutation,

    #[error("method {0} is not supported")]
    UnsupportedMethod(String),

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl ApiError {
    pub(crate) fn type_mismatch(expected: &str, actual: Option<&Value>) -> ApiError {
        ApiError::IdentityMismatch(format!(
            "Resource type does not correspond with type in payload ('{expected}' != '{}')",
            display(actual)
        ))
    }

    pub(crate) fn id_mismatch(url: &str, actual: Option<&Value>) -> ApiError {
        ApiError::IdentityMismatch(format!(
            "Resource ID does not match ID in payload ('{url}' != '{}')",
            display(actual)
        ))
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody
            | ApiError::MissingPayload
            | ApiError::IdentityMismatch(_)
            | ApiError::Render => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Mutation | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnsupportedMethod(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    /// Diagnostic body; only client errors the caller can act on carry one.
    pub(crate) fn body(&self) -> Option<Value> {
        match self {
            ApiError::IdentityMismatch(_) | ApiError::Render => {
                Some(json!({"error": self.to_string()}))
            }
            _ => None,
        }
    }
}

impl From<ApiError> for Envelope {
    fn from(error: ApiError) -> Self {
        Envelope::new(error.status(), error.body().as_ref(), vec![])
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(value)) => value.clone(),
        Some(value) => value.to_string(),
        None => String::new(),
    }
}
