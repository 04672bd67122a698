//! Error types for request/response contract enforcement.

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::types::{Facet, Issue};

/// Boxed error type used for unexpected failures that must propagate
/// untouched through the wrapper.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors while loading declarative route configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// A declared schema that the validator could not compile.
///
/// This is a configuration bug, not a client error: it surfaces as an
/// unexpected failure rather than a 400 or 500 contract response.
#[derive(Debug, Error)]
#[error("schema failed to compile: {message}")]
pub struct SchemaCompileError {
    pub message: String,
}

/// A request rejected before application logic ran. Always rendered as a
/// 400 response; the handler never runs.
#[derive(Debug, Error)]
pub enum InputRejection {
    /// A declared facet schema rejected the extracted value.
    #[error("{} validation failed with {} issue(s)", facet.label(), issues.len())]
    Invalid { facet: Facet, issues: Vec<Issue> },

    /// The request body claimed `application/json` but did not parse.
    /// Parsing precedes validation, so this fires even when body
    /// validation is skipped or undeclared.
    #[error("request body is not valid JSON: {message}")]
    BodyParse { message: String },
}

impl InputRejection {
    /// The facet this rejection is attributed to.
    pub fn facet(&self) -> Facet {
        match self {
            InputRejection::Invalid { facet, .. } => *facet,
            InputRejection::BodyParse { .. } => Facet::Body,
        }
    }

    /// Issues suitable for the detailed client payload.
    pub fn issues(&self) -> Vec<Issue> {
        match self {
            InputRejection::Invalid { issues, .. } => issues.clone(),
            InputRejection::BodyParse { message } => vec![Issue {
                path: String::new(),
                message: message.clone(),
                keyword: "json".into(),
            }],
        }
    }
}

/// Which part of the response violated its declared contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputScope {
    Body,
    Header(String),
}

impl std::fmt::Display for OutputScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputScope::Body => f.write_str("body"),
            OutputScope::Header(name) => write!(f, "header \"{name}\""),
        }
    }
}

/// A response that violated its declared output contract after the handler
/// already ran. Always rendered as a 500 response and always logged with
/// full issue detail server-side.
#[derive(Debug, Error)]
#[error("response {scope} for status {status} failed validation with {} issue(s)", issues.len())]
pub struct OutputRejection {
    pub scope: OutputScope,
    /// The status the handler intended to return.
    pub status: u16,
    pub issues: Vec<Issue>,
    /// Whether the client payload may carry the issue detail.
    pub show_error_message: bool,
}

/// An intentional non-2xx outcome raised by application logic.
///
/// Carries exactly a status and a body; the wrapper validates the body
/// against any output schema declared for that status before honoring it.
#[derive(Debug, Clone, Error)]
#[error("handler raised {status}")]
pub struct DomainError {
    pub status: StatusCode,
    pub body: Value,
}

impl DomainError {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

/// Everything a wrapped handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Intentional outcome, subject to the declared output contract.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Anything else. Never converted into a response by this crate;
    /// propagates untouched as the service error.
    #[error("handler failed: {0}")]
    Unexpected(BoxError),
}

impl HandlerError {
    /// Wrap an arbitrary error as an unexpected failure.
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        HandlerError::Unexpected(err.into())
    }
}
