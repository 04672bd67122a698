//! Core vocabulary types shared across the validation pipeline.

use serde::{Deserialize, Serialize};

/// One independently validated slice of a request or response.
///
/// Request facets are validated in the fixed order given by
/// [`Facet::INPUT_ORDER`]; the `Body` facet also names the response body
/// when resolving response-side flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    Headers,
    Query,
    PathParams,
    Cookies,
    Body,
}

impl Facet {
    /// Fixed input validation order. The first failing facet short-circuits
    /// the rest, so this order is part of the wire contract.
    pub const INPUT_ORDER: [Facet; 5] = [
        Facet::Headers,
        Facet::Query,
        Facet::PathParams,
        Facet::Cookies,
        Facet::Body,
    ];

    /// Human-readable label used in client-facing error payloads.
    pub fn label(&self) -> &'static str {
        match self {
            Facet::Headers => "Headers",
            Facet::Query => "Query",
            Facet::PathParams => "Path params",
            Facet::Cookies => "Cookies",
            Facet::Body => "Body",
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a flag is being resolved for the request or the response side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// Deployment environment, used for the builtin `show_error_message`
/// default: verbose in development, terse everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Detect the environment from the `APP_ENV` variable.
    ///
    /// `development` or `dev` (case-insensitive) selects development;
    /// anything else, including an unset variable, selects production.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV") {
            Ok(v) if v.eq_ignore_ascii_case("development") || v.eq_ignore_ascii_case("dev") => {
                Environment::Development
            }
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Single validation issue with field context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Dotted path to the offending value (`"email"`, `"items.0.id"`,
    /// empty string for the root).
    pub path: String,
    /// Human-readable error message.
    pub message: String,
    /// The JSON Schema keyword that rejected the value.
    pub keyword: String,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.keyword)
    }
}
