//! Declarative per-route, per-method validation configuration.
//!
//! A [`RouteConfig`] maps HTTP method names to [`RouteMethodConfig`]s, each
//! declaring JSON Schema constraints for the request facets and for the
//! response per status code. Configuration is authored statically (in code
//! or loaded from JSON) and only ever read at request time.
//!
//! # Status keys
//!
//! Response configs are keyed by exact status (`"404"`), hundred-range
//! wildcard (`"4XX"`), or `"default"`. Lookup tries them in that order and
//! the first match wins:
//!
//! ```
//! use route_guard::RouteMethodConfig;
//! use serde_json::json;
//!
//! let cfg: RouteMethodConfig = serde_json::from_value(json!({
//!     "responses": {
//!         "404": { "body": { "schema": { "type": "object" } } },
//!         "4XX": { "body": { "schema": { "type": "string" } } }
//!     }
//! })).unwrap();
//!
//! // Exact key wins over the wildcard; 403 falls back to "4XX".
//! assert!(cfg.response_for(404).is_some());
//! assert!(cfg.response_for(403).is_some());
//! assert!(cfg.response_for(500).is_none());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::types::Facet;

/// Content type whose request and response bodies are parsed and validated.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A single facet's schema plus its optional behavior flag overrides.
///
/// Flags left unset fall through the defaults cascade; see
/// [`resolve_field`](crate::defaults::resolve_field).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSchemaConfig {
    /// Plain JSON Schema (Draft 2020-12), or a StandardSchema-style
    /// wrapper that normalizes to one.
    pub schema: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_validation: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_error_message: Option<bool>,
}

impl ValidationSchemaConfig {
    /// Schema-only config with no flag overrides.
    pub fn new(schema: Value) -> Self {
        Self {
            schema,
            skip_validation: None,
            show_error_message: None,
        }
    }
}

/// Output contract for one status key: a body schema and per-header schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ValidationSchemaConfig>,

    /// Response header schemas, keyed by header name (matched
    /// case-insensitively against the actual response).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, ValidationSchemaConfig>,
}

/// Everything declared for one (route, method) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMethodConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<ValidationSchemaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<ValidationSchemaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_params: Option<ValidationSchemaConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<ValidationSchemaConfig>,

    /// Request body schemas keyed by content type. Only
    /// `application/json` bodies are parsed and validated.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub body: BTreeMap<String, ValidationSchemaConfig>,

    /// Output contracts keyed by status: `"200"`, `"4XX"`, or `"default"`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, ResponseConfig>,
}

impl RouteMethodConfig {
    /// The declared config for a non-body request facet, if any.
    pub fn facet(&self, facet: Facet) -> Option<&ValidationSchemaConfig> {
        match facet {
            Facet::Headers => self.headers.as_ref(),
            Facet::Query => self.query.as_ref(),
            Facet::PathParams => self.path_params.as_ref(),
            Facet::Cookies => self.cookies.as_ref(),
            // Body is keyed by content type; see `body_for`.
            Facet::Body => None,
        }
    }

    /// The body config declared for a content type (parameters such as
    /// `charset` must already be stripped by the caller).
    pub fn body_for(&self, content_type: &str) -> Option<&ValidationSchemaConfig> {
        self.body.get(content_type)
    }

    /// Resolve the output contract for an observed status code.
    ///
    /// Lookup order: exact 3-digit key, then `"NXX"` wildcard for the
    /// status's hundred-range, then `"default"`. First match wins; no
    /// match means response validation is skipped entirely.
    pub fn response_for(&self, status: u16) -> Option<&ResponseConfig> {
        if let Some(cfg) = self.responses.get(&status.to_string()) {
            return Some(cfg);
        }
        let wildcard = format!("{}XX", status / 100);
        if let Some(cfg) = self.responses.get(&wildcard) {
            return Some(cfg);
        }
        self.responses.get("default")
    }
}

/// Per-route declaration: method name (uppercase) to method config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteConfig {
    methods: BTreeMap<String, RouteMethodConfig>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a route config from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidJson` if the text isn't valid JSON or
    /// doesn't match the config shape.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::InvalidJson { source })
    }

    /// Declare a method's config. Method names are normalized to uppercase.
    pub fn method(mut self, method: impl AsRef<str>, config: RouteMethodConfig) -> Self {
        self.methods
            .insert(method.as_ref().to_uppercase(), config);
        self
    }

    /// The config declared for a method, if any. Case-insensitive.
    pub fn for_method(&self, method: &str) -> Option<&RouteMethodConfig> {
        self.methods.get(&method.to_uppercase())
    }
}
