//! Route Guard
//!
//! Declarative per-route, per-method request/response validation against
//! JSON Schema (Draft 2020-12).
//!
//! A route declares schemas for up to five request facets (headers, query,
//! path params, cookies, body) and for its responses per status code. The
//! guard validates declared facets in a fixed order before application
//! logic runs, hands the validated values to it, then validates whatever
//! comes back against the output contract for the observed status.
//!
//! # Example
//!
//! ```
//! use axum::body::Body;
//! use axum::http::{Request, StatusCode};
//! use route_guard::{fail, respond, Environment, RouteConfig, RouteGuard};
//! use serde_json::json;
//!
//! let config = RouteConfig::from_json_str(r#"{
//!     "POST": {
//!         "body": {
//!             "application/json": {
//!                 "schema": {
//!                     "type": "object",
//!                     "properties": { "name": { "type": "string" } },
//!                     "required": ["name"]
//!                 }
//!             }
//!         },
//!         "responses": {
//!             "201": { "body": { "schema": { "type": "object", "required": ["id"] } } },
//!             "404": { "body": { "schema": { "type": "object", "required": ["message"] } } }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let guard = RouteGuard::new("/users", config)
//!     .with_environment(Environment::Development);
//!
//! # async fn demo(guard: RouteGuard) -> Result<(), route_guard::BoxError> {
//! let request = Request::builder()
//!     .method("POST")
//!     .uri("/users")
//!     .header("content-type", "application/json")
//!     .body(Body::from(r#"{"name": "ada"}"#))?;
//!
//! let response = guard
//!     .handle(request, |inputs| async move {
//!         let name = inputs.body.as_ref().and_then(|b| b["name"].as_str());
//!         match name {
//!             Some(name) => Ok(respond(json!({"id": 1, "name": name}), StatusCode::CREATED)),
//!             None => Err(fail(StatusCode::NOT_FOUND, json!({"message": "no such user"}))),
//!         }
//!     })
//!     .await?;
//!
//! assert_eq!(response.status(), StatusCode::CREATED);
//! # Ok(()) }
//! ```
//!
//! # Failure modes
//!
//! | Outcome | Status | Client body |
//! |---------|--------|-------------|
//! | Input facet rejected | 400 | `{"error": "<Facet> validation failed", "issues": [...]}` or `{"error": "Invalid request data"}` |
//! | Malformed JSON body | 400 | same as above, attributed to the body facet |
//! | Response violated contract | 500 | `{"error": "Response validation failed", "issues": [...]}` or `{"error": "Internal server error"}` |
//! | Domain error, contract satisfied or undeclared | its own status | its own body |
//! | Domain error, contract violated | 500 | as the response row |
//! | Unexpected handler error | — | propagated untouched, never a response |
//!
//! Whether `issues` appear client-side is governed by `show_error_message`,
//! resolved per field through the defaults cascade; server-side logs always
//! carry full detail for output failures.

mod config;
mod defaults;
mod engine;
mod error;
mod extract;
mod handler;
mod schema;
mod types;

pub use config::{
    ResponseConfig, RouteConfig, RouteMethodConfig, ValidationSchemaConfig, JSON_CONTENT_TYPE,
};
pub use defaults::{
    resolve_field, resolve_flag, DefaultsConfig, EffectiveFieldConfig, FacetDefaults, Flag,
    FlagDefault, ScopedDefault, SideDefault,
};
pub use engine::{InputState, ValidatedInputs};
pub use error::{
    BoxError, ConfigError, DomainError, HandlerError, InputRejection, OutputRejection,
    OutputScope, SchemaCompileError,
};
pub use extract::PathParams;
pub use handler::{fail, respond, GuardService, Reply, RouteGuard};
pub use schema::{check, normalize, Verdict};
pub use types::{Direction, Environment, Facet, Issue};
