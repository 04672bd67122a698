//! The validation engine: input path, output path, and wire payloads.
//!
//! The input path walks the five request facets in fixed order and fails
//! fast on the first violation, so a response always attributes the error
//! to exactly one facet. The output path resolves the declared contract
//! for the observed status and replaces violating responses with a 500,
//! logging full detail server-side regardless of what the client sees.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::config::{RouteMethodConfig, ValidationSchemaConfig, JSON_CONTENT_TYPE};
use crate::defaults::{resolve_field, DefaultsConfig, EffectiveFieldConfig};
use crate::error::{InputRejection, OutputRejection, OutputScope, SchemaCompileError};
use crate::extract::RequestFacets;
use crate::schema;
use crate::types::{Direction, Environment, Facet, Issue};

/// Progress of the input validation state machine.
///
/// Transitions are strictly sequential; there is no path that validates a
/// later facet after an earlier one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    NotStarted,
    ValidatingHeaders,
    ValidatingQuery,
    ValidatingPathParams,
    ValidatingCookies,
    ValidatingBody,
    InputsReady,
    Failed,
}

impl InputState {
    pub fn validating(facet: Facet) -> Self {
        match facet {
            Facet::Headers => InputState::ValidatingHeaders,
            Facet::Query => InputState::ValidatingQuery,
            Facet::PathParams => InputState::ValidatingPathParams,
            Facet::Cookies => InputState::ValidatingCookies,
            Facet::Body => InputState::ValidatingBody,
        }
    }
}

/// Validated request values handed to application logic.
///
/// Facets with no declared schema (or with validation skipped) carry the
/// raw extracted value unmodified.
#[derive(Debug, Clone)]
pub struct ValidatedInputs {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub path_params: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    /// Parsed JSON body when the request declared `application/json`.
    pub body: Option<Value>,
    /// The buffered body bytes, untouched, for non-JSON consumers.
    pub raw_body: Bytes,
}

/// Outcome of the input path: inputs for the handler, or a rejection plus
/// the resolved `show_error_message` for rendering it.
#[derive(Debug)]
pub(crate) enum InputVerdict {
    Ready(ValidatedInputs),
    Rejected {
        rejection: InputRejection,
        show_error_message: bool,
    },
}

/// Run the input path over extracted facets.
///
/// # Errors
///
/// Returns `SchemaCompileError` when a declared schema cannot compile;
/// that propagates as an unexpected failure, never a 400.
pub(crate) fn validate_input(
    route: &str,
    method: &str,
    cfg: &RouteMethodConfig,
    defaults: &DefaultsConfig,
    environment: Environment,
    facets: &RequestFacets,
) -> Result<InputVerdict, SchemaCompileError> {
    tracing::trace!(route, method, state = ?InputState::NotStarted, "input validation starting");
    let mut parsed_body: Option<Value> = None;

    for facet in Facet::INPUT_ORDER {
        tracing::trace!(
            route,
            method,
            state = ?InputState::validating(facet),
            "input validation step"
        );

        let outcome = match facet {
            Facet::Body => {
                validate_body_facet(route, method, cfg, defaults, environment, facets)?
            }
            _ => validate_map_facet(route, method, cfg, defaults, environment, facets, facet)?,
        };

        match outcome {
            FacetOutcome::Pass(body) => {
                if facet == Facet::Body {
                    parsed_body = body;
                }
            }
            FacetOutcome::Fail {
                rejection,
                show_error_message,
            } => {
                tracing::trace!(route, method, state = ?InputState::Failed, facet = %facet, "input validation failed");
                return Ok(InputVerdict::Rejected {
                    rejection,
                    show_error_message,
                });
            }
        }
    }

    tracing::trace!(route, method, state = ?InputState::InputsReady, "inputs ready");
    Ok(InputVerdict::Ready(ValidatedInputs {
        headers: facets.headers.clone(),
        query: facets.query.clone(),
        path_params: facets.path_params.clone(),
        cookies: facets.cookies.clone(),
        body: parsed_body,
        raw_body: facets.body.clone(),
    }))
}

enum FacetOutcome {
    /// Carries the parsed body when the facet was the body.
    Pass(Option<Value>),
    Fail {
        rejection: InputRejection,
        show_error_message: bool,
    },
}

fn validate_map_facet(
    route: &str,
    method: &str,
    cfg: &RouteMethodConfig,
    defaults: &DefaultsConfig,
    environment: Environment,
    facets: &RequestFacets,
    facet: Facet,
) -> Result<FacetOutcome, SchemaCompileError> {
    let Some(field) = cfg.facet(facet) else {
        // Undeclared facets are still extracted and handed through.
        return Ok(FacetOutcome::Pass(None));
    };

    let effective = resolve_field(Some(field), defaults, Direction::Request, facet, environment);
    if effective.skip_validation {
        tracing::debug!(route, method, facet = %facet, "facet validation skipped");
        return Ok(FacetOutcome::Pass(None));
    }

    let map = match facet {
        Facet::Headers => &facets.headers,
        Facet::Query => &facets.query,
        Facet::PathParams => &facets.path_params,
        Facet::Cookies => &facets.cookies,
        Facet::Body => unreachable!("body facet handled separately"),
    };
    let data = string_map_to_value(map);

    let verdict = schema::check(&data, &field.schema)?;
    if verdict.valid {
        Ok(FacetOutcome::Pass(None))
    } else {
        Ok(FacetOutcome::Fail {
            rejection: InputRejection::Invalid {
                facet,
                issues: verdict.issues,
            },
            show_error_message: effective.show_error_message,
        })
    }
}

fn validate_body_facet(
    route: &str,
    method: &str,
    cfg: &RouteMethodConfig,
    defaults: &DefaultsConfig,
    environment: Environment,
    facets: &RequestFacets,
) -> Result<FacetOutcome, SchemaCompileError> {
    let is_json = facets.content_type.as_deref() == Some(JSON_CONTENT_TYPE);
    let field = facets
        .content_type
        .as_deref()
        .and_then(|ct| cfg.body_for(ct));
    let effective = body_effective(field, defaults, environment);

    // Parsing precedes validation: malformed JSON fails even when body
    // validation is skipped or undeclared.
    let parsed = if is_json && !facets.body.is_empty() {
        match serde_json::from_slice::<Value>(&facets.body) {
            Ok(value) => Some(value),
            Err(err) => {
                return Ok(FacetOutcome::Fail {
                    rejection: InputRejection::BodyParse {
                        message: err.to_string(),
                    },
                    show_error_message: effective.show_error_message,
                });
            }
        }
    } else {
        None
    };

    let Some(field) = field else {
        return Ok(FacetOutcome::Pass(parsed));
    };
    if effective.skip_validation {
        tracing::debug!(route, method, facet = %Facet::Body, "facet validation skipped");
        return Ok(FacetOutcome::Pass(parsed));
    }
    if !is_json {
        // Only JSON bodies are parsed, so only they can be validated.
        return Ok(FacetOutcome::Pass(parsed));
    }

    let data = parsed.clone().unwrap_or(Value::Null);
    let verdict = schema::check(&data, &field.schema)?;
    if verdict.valid {
        Ok(FacetOutcome::Pass(parsed))
    } else {
        Ok(FacetOutcome::Fail {
            rejection: InputRejection::Invalid {
                facet: Facet::Body,
                issues: verdict.issues,
            },
            show_error_message: effective.show_error_message,
        })
    }
}

fn body_effective(
    field: Option<&ValidationSchemaConfig>,
    defaults: &DefaultsConfig,
    environment: Environment,
) -> EffectiveFieldConfig {
    resolve_field(field, defaults, Direction::Request, Facet::Body, environment)
}

fn string_map_to_value(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// A response as seen by the output path.
pub(crate) struct ResponseView<'a> {
    pub status: u16,
    /// Declared content type, parameters stripped.
    pub content_type: Option<&'a str>,
    /// Body parsed as JSON, when it was JSON.
    pub json_body: Option<&'a Value>,
    pub headers: &'a HeaderMap,
}

/// Run the output path over a produced response.
///
/// Returns the first contract violation, or `None` when the response may
/// pass through unchanged. Violations are logged in full here, before any
/// client-side redaction applies.
pub(crate) fn validate_output(
    route: &str,
    method: &str,
    cfg: &RouteMethodConfig,
    defaults: &DefaultsConfig,
    environment: Environment,
    view: &ResponseView<'_>,
) -> Result<Option<OutputRejection>, SchemaCompileError> {
    let Some(response_cfg) = cfg.response_for(view.status) else {
        tracing::debug!(route, method, status = view.status, "no output contract declared");
        return Ok(None);
    };

    if let Some(field) = &response_cfg.body {
        let effective = resolve_field(
            Some(field),
            defaults,
            Direction::Response,
            Facet::Body,
            environment,
        );
        if effective.skip_validation {
            tracing::debug!(route, method, status = view.status, "response body validation skipped");
        } else if view.content_type != Some(JSON_CONTENT_TYPE) || view.json_body.is_none() {
            // Not declared as JSON, or unparseable: skipped silently.
            tracing::debug!(route, method, status = view.status, "response body is not JSON, skipping");
        } else if let Some(body) = view.json_body {
            let verdict = schema::check(body, &field.schema)?;
            if !verdict.valid {
                return Ok(Some(rejected(
                    route,
                    method,
                    view.status,
                    OutputScope::Body,
                    verdict.issues,
                    effective.show_error_message,
                )));
            }
        }
    }

    for (name, field) in &response_cfg.headers {
        let effective = resolve_field(
            Some(field),
            defaults,
            Direction::Response,
            Facet::Headers,
            environment,
        );
        if effective.skip_validation {
            continue;
        }

        // HeaderMap lookup is case-insensitive by construction.
        let data = view
            .headers
            .get(name.to_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null);

        let verdict = schema::check(&data, &field.schema)?;
        if !verdict.valid {
            return Ok(Some(rejected(
                route,
                method,
                view.status,
                OutputScope::Header(name.clone()),
                verdict.issues,
                effective.show_error_message,
            )));
        }
    }

    Ok(None)
}

/// Validate a handler-raised domain error's body against the contract
/// declared for its status, if any.
///
/// Returns `None` when the domain error may be honored as-is: no contract
/// matched, no body schema declared, validation skipped, or the body
/// satisfied the schema.
pub(crate) fn validate_domain_body(
    route: &str,
    method: &str,
    cfg: &RouteMethodConfig,
    defaults: &DefaultsConfig,
    environment: Environment,
    status: u16,
    body: &Value,
) -> Result<Option<OutputRejection>, SchemaCompileError> {
    let Some(field) = cfg.response_for(status).and_then(|r| r.body.as_ref()) else {
        return Ok(None);
    };

    let effective = resolve_field(
        Some(field),
        defaults,
        Direction::Response,
        Facet::Body,
        environment,
    );
    if effective.skip_validation {
        return Ok(None);
    }

    let verdict = schema::check(body, &field.schema)?;
    if verdict.valid {
        Ok(None)
    } else {
        Ok(Some(rejected(
            route,
            method,
            status,
            OutputScope::Body,
            verdict.issues,
            effective.show_error_message,
        )))
    }
}

fn rejected(
    route: &str,
    method: &str,
    status: u16,
    scope: OutputScope,
    issues: Vec<Issue>,
    show_error_message: bool,
) -> OutputRejection {
    // Full detail is always logged server-side; redaction only applies to
    // the client payload.
    tracing::error!(
        route,
        method,
        status,
        scope = %scope,
        issues = ?issues,
        "response violated its declared contract"
    );
    OutputRejection {
        scope,
        status,
        issues,
        show_error_message,
    }
}

/// Client payload for an input failure.
pub(crate) fn input_error_body(rejection: &InputRejection, show_error_message: bool) -> Value {
    if show_error_message {
        json!({
            "error": format!("{} validation failed", rejection.facet().label()),
            "issues": rejection.issues(),
        })
    } else {
        json!({ "error": "Invalid request data" })
    }
}

/// Client payload for an output failure.
pub(crate) fn output_error_body(rejection: &OutputRejection) -> Value {
    if rejection.show_error_message {
        json!({
            "error": "Response validation failed",
            "issues": rejection.issues.clone(),
        })
    } else {
        json!({ "error": "Internal server error" })
    }
}
