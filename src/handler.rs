//! Handler wrapping: the public entry point of the crate.
//!
//! A [`RouteGuard`] owns one route's declarative config. [`RouteGuard::handle`]
//! runs the input path, invokes application logic with [`ValidatedInputs`],
//! and runs the output path over whatever comes back — including domain
//! errors raised with [`fail`]. Unexpected handler errors are never turned
//! into responses here; they propagate as the service error so the host
//! stack keeps its own failure policy.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{to_bytes, Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode};
use serde_json::Value;
use tower::Service;

use crate::config::{RouteConfig, RouteMethodConfig, JSON_CONTENT_TYPE};
use crate::defaults::{resolve_field, DefaultsConfig};
use crate::engine::{self, InputVerdict, ResponseView, ValidatedInputs};
use crate::error::{BoxError, DomainError, HandlerError, InputRejection, OutputRejection};
use crate::extract::RequestFacets;
use crate::types::{Direction, Environment, Facet};

/// A response produced by application logic.
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
}

#[derive(Debug, Clone)]
enum ReplyBody {
    Json(Value),
    Raw {
        bytes: Bytes,
        content_type: Option<HeaderValue>,
    },
    Empty,
}

impl Reply {
    /// A JSON response; the body is subject to any declared output contract.
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Json(body),
        }
    }

    /// A response with arbitrary bytes and an explicit content type.
    /// Validated only when the content type is `application/json` and the
    /// bytes parse as JSON.
    pub fn raw(status: StatusCode, bytes: impl Into<Bytes>, content_type: HeaderValue) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Raw {
                bytes: bytes.into(),
                content_type: Some(content_type),
            },
        }
    }

    /// An empty-bodied response.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
        }
    }

    /// Attach a response header, so declared header contracts can be met.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Content type (parameters stripped) and parsed JSON body, as the
    /// output path sees them.
    fn body_view(&self) -> (Option<String>, Option<Value>) {
        match &self.body {
            ReplyBody::Json(value) => (Some(JSON_CONTENT_TYPE.to_string()), Some(value.clone())),
            ReplyBody::Raw {
                bytes,
                content_type,
            } => {
                let ct = content_type
                    .as_ref()
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase());
                let parsed = if ct.as_deref() == Some(JSON_CONTENT_TYPE) {
                    serde_json::from_slice(bytes).ok()
                } else {
                    None
                };
                (ct, parsed)
            }
            ReplyBody::Empty => (None, None),
        }
    }

    fn into_response(self) -> Response<Body> {
        let (body, content_type) = match self.body {
            ReplyBody::Json(value) => (
                Body::from(value.to_string()),
                Some(HeaderValue::from_static(JSON_CONTENT_TYPE)),
            ),
            ReplyBody::Raw {
                bytes,
                content_type,
            } => (Body::from(bytes), content_type),
            ReplyBody::Empty => (Body::empty(), None),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Some(ct) = content_type {
            response.headers_mut().entry(CONTENT_TYPE).or_insert(ct);
        }
        response
    }
}

/// Build a success [`Reply`] carrying a JSON body.
pub fn respond(body: Value, status: StatusCode) -> Reply {
    Reply::json(status, body)
}

/// Raise an intentional non-2xx outcome from application logic.
///
/// If the route declares an output schema for `status`, the body is
/// validated against it before the status is honored; a violated contract
/// is surfaced as a 500 instead.
pub fn fail(status: StatusCode, body: Value) -> HandlerError {
    HandlerError::Domain(DomainError::new(status, body))
}

/// Per-route validation guard: the declarative config plus the defaults
/// and environment it resolves flags under. Cheap to share; all state is
/// read-only at request time.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    route: String,
    config: RouteConfig,
    defaults: DefaultsConfig,
    environment: Environment,
}

impl RouteGuard {
    /// Create a guard for a route. The route string is used only for
    /// server-side log context. The environment is detected from
    /// `APP_ENV`; override it with [`RouteGuard::with_environment`].
    pub fn new(route: impl Into<String>, config: RouteConfig) -> Self {
        Self {
            route: route.into(),
            config,
            defaults: DefaultsConfig::default(),
            environment: Environment::from_env(),
        }
    }

    pub fn with_defaults(mut self, defaults: DefaultsConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Run one request through input validation, the handler, and output
    /// validation.
    ///
    /// # Errors
    ///
    /// Returns the handler's unexpected error untouched, or a
    /// [`SchemaCompileError`](crate::SchemaCompileError) when declared
    /// configuration is itself broken. Contract violations are not
    /// errors: they come back as 400/500 responses.
    pub async fn handle<H, Fut>(
        &self,
        req: Request<Body>,
        handler: H,
    ) -> Result<Response<Body>, BoxError>
    where
        H: FnOnce(ValidatedInputs) -> Fut,
        Fut: Future<Output = Result<Reply, HandlerError>>,
    {
        let method = req.method().as_str().to_string();
        let fallback = RouteMethodConfig::default();
        let cfg = self.config.for_method(&method).unwrap_or(&fallback);

        let (mut parts, body) = req.into_parts();
        let bytes = match to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(err) => {
                // An aborted body read surfaces as a clean parse failure.
                let rejection = InputRejection::BodyParse {
                    message: err.to_string(),
                };
                let show = resolve_field(
                    cfg.body_for(JSON_CONTENT_TYPE),
                    &self.defaults,
                    Direction::Request,
                    Facet::Body,
                    self.environment,
                )
                .show_error_message;
                return Ok(input_failure(&rejection, show));
            }
        };

        let facets = RequestFacets::extract(&mut parts, bytes).await;
        let inputs = match engine::validate_input(
            &self.route,
            &method,
            cfg,
            &self.defaults,
            self.environment,
            &facets,
        )? {
            InputVerdict::Ready(inputs) => inputs,
            InputVerdict::Rejected {
                rejection,
                show_error_message,
            } => return Ok(input_failure(&rejection, show_error_message)),
        };

        match handler(inputs).await {
            Ok(reply) => {
                let (content_type, json_body) = reply.body_view();
                let view = ResponseView {
                    status: reply.status.as_u16(),
                    content_type: content_type.as_deref(),
                    json_body: json_body.as_ref(),
                    headers: &reply.headers,
                };
                match engine::validate_output(
                    &self.route,
                    &method,
                    cfg,
                    &self.defaults,
                    self.environment,
                    &view,
                )? {
                    Some(rejection) => Ok(output_failure(&rejection)),
                    None => Ok(reply.into_response()),
                }
            }
            Err(HandlerError::Domain(domain)) => {
                match engine::validate_domain_body(
                    &self.route,
                    &method,
                    cfg,
                    &self.defaults,
                    self.environment,
                    domain.status.as_u16(),
                    &domain.body,
                )? {
                    // A declared-but-violated contract is surfaced, never
                    // silently honored with the intended status.
                    Some(rejection) => Ok(output_failure(&rejection)),
                    None => Ok(json_response(domain.status, &domain.body)),
                }
            }
            Err(HandlerError::Unexpected(err)) => Err(err),
        }
    }

    /// Wrap a handler into a [`GuardService`] for mounting in a tower
    /// stack.
    pub fn into_service<H>(self, handler: H) -> GuardService<H> {
        GuardService {
            guard: Arc::new(self),
            handler,
        }
    }
}

/// A guarded handler as a `tower::Service`.
///
/// Unexpected handler errors become the service error, leaving their
/// handling to the host layer.
#[derive(Debug)]
pub struct GuardService<H> {
    guard: Arc<RouteGuard>,
    handler: H,
}

impl<H: Clone> Clone for GuardService<H> {
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
            handler: self.handler.clone(),
        }
    }
}

impl<H, Fut> Service<Request<Body>> for GuardService<H>
where
    H: Fn(ValidatedInputs) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let guard = Arc::clone(&self.guard);
        let handler = self.handler.clone();
        Box::pin(async move { guard.handle(req, handler).await })
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

fn input_failure(rejection: &InputRejection, show_error_message: bool) -> Response<Body> {
    json_response(
        StatusCode::BAD_REQUEST,
        &engine::input_error_body(rejection, show_error_message),
    )
}

fn output_failure(rejection: &OutputRejection) -> Response<Body> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &engine::output_error_body(rejection),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guard(config: Value) -> RouteGuard {
        let config: RouteConfig = serde_json::from_value(config).unwrap();
        RouteGuard::new("/test", config).with_environment(Environment::Development)
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn reply_passes_output_contract_unchanged() {
        let guard = guard(json!({
            "GET": {
                "responses": {
                    "200": {
                        "body": {
                            "schema": {
                                "type": "object",
                                "properties": { "success": { "type": "boolean" } },
                                "required": ["success"]
                            }
                        }
                    }
                }
            }
        }));
        let req = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = guard
            .handle(req, |_inputs| async {
                Ok(Reply::json(StatusCode::OK, json!({"success": true})))
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"success": true}));
    }

    #[tokio::test]
    async fn violated_output_contract_becomes_500() {
        let guard = guard(json!({
            "GET": {
                "responses": {
                    "200": {
                        "body": {
                            "schema": {
                                "type": "object",
                                "required": ["success"]
                            }
                        }
                    }
                }
            }
        }));
        let req = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = guard
            .handle(req, |_inputs| async {
                Ok(Reply::json(StatusCode::OK, json!({})))
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Response validation failed");
    }

    #[tokio::test]
    async fn unexpected_errors_propagate_untouched() {
        let guard = guard(json!({}));
        let req = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let result = guard
            .handle(req, |_inputs| async {
                Err::<Reply, _>(HandlerError::unexpected("database exploded"))
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("database exploded"));
    }

    #[tokio::test]
    async fn undeclared_method_skips_all_validation() {
        let guard = guard(json!({
            "POST": {
                "headers": { "schema": { "type": "object", "required": ["x-key"] } }
            }
        }));
        let req = Request::builder()
            .method("GET")
            .uri("/test")
            .body(Body::empty())
            .unwrap();

        let response = guard
            .handle(req, |_inputs| async { Ok(Reply::empty(StatusCode::NO_CONTENT)) })
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn reply_with_header_satisfies_header_contract() {
        let guard = guard(json!({
            "GET": {
                "responses": {
                    "200": {
                        "headers": {
                            "X-Total-Count": { "schema": { "type": "string", "pattern": "^[0-9]+$" } }
                        }
                    }
                }
            }
        }));
        let req = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = guard
            .handle(req, |_inputs| async {
                Ok(Reply::json(StatusCode::OK, json!({"items": []})).with_header(
                    HeaderName::from_static("x-total-count"),
                    HeaderValue::from_static("12"),
                ))
            })
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-total-count"], "12");
    }

    #[test]
    fn respond_and_fail_shapes() {
        let reply = respond(json!({"id": 1}), StatusCode::CREATED);
        assert_eq!(reply.status(), StatusCode::CREATED);

        match fail(StatusCode::NOT_FOUND, json!({"message": "gone"})) {
            HandlerError::Domain(domain) => {
                assert_eq!(domain.status, StatusCode::NOT_FOUND);
                assert_eq!(domain.body["message"], "gone");
            }
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[test]
    fn raw_reply_views_json_only_when_declared() {
        let reply = Reply::raw(
            StatusCode::OK,
            &b"{\"a\":1}"[..],
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let (ct, parsed) = reply.body_view();
        assert_eq!(ct.as_deref(), Some(JSON_CONTENT_TYPE));
        assert_eq!(parsed, Some(json!({"a": 1})));

        let reply = Reply::raw(
            StatusCode::OK,
            &b"{\"a\":1}"[..],
            HeaderValue::from_static("text/plain"),
        );
        let (_, parsed) = reply.body_view();
        assert!(parsed.is_none());
    }
}
