//! JSON Schema validation adapter.
//!
//! Wraps the `jsonschema` crate with Draft 2020-12 semantics and `format`
//! assertion enabled, and renders validator errors into wire-level
//! [`Issue`]s with dotted paths and keyword names. Identical
//! `(data, schema)` pairs always yield the identical verdict with issues
//! in schema traversal order.

use serde_json::Value;

use crate::error::SchemaCompileError;
use crate::types::Issue;

/// Outcome of validating one value against one schema.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub valid: bool,
    pub issues: Vec<Issue>,
}

impl Verdict {
    fn pass() -> Self {
        Self {
            valid: true,
            issues: Vec::new(),
        }
    }
}

/// Validate `data` against a plain JSON Schema (or a StandardSchema-style
/// wrapper around one).
///
/// # Errors
///
/// Returns `SchemaCompileError` if the schema itself is invalid. That is a
/// configuration bug and is never rendered as a client-facing verdict.
pub fn check(data: &Value, schema: &Value) -> Result<Verdict, SchemaCompileError> {
    let schema = normalize(schema);

    let validator = jsonschema::options()
        .with_draft(jsonschema::Draft::Draft202012)
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| SchemaCompileError {
            message: e.to_string(),
        })?;

    let issues: Vec<Issue> = validator
        .iter_errors(data)
        .map(|e| Issue {
            path: dotted_path(&e.instance_path.to_string()),
            message: e.to_string(),
            keyword: keyword_of(&e.kind).to_string(),
        })
        .collect();

    if issues.is_empty() {
        Ok(Verdict::pass())
    } else {
        Ok(Verdict {
            valid: false,
            issues,
        })
    }
}

/// Unwrap a StandardSchema-style wrapper to the plain JSON Schema inside.
///
/// A wrapper is an object carrying both a `~standard` vendor member and a
/// `schema` member; everything else passes through untouched. This is a
/// pure pre-validation translation: the engine never special-cases any
/// particular schema library.
pub fn normalize(schema: &Value) -> &Value {
    match schema {
        Value::Object(map) if map.contains_key("~standard") => {
            map.get("schema").unwrap_or(schema)
        }
        _ => schema,
    }
}

/// Convert a JSON Pointer instance path to the dotted form used on the
/// wire: `/items/0/id` becomes `items.0.id`, the root becomes `""`.
fn dotted_path(pointer: &str) -> String {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Name of the schema keyword behind a validator error.
fn keyword_of(kind: &jsonschema::error::ValidationErrorKind) -> &'static str {
    use jsonschema::error::ValidationErrorKind as K;

    match kind {
        K::Required { .. } => "required",
        K::Type { .. } => "type",
        K::Format { .. } => "format",
        K::Pattern { .. } => "pattern",
        K::Enum { .. } => "enum",
        K::Constant { .. } => "const",
        K::Minimum { .. } => "minimum",
        K::Maximum { .. } => "maximum",
        K::ExclusiveMinimum { .. } => "exclusiveMinimum",
        K::ExclusiveMaximum { .. } => "exclusiveMaximum",
        K::MultipleOf { .. } => "multipleOf",
        K::MinLength { .. } => "minLength",
        K::MaxLength { .. } => "maxLength",
        K::MinItems { .. } => "minItems",
        K::MaxItems { .. } => "maxItems",
        K::MinProperties { .. } => "minProperties",
        K::MaxProperties { .. } => "maxProperties",
        K::UniqueItems { .. } => "uniqueItems",
        K::AdditionalProperties { .. } => "additionalProperties",
        K::AdditionalItems { .. } => "additionalItems",
        K::OneOfNotValid { .. } | K::OneOfMultipleValid { .. } => "oneOf",
        K::AnyOf { .. } => "anyOf",
        K::Contains { .. } => "contains",
        K::PropertyNames { .. } => "propertyNames",
        K::FalseSchema { .. } => "false",
        _ => "schema",
    }
}
