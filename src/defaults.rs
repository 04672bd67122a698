//! Cascading resolution of behavior flags.
//!
//! `skip_validation` and `show_error_message` can be set in three places,
//! consulted strictest-first:
//!
//! 1. the field's own [`ValidationSchemaConfig`] — explicit and final;
//! 2. [`DefaultsConfig`] — a plain boolean, or per-direction
//!    (`request`/`response`), each side itself a boolean or a per-facet map;
//! 3. the builtin: `skip_validation = false`, `show_error_message = true`
//!    only in a development-like environment.
//!
//! Missing entries fall through to the next looser level. Resolution is a
//! pure function: it never mutates the shared route configuration, so two
//! concurrent requests resolving the same field cannot race.

use serde::{Deserialize, Serialize};

use crate::config::ValidationSchemaConfig;
use crate::types::{Direction, Environment, Facet};

/// Behavior flags subject to the defaults cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    SkipValidation,
    ShowErrorMessage,
}

/// Default for one flag: everywhere, or split by direction.
///
/// The shorthand boolean form mirrors the structured form the way a
/// shorthand annotation mirrors its object form; `serde(untagged)` accepts
/// either.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagDefault {
    /// Applies to every direction and facet.
    Global(bool),
    /// Split by request/response direction.
    Scoped(ScopedDefault),
}

/// Per-direction defaults for one flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopedDefault {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<SideDefault>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SideDefault>,
}

/// One direction's default: a boolean for all facets, or per-facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideDefault {
    All(bool),
    PerFacet(FacetDefaults),
}

/// Per-facet booleans for one direction of one flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_params: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<bool>,
}

impl FacetDefaults {
    fn get(&self, facet: Facet) -> Option<bool> {
        match facet {
            Facet::Headers => self.headers,
            Facet::Query => self.query,
            Facet::PathParams => self.path_params,
            Facet::Cookies => self.cookies,
            Facet::Body => self.body,
        }
    }
}

/// Global defaults for both behavior flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_validation: Option<FlagDefault>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_error_message: Option<FlagDefault>,
}

/// Per-request resolution of one field's flags. Created fresh for each
/// facet of each request and discarded with it; the shared config is
/// never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveFieldConfig {
    pub skip_validation: bool,
    pub show_error_message: bool,
}

/// Resolve a single flag for one field.
///
/// Pure and idempotent: the same inputs always yield the same boolean.
pub fn resolve_flag(
    flag: Flag,
    field: Option<&ValidationSchemaConfig>,
    defaults: &DefaultsConfig,
    direction: Direction,
    facet: Facet,
    environment: Environment,
) -> bool {
    // Explicit field value is final.
    if let Some(field) = field {
        let explicit = match flag {
            Flag::SkipValidation => field.skip_validation,
            Flag::ShowErrorMessage => field.show_error_message,
        };
        if let Some(value) = explicit {
            return value;
        }
    }

    let global = match flag {
        Flag::SkipValidation => defaults.skip_validation.as_ref(),
        Flag::ShowErrorMessage => defaults.show_error_message.as_ref(),
    };

    match global {
        Some(FlagDefault::Global(value)) => *value,
        Some(FlagDefault::Scoped(scoped)) => {
            let side = match direction {
                Direction::Request => scoped.request.as_ref(),
                Direction::Response => scoped.response.as_ref(),
            };
            match side {
                Some(SideDefault::All(value)) => *value,
                Some(SideDefault::PerFacet(facets)) => facets
                    .get(facet)
                    .unwrap_or_else(|| builtin(flag, environment)),
                None => builtin(flag, environment),
            }
        }
        None => builtin(flag, environment),
    }
}

/// Resolve both flags for one field.
pub fn resolve_field(
    field: Option<&ValidationSchemaConfig>,
    defaults: &DefaultsConfig,
    direction: Direction,
    facet: Facet,
    environment: Environment,
) -> EffectiveFieldConfig {
    EffectiveFieldConfig {
        skip_validation: resolve_flag(
            Flag::SkipValidation,
            field,
            defaults,
            direction,
            facet,
            environment,
        ),
        show_error_message: resolve_flag(
            Flag::ShowErrorMessage,
            field,
            defaults,
            direction,
            facet,
            environment,
        ),
    }
}

fn builtin(flag: Flag, environment: Environment) -> bool {
    match flag {
        Flag::SkipValidation => false,
        Flag::ShowErrorMessage => environment.is_development(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(skip: Option<bool>, show: Option<bool>) -> ValidationSchemaConfig {
        ValidationSchemaConfig {
            schema: json!({"type": "object"}),
            skip_validation: skip,
            show_error_message: show,
        }
    }

    #[test]
    fn builtin_defaults() {
        let defaults = DefaultsConfig::default();
        assert!(!resolve_flag(
            Flag::SkipValidation,
            None,
            &defaults,
            Direction::Request,
            Facet::Headers,
            Environment::Production,
        ));
        assert!(resolve_flag(
            Flag::ShowErrorMessage,
            None,
            &defaults,
            Direction::Request,
            Facet::Headers,
            Environment::Development,
        ));
        assert!(!resolve_flag(
            Flag::ShowErrorMessage,
            None,
            &defaults,
            Direction::Request,
            Facet::Headers,
            Environment::Production,
        ));
    }

    #[test]
    fn explicit_field_value_is_final() {
        // Global default says skip everything; the field still opts in.
        let defaults = DefaultsConfig {
            skip_validation: Some(FlagDefault::Global(true)),
            show_error_message: None,
        };
        let f = field(Some(false), None);
        assert!(!resolve_flag(
            Flag::SkipValidation,
            Some(&f),
            &defaults,
            Direction::Request,
            Facet::Body,
            Environment::Production,
        ));
    }

    #[test]
    fn global_boolean_applies_everywhere() {
        let defaults = DefaultsConfig {
            show_error_message: Some(FlagDefault::Global(false)),
            skip_validation: None,
        };
        for facet in Facet::INPUT_ORDER {
            assert!(!resolve_flag(
                Flag::ShowErrorMessage,
                None,
                &defaults,
                Direction::Request,
                facet,
                Environment::Development,
            ));
        }
    }

    #[test]
    fn per_direction_default() {
        let defaults: DefaultsConfig = serde_json::from_value(json!({
            "skipValidation": { "request": true }
        }))
        .unwrap();

        assert!(resolve_flag(
            Flag::SkipValidation,
            None,
            &defaults,
            Direction::Request,
            Facet::Query,
            Environment::Production,
        ));
        // Response side missing: falls through to the builtin.
        assert!(!resolve_flag(
            Flag::SkipValidation,
            None,
            &defaults,
            Direction::Response,
            Facet::Body,
            Environment::Production,
        ));
    }

    #[test]
    fn per_facet_default_with_fallthrough() {
        let defaults: DefaultsConfig = serde_json::from_value(json!({
            "showErrorMessage": { "request": { "headers": true, "body": false } }
        }))
        .unwrap();

        assert!(resolve_flag(
            Flag::ShowErrorMessage,
            None,
            &defaults,
            Direction::Request,
            Facet::Headers,
            Environment::Production,
        ));
        assert!(!resolve_flag(
            Flag::ShowErrorMessage,
            None,
            &defaults,
            Direction::Request,
            Facet::Body,
            Environment::Development,
        ));
        // Query not in the map: builtin applies.
        assert!(resolve_flag(
            Flag::ShowErrorMessage,
            None,
            &defaults,
            Direction::Request,
            Facet::Query,
            Environment::Development,
        ));
    }

    #[test]
    fn resolution_is_idempotent() {
        let defaults: DefaultsConfig = serde_json::from_value(json!({
            "skipValidation": { "response": { "body": true } },
            "showErrorMessage": false
        }))
        .unwrap();
        let f = field(None, Some(true));

        let first = resolve_field(
            Some(&f),
            &defaults,
            Direction::Response,
            Facet::Body,
            Environment::Production,
        );
        let second = resolve_field(
            Some(&f),
            &defaults,
            Direction::Response,
            Facet::Body,
            Environment::Production,
        );
        assert_eq!(first, second);
        assert!(first.skip_validation);
        assert!(first.show_error_message);
    }

    #[test]
    fn untagged_forms_deserialize() {
        let plain: FlagDefault = serde_json::from_value(json!(true)).unwrap();
        assert!(matches!(plain, FlagDefault::Global(true)));

        let scoped: FlagDefault = serde_json::from_value(json!({
            "request": false,
            "response": { "body": true }
        }))
        .unwrap();
        match scoped {
            FlagDefault::Scoped(s) => {
                assert!(matches!(s.request, Some(SideDefault::All(false))));
                assert!(matches!(s.response, Some(SideDefault::PerFacet(_))));
            }
            _ => panic!("expected scoped default"),
        }
    }
}
