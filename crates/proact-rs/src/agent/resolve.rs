//! Placeholder resolution for intent parameters.
//!
//! Each raw parameter value is classified as a [`ParameterValue`] and then
//! resolved against [`Memory`]:
//!
//! | Raw value | Resolves to |
//! |-----------|-------------|
//! | `$RESULT(tool)` / `$RESULTS(tool)` | `norm::<tool>` |
//! | `$RESULT(tool.a.b)` | field `a.b` of `norm::<tool>` |
//! | `$CONTEXT("text")` | `"text"` |
//! | `null`, `""`, `"None"` | same-named memory key (auto-fill) |
//! | anything else | itself |
//!
//! Missing data resolves to `null`. Time-like parameters are additionally
//! run through the [time phrase interpreter](crate::agent::time_phrase).

use crate::agent::memory::{Memory, TIME_RANGE_KEY};
use crate::agent::time_phrase;
use crate::tools::core::ToolArgs;
use serde_json::{Map, Value};
use tracing::debug;

/// Parameter names that receive time phrase coercion by default.
pub const DEFAULT_TIME_PARAMETERS: &[&str] = &["time", "date", "datetime", "when", "time_range"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("$CONTEXT expects a quoted literal, got {0}")]
    UnquotedContext(String),
    #[error("parameters must be an object, got {0}")]
    NotAnObject(String),
}

/// A reference to a prior tool's normalized output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRef {
    pub tool: String,
    /// Dotted path into the output; `None` selects the whole output.
    pub field: Option<String>,
}

impl ResultRef {
    /// Look the reference up in memory, `null` when anything is missing.
    pub fn lookup(&self, memory: &Memory) -> Value {
        let Some(output) = memory.normalized(&self.tool) else {
            return Value::Null;
        };
        match &self.field {
            None => output.clone(),
            Some(path) => project(output, path).cloned().unwrap_or(Value::Null),
        }
    }
}

/// Descend into `value` along a dotted path; numeric segments index arrays.
/// A key that literally contains the dots is matched first.
fn project<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(exact) = value.get(path) {
        return Some(exact);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// A classified raw parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Literal(Value),
    Reference(ResultRef),
    Context(String),
    Missing,
}

fn quoted_literal(s: &str) -> Option<&str> {
    if s.chars().count() < 2 {
        return None;
    }
    ['"', '\'']
        .into_iter()
        .find_map(|q| s.strip_prefix(q).and_then(|r| r.strip_suffix(q)))
}

impl ParameterValue {
    pub fn parse(value: &Value) -> Result<Self, ResolveError> {
        match value {
            Value::Null => Ok(Self::Missing),
            Value::String(s) => Self::parse_str(s),
            other => Ok(Self::Literal(other.clone())),
        }
    }

    pub fn parse_str(s: &str) -> Result<Self, ResolveError> {
        if s.is_empty() || s == "None" {
            return Ok(Self::Missing);
        }
        if !(s.starts_with('$') && s.ends_with(')')) {
            return Ok(Self::Literal(Value::String(s.to_string())));
        }

        let argument = |rest: &str| -> String {
            rest.strip_suffix(')').unwrap_or(rest).trim().to_string()
        };

        if let Some(rest) = s
            .strip_prefix("$RESULTS(")
            .or_else(|| s.strip_prefix("$RESULT("))
        {
            let inner = argument(rest);
            let (tool, field) = match inner.split_once('.') {
                Some((tool, field)) => (tool.trim(), Some(field.trim().to_string())),
                None => (inner.as_str(), None),
            };
            return Ok(Self::Reference(ResultRef {
                tool: tool.to_string(),
                field: field.filter(|f| !f.is_empty()),
            }));
        }

        if let Some(rest) = s.strip_prefix("$CONTEXT(") {
            let inner = argument(rest);
            return quoted_literal(&inner)
                .map(|lit| Self::Context(lit.to_string()))
                .ok_or_else(|| ResolveError::UnquotedContext(s.to_string()));
        }

        Ok(Self::Literal(Value::String(s.to_string())))
    }
}

/// Resolves raw intent parameters into call arguments.
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    time_parameters: Vec<String>,
}

impl Default for ParameterResolver {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_PARAMETERS.iter().map(|s| s.to_string()))
    }
}

impl ParameterResolver {
    pub fn new(time_parameters: impl IntoIterator<Item = String>) -> Self {
        Self {
            time_parameters: time_parameters
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }

    pub fn time_parameters(&self) -> &[String] {
        &self.time_parameters
    }

    pub fn is_time_parameter(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.time_parameters.iter().any(|p| *p == name)
    }

    /// Resolve a full parameter mapping.
    ///
    /// All values are classified before any is resolved, so a failing
    /// value leaves memory untouched.
    pub fn resolve(
        &self,
        parameters: &Map<String, Value>,
        memory: &mut Memory,
    ) -> Result<ToolArgs, ResolveError> {
        let classified = parameters
            .iter()
            .map(|(name, raw)| ParameterValue::parse(raw).map(|value| (name, value)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut arguments = ToolArgs::new();
        for (name, value) in classified {
            let resolved = self.resolve_value(name, &value, memory);
            let resolved = self.coerce_time(name, resolved, memory);
            arguments.insert(name.clone(), resolved);
        }
        Ok(arguments)
    }

    /// Resolve one classified value without time coercion.
    pub fn resolve_value(&self, name: &str, value: &ParameterValue, memory: &Memory) -> Value {
        match value {
            ParameterValue::Literal(v) => v.clone(),
            ParameterValue::Reference(r) => r.lookup(memory),
            ParameterValue::Context(s) => Value::String(s.clone()),
            ParameterValue::Missing => memory.get(name).cloned().unwrap_or(Value::Null),
        }
    }

    fn coerce_time(&self, name: &str, value: Value, memory: &mut Memory) -> Value {
        if !self.is_time_parameter(name) {
            return value;
        }
        let Value::String(phrase) = &value else {
            return value;
        };
        let Some(window) = time_phrase::interpret(phrase, memory.now_iso()) else {
            return value;
        };
        debug!("Interpreted {name}={phrase:?} as {} .. {}", window.start_date, window.end_date);
        let window = window.to_value();
        memory.set(TIME_RANGE_KEY, window.clone());
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::memory::{NOW_ISO_KEY, norm_key};
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn gps_memory() -> Memory {
        Memory::new().with(
            norm_key("get_current_gps_coordinates"),
            json!({"city": "Hong Kong", "address": "Wan Chai", "nested": {"list": ["x", "y"]}}),
        )
    }

    #[test]
    fn classifies_tokens() {
        assert_eq!(ParameterValue::parse(&json!(null)), Ok(ParameterValue::Missing));
        assert_eq!(ParameterValue::parse(&json!("None")), Ok(ParameterValue::Missing));
        assert_eq!(ParameterValue::parse(&json!("")), Ok(ParameterValue::Missing));
        assert_eq!(
            ParameterValue::parse(&json!("$RESULT(tool.city)")),
            Ok(ParameterValue::Reference(ResultRef {
                tool: "tool".into(),
                field: Some("city".into())
            }))
        );
        assert_eq!(
            ParameterValue::parse(&json!("$RESULTS(tool)")),
            Ok(ParameterValue::Reference(ResultRef {
                tool: "tool".into(),
                field: None
            }))
        );
        assert_eq!(
            ParameterValue::parse(&json!("$CONTEXT('dinner')")),
            Ok(ParameterValue::Context("dinner".into()))
        );
        assert_eq!(
            ParameterValue::parse(&json!("$PRICE(10)")),
            Ok(ParameterValue::Literal(json!("$PRICE(10)")))
        );
        assert_eq!(ParameterValue::parse(&json!(3)), Ok(ParameterValue::Literal(json!(3))));
    }

    #[test]
    fn unquoted_context_is_an_error() {
        let err = ParameterValue::parse(&json!("$CONTEXT(dinner)")).unwrap_err();
        assert_eq!(err, ResolveError::UnquotedContext("$CONTEXT(dinner)".into()));
    }

    #[test]
    fn resolves_field_and_whole_output() {
        let resolver = ParameterResolver::default();
        let mut memory = gps_memory();
        let out = resolver
            .resolve(
                &params(json!({
                    "city": "$RESULT(get_current_gps_coordinates.city)",
                    "all": "$RESULTS(get_current_gps_coordinates)",
                    "deep": "$RESULT(get_current_gps_coordinates.nested.list.1)",
                })),
                &mut memory,
            )
            .unwrap();
        assert_eq!(out["city"], "Hong Kong");
        assert_eq!(out["all"]["address"], "Wan Chai");
        assert_eq!(out["deep"], "y");
    }

    #[test]
    fn missing_references_resolve_to_null() {
        let resolver = ParameterResolver::default();
        let mut memory = gps_memory();
        let out = resolver
            .resolve(
                &params(json!({
                    "a": "$RESULT(never_ran.city)",
                    "b": "$RESULT(get_current_gps_coordinates.zip)",
                })),
                &mut memory,
            )
            .unwrap();
        assert_eq!(out["a"], Value::Null);
        assert_eq!(out["b"], Value::Null);
    }

    #[test]
    fn auto_fills_from_memory() {
        let resolver = ParameterResolver::default();
        let mut memory = Memory::new().with("city", json!("Hong Kong"));
        let out = resolver
            .resolve(&params(json!({"city": "None", "other": null})), &mut memory)
            .unwrap();
        assert_eq!(out["city"], "Hong Kong");
        assert_eq!(out["other"], Value::Null);
    }

    #[test]
    fn reference_resolution_is_repeatable() {
        let resolver = ParameterResolver::default();
        let mut memory = gps_memory();
        let p = params(json!({"x": "$RESULT(get_current_gps_coordinates)"}));
        let first = resolver.resolve(&p, &mut memory).unwrap();
        let second = resolver.resolve(&p, &mut memory).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn time_parameters_are_coerced_and_cached() {
        let resolver = ParameterResolver::default();
        let mut memory = Memory::new().with(NOW_ISO_KEY, json!("2025-09-13T15:46:47"));
        let out = resolver
            .resolve(&params(json!({"Time": "tomorrow", "topic": "today"})), &mut memory)
            .unwrap();
        assert_eq!(out["Time"], json!({"start_date": "2025-09-14", "end_date": "2025-09-14"}));
        assert_eq!(out["topic"], "today");
        assert_eq!(memory.get(TIME_RANGE_KEY), Some(&out["Time"]));
    }

    #[test]
    fn unrecognised_time_phrase_passes_through() {
        let resolver = ParameterResolver::default();
        let mut memory = Memory::new();
        let out = resolver
            .resolve(&params(json!({"time": "2025-09-19 15:00"})), &mut memory)
            .unwrap();
        assert_eq!(out["time"], "2025-09-19 15:00");
        assert!(!memory.contains(TIME_RANGE_KEY));
    }

    #[test]
    fn custom_time_parameter_names() {
        let resolver = ParameterResolver::new(["deadline".to_string()]);
        assert!(resolver.is_time_parameter("DEADLINE"));
        assert!(!resolver.is_time_parameter("time"));
    }

    #[test]
    fn failing_value_leaves_memory_untouched() {
        let resolver = ParameterResolver::default();
        let mut memory = Memory::new();
        let err = resolver
            .resolve(&params(json!({"time": "today", "note": "$CONTEXT(x)"})), &mut memory)
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnquotedContext(_)));
        assert!(memory.is_empty());
    }
}
