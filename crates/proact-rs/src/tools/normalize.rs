//! Output normalizers.
//!
//! Tools return whatever is natural for them: a `"coarse | fine"` location
//! string, a `"Date: ... Time: ..."` line, a JSON object, plain text. A
//! [`Normalizer`] reshapes that raw value into a [`Canonical`] object with
//! predictable field names so placeholders like
//! `$RESULT(get_current_gps_coordinates.city)` have something to project.
//!
//! Normalizers never fail. Tools without a specific normalizer get
//! [`normalize_generic`], and a panicking custom normalizer is replaced by
//! the generic shape for that call.

use crate::tools::names;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{trace, warn};

/// A normalized tool result: always a JSON object.
pub type Canonical = Map<String, Value>;

/// Output format of `now_iso`.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Converts a raw tool result into its canonical shape.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, raw: &Value) -> Canonical;
}

impl<F> Normalizer for F
where
    F: Fn(&Value) -> Canonical + Send + Sync,
{
    fn normalize(&self, raw: &Value) -> Canonical {
        self(raw)
    }
}

/// Fallback normalizer for tools without a specific one.
pub struct GenericNormalizer;

impl Normalizer for GenericNormalizer {
    fn normalize(&self, raw: &Value) -> Canonical {
        normalize_generic(raw)
    }
}

/// `{city, address}` from a location description.
pub struct LocationNormalizer;

impl Normalizer for LocationNormalizer {
    fn normalize(&self, raw: &Value) -> Canonical {
        normalize_location(raw)
    }
}

/// `{now_iso}` from a clock reading.
pub struct TimestampNormalizer;

impl Normalizer for TimestampNormalizer {
    fn normalize(&self, raw: &Value) -> Canonical {
        normalize_timestamp(raw)
    }
}

fn text(value: Value) -> Canonical {
    let mut out = Canonical::new();
    out.insert("text".into(), value);
    out
}

/// Remove one pair of matching surrounding quotes, if present.
fn strip_matching_quotes(s: &str) -> &str {
    if s.chars().count() < 2 {
        return s;
    }
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// Strip surrounding quotes, then parse as JSON if possible.
fn unquote_and_parse(s: &str) -> Value {
    let inner = strip_matching_quotes(s.trim());
    serde_json::from_str(inner).unwrap_or_else(|_| Value::String(inner.to_string()))
}

/// Generic normalization.
///
/// A JSON-object string becomes that object; any other JSON value is
/// wrapped as `{text: value}`; unparsable text becomes `{text: "..."}`.
/// Raw objects pass through unchanged.
pub fn normalize_generic(raw: &Value) -> Canonical {
    match raw {
        Value::Object(map) => map.clone(),
        Value::String(s) => match unquote_and_parse(s) {
            Value::Object(map) => map,
            other => text(other),
        },
        other => text(Value::String(other.to_string())),
    }
}

// ── Location ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Place {
    city: Option<String>,
    address: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn strip_stray_quotes(s: &str) -> &str {
    s.trim().trim_matches(['"', '\'']).trim()
}

fn leading_token(s: &str) -> Option<String> {
    s.split(',').next().and_then(non_empty)
}

/// Parse `"coarse | fine"`, or a plain comma-separated location.
fn parse_place(s: &str) -> Place {
    let s = strip_stray_quotes(s);
    match s.split_once('|') {
        Some((coarse, fine)) => Place {
            city: leading_token(strip_stray_quotes(coarse)),
            address: non_empty(strip_stray_quotes(fine)),
        },
        None => Place {
            city: leading_token(s),
            address: non_empty(s),
        },
    }
}

fn string_field(map: &Canonical, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(strip_stray_quotes)
        .and_then(non_empty)
}

fn location_from_object(map: &Canonical) -> Canonical {
    let mut place = Place {
        city: string_field(map, "city"),
        address: string_field(map, "address"),
    };
    if (place.city.is_none() || place.address.is_none())
        && let Some(text) = map.get("text").and_then(Value::as_str)
    {
        let parsed = parse_place(text);
        place.city = place.city.or(parsed.city);
        place.address = place.address.or(parsed.address);
    }

    match place.city {
        Some(city) => {
            let address = place.address.unwrap_or_else(|| city.clone());
            let mut out = Canonical::new();
            out.insert("city".into(), Value::String(city));
            out.insert("address".into(), Value::String(address));
            out
        }
        None => text(Value::String(Value::Object(map.clone()).to_string())),
    }
}

/// Location normalization: `{city, address}`.
///
/// ```
/// use proact_rs::tools::normalize::normalize_location;
/// use serde_json::json;
///
/// let out = normalize_location(&json!("Hong Kong, Hong Kong, HK | Wan Chai, Hong Kong"));
/// assert_eq!(out["city"], "Hong Kong");
/// assert_eq!(out["address"], "Wan Chai, Hong Kong");
/// ```
pub fn normalize_location(raw: &Value) -> Canonical {
    match raw {
        Value::Object(map) => location_from_object(map),
        Value::String(s) => match unquote_and_parse(s) {
            Value::Object(map) => location_from_object(&map),
            Value::String(s) => {
                let place = parse_place(&s);
                let mut out = Canonical::new();
                out.insert("city".into(), place.city.map_or(Value::Null, Value::String));
                out.insert(
                    "address".into(),
                    place.address.map_or(Value::Null, Value::String),
                );
                out
            }
            other => text(Value::String(other.to_string())),
        },
        other => text(Value::String(other.to_string())),
    }
}

// ── Timestamp ──────────────────────────────────────────────────────

/// Parse `"Date: September 13, 2025 Time: 15:46:47"` into ISO form.
fn parse_clock_line(s: &str) -> Option<String> {
    let (_, rest) = s.split_once("Date:")?;
    let (date, time) = rest.split_once("Time:")?;
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    let time: String = time
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ':')
        .collect();
    let parsed =
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%B %d, %Y %H:%M:%S").ok()?;
    Some(parsed.format(ISO_FORMAT).to_string())
}

fn now_iso(value: Value) -> Canonical {
    let mut out = Canonical::new();
    out.insert("now_iso".into(), value);
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    }
}

fn timestamp_from_object(map: &Canonical) -> Canonical {
    let value = ["now_iso", "now"]
        .iter()
        .find_map(|key| map.get(*key).filter(|v| is_truthy(v)).cloned())
        .unwrap_or_else(|| Value::String(Value::Object(map.clone()).to_string()));
    now_iso(value)
}

/// Timestamp normalization: `{now_iso}`.
///
/// Unparsable strings are kept as-is under `now_iso`.
pub fn normalize_timestamp(raw: &Value) -> Canonical {
    match raw {
        Value::Object(map) => timestamp_from_object(map),
        Value::String(s) => match unquote_and_parse(s) {
            Value::Object(map) => timestamp_from_object(&map),
            Value::String(s) => {
                let iso = parse_clock_line(&s).unwrap_or(s);
                now_iso(Value::String(iso))
            }
            other => now_iso(Value::String(other.to_string())),
        },
        other => now_iso(Value::String(other.to_string())),
    }
}

// ── Registry ───────────────────────────────────────────────────────

/// Tool name to normalizer, with a generic fallback.
#[derive(Default)]
pub struct NormalizerRegistry {
    by_tool: HashMap<String, Box<dyn Normalizer>>,
}

impl NormalizerRegistry {
    /// An empty registry: every tool gets the generic normalizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Location for GPS, timestamp for the clock.
    pub fn with_defaults() -> Self {
        Self::new()
            .with(names::GET_CURRENT_GPS_COORDINATES, LocationNormalizer)
            .with(names::GET_CURRENT_DATETIME, TimestampNormalizer)
    }

    pub fn register(&mut self, tool: impl Into<String>, normalizer: impl Normalizer + 'static) {
        let tool = tool.into();
        if self.by_tool.contains_key(&tool) {
            warn!(tool = %tool, "Normalizer override; later registration wins");
        }
        self.by_tool.insert(tool, Box::new(normalizer));
    }

    /// Register a normalizer (builder pattern).
    pub fn with(mut self, tool: impl Into<String>, normalizer: impl Normalizer + 'static) -> Self {
        self.register(tool, normalizer);
        self
    }

    pub fn has_specific(&self, tool: &str) -> bool {
        self.by_tool.contains_key(tool)
    }

    /// Normalize `raw` as produced by `tool`.
    pub fn normalize(&self, tool: &str, raw: &Value) -> Canonical {
        let Some(normalizer) = self.by_tool.get(tool) else {
            return normalize_generic(raw);
        };
        match catch_unwind(AssertUnwindSafe(|| normalizer.normalize(raw))) {
            Ok(canonical) => {
                let rendered = Value::Object(canonical.clone()).to_string();
                trace!(tool = %tool, "normalized: {rendered}");
                canonical
            }
            Err(_) => {
                warn!(tool = %tool, "Normalizer panicked; using generic shape");
                normalize_generic(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Canonical {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn generic_wraps_plain_text() {
        assert_eq!(normalize_generic(&json!("plain text")), obj(json!({"text": "plain text"})));
    }

    #[test]
    fn generic_parses_json_object_string() {
        assert_eq!(normalize_generic(&json!(r#"{"a":1}"#)), obj(json!({"a": 1})));
    }

    #[test]
    fn generic_strips_one_pair_of_quotes() {
        assert_eq!(normalize_generic(&json!(r#""success""#)), obj(json!({"text": "success"})));
        assert_eq!(normalize_generic(&json!("'hi'")), obj(json!({"text": "hi"})));
    }

    #[test]
    fn generic_wraps_parsed_non_object() {
        assert_eq!(normalize_generic(&json!("[1, 2]")), obj(json!({"text": [1, 2]})));
        assert_eq!(normalize_generic(&json!("42")), obj(json!({"text": 42})));
    }

    #[test]
    fn generic_passes_objects_and_stringifies_the_rest() {
        assert_eq!(normalize_generic(&json!({"k": "v"})), obj(json!({"k": "v"})));
        assert_eq!(normalize_generic(&json!(["a", "b"])), obj(json!({"text": "[\"a\",\"b\"]"})));
        assert_eq!(normalize_generic(&Value::Null), obj(json!({"text": "null"})));
    }

    #[test]
    fn location_splits_coarse_and_fine() {
        let out = normalize_location(&json!("Hong Kong, Hong Kong, HK | Wan Chai, Hong Kong"));
        assert_eq!(out, obj(json!({"city": "Hong Kong", "address": "Wan Chai, Hong Kong"})));
    }

    #[test]
    fn location_without_pipe_uses_whole_string() {
        let out = normalize_location(&json!("Seoul, KR"));
        assert_eq!(out, obj(json!({"city": "Seoul", "address": "Seoul, KR"})));
    }

    #[test]
    fn location_strips_stray_quotes() {
        let out = normalize_location(&json!("\"Paris, FR | 5 Rue X\""));
        assert_eq!(out["city"], "Paris");
        assert_eq!(out["address"], "5 Rue X");
    }

    #[test]
    fn location_from_object_fields() {
        let out = normalize_location(&json!({"city": "Tokyo"}));
        assert_eq!(out, obj(json!({"city": "Tokyo", "address": "Tokyo"})));
    }

    #[test]
    fn location_from_object_text() {
        let out = normalize_location(&json!({"text": "Lyon, FR | Vieux Lyon"}));
        assert_eq!(out, obj(json!({"city": "Lyon", "address": "Vieux Lyon"})));
    }

    #[test]
    fn location_object_without_city_becomes_text() {
        let out = normalize_location(&json!({"lat": 1}));
        assert_eq!(out, obj(json!({"text": "{\"lat\":1}"})));
    }

    #[test]
    fn timestamp_parses_clock_line() {
        let out = normalize_timestamp(&json!("Date: September 13, 2025 Time: 15:46:47"));
        assert_eq!(out, obj(json!({"now_iso": "2025-09-13T15:46:47"})));
    }

    #[test]
    fn timestamp_keeps_unparsable_text() {
        let out = normalize_timestamp(&json!("sometime soon"));
        assert_eq!(out, obj(json!({"now_iso": "sometime soon"})));
    }

    #[test]
    fn timestamp_from_object_prefers_now_iso() {
        let out = normalize_timestamp(&json!({"now": "b", "now_iso": "a"}));
        assert_eq!(out["now_iso"], "a");
        let out = normalize_timestamp(&json!({"now": "b"}));
        assert_eq!(out["now_iso"], "b");
    }

    #[test]
    fn registry_defaults_and_fallback() {
        let registry = NormalizerRegistry::with_defaults();
        assert!(registry.has_specific(names::GET_CURRENT_GPS_COORDINATES));
        let out = registry.normalize(names::SEND_EMAIL, &json!("success"));
        assert_eq!(out, obj(json!({"text": "success"})));
    }

    #[test]
    fn closures_are_normalizers() {
        let registry = NormalizerRegistry::new().with("upper", |raw: &Value| {
            text(Value::String(raw.as_str().unwrap_or("").to_uppercase()))
        });
        assert_eq!(registry.normalize("upper", &json!("hi")), obj(json!({"text": "HI"})));
    }

    #[test]
    fn panicking_normalizer_falls_back_to_generic() {
        let registry = NormalizerRegistry::new().with("bad", |_: &Value| -> Canonical {
            panic!("broken normalizer")
        });
        assert_eq!(registry.normalize("bad", &json!("x")), obj(json!({"text": "x"})));
    }
}
