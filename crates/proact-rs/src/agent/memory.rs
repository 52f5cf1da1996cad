//! Per-turn shared memory.
//!
//! Every tool call writes two entries: `raw::<tool>` with the value the tool
//! returned and `norm::<tool>` with its canonical form. Selected canonical
//! fields are also promoted to top-level aliases (`city`, `now_iso`) so that
//! later intents with missing parameters can be auto-filled, and the last
//! interpreted time phrase is kept under `time_range`.
//!
//! Memory only grows or overwrites during a turn; there is no delete.

use crate::agent::time_phrase::DateWindow;
use crate::tools::normalize::Canonical;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const RAW_PREFIX: &str = "raw::";
pub const NORM_PREFIX: &str = "norm::";
pub const CITY_KEY: &str = "city";
pub const NOW_ISO_KEY: &str = "now_iso";
pub const TIME_RANGE_KEY: &str = "time_range";

/// Copy a canonical field into a top-level memory key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub field: String,
    pub alias: String,
}

impl Promotion {
    pub fn new(field: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            alias: alias.into(),
        }
    }

    /// Promote `name` under the same name.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }
}

/// `city` and `now_iso`, from whichever tool produces them.
pub fn default_promotions() -> Vec<Promotion> {
    vec![Promotion::same(CITY_KEY), Promotion::same(NOW_ISO_KEY)]
}

pub fn raw_key(tool: &str) -> String {
    format!("{RAW_PREFIX}{tool}")
}

pub fn norm_key(tool: &str) -> String {
    format!("{NORM_PREFIX}{tool}")
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// String-keyed accumulator for one agent turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    entries: Map<String, Value>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed memory from an existing mapping.
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Seed memory from a JSON object; `null` gives an empty memory.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Null => Ok(Self::new()),
            other => serde_json::from_value(other),
        }
    }

    /// Add an entry (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw result of `tool`'s latest call.
    pub fn raw(&self, tool: &str) -> Option<&Value> {
        self.entries.get(&raw_key(tool))
    }

    /// Canonical result of `tool`'s latest call.
    pub fn normalized(&self, tool: &str) -> Option<&Value> {
        self.entries.get(&norm_key(tool))
    }

    /// Store a tool result and apply alias promotions.
    ///
    /// `raw` and `normalized` are written together so the canonical entry
    /// always reflects the latest raw value.
    pub fn record(
        &mut self,
        tool: &str,
        raw: Value,
        normalized: &Canonical,
        promotions: &[Promotion],
    ) {
        self.set(raw_key(tool), raw);
        self.set(norm_key(tool), Value::Object(normalized.clone()));
        for promotion in promotions {
            if let Some(value) = normalized.get(&promotion.field).filter(|v| has_content(v)) {
                debug!(tool = %tool, alias = %promotion.alias, "Promoting {} = {value}", promotion.field);
                self.set(promotion.alias.clone(), value.clone());
            }
        }
    }

    pub fn city(&self) -> Option<&str> {
        self.get(CITY_KEY).and_then(Value::as_str)
    }

    pub fn now_iso(&self) -> Option<&str> {
        self.get(NOW_ISO_KEY).and_then(Value::as_str)
    }

    pub fn time_range(&self) -> Option<DateWindow> {
        self.get(TIME_RANGE_KEY).and_then(DateWindow::from_value)
    }

    /// Tools with a recorded result, in key order.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|k| k.strip_prefix(NORM_PREFIX))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }
}
