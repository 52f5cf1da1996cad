//! Execution trace returned after a turn.

use crate::agent::memory::Memory;
use crate::agent::resolve::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// `tool_name` of records produced for malformed intents.
pub const ERROR_TOOL_NAME: &str = "error";

/// One executed (or rejected) intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub tool_name: String,
    pub tool_parameters: Value,
    pub results: Value,
}

impl TraceRecord {
    pub fn new(tool_name: impl Into<String>, tool_parameters: Value, results: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_parameters,
            results,
        }
    }

    /// Record for a plan entry that is not a valid intent.
    pub fn invalid(reason: &str) -> Self {
        Self::new(
            ERROR_TOOL_NAME,
            Value::Object(Map::new()),
            json!({ "error": format!("invalid tool call format: {reason}") }),
        )
    }

    /// Record for an intent whose parameters could not be resolved.
    pub fn resolve_failed(tool_name: &str, raw_parameters: Value, error: &ResolveError) -> Self {
        Self::new(
            tool_name,
            raw_parameters,
            json!({ "error": format!("param_resolve_failed: {error}") }),
        )
    }

    pub fn error_message(&self) -> Option<&str> {
        self.results.get("error").and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.tool_name == ERROR_TOOL_NAME || self.error_message().is_some()
    }
}

/// Accumulates records in execution order.
#[derive(Debug, Default)]
pub struct TraceBuilder {
    records: Vec<TraceRecord>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }

    pub fn finish(self) -> Vec<TraceRecord> {
        self.records
    }
}

/// Trace plus the memory it left behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub trace: Vec<TraceRecord>,
    pub memory: Memory,
}

impl TurnOutcome {
    /// Pretty JSON of the trace, the `# Tool results` block of the
    /// summarization prompt.
    pub fn results_for_summary(&self) -> String {
        serde_json::to_string_pretty(&self.trace).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn error_count(&self) -> usize {
        self.trace.iter().filter(|r| r.is_error()).count()
    }

    /// Records for `tool_name`, in execution order.
    pub fn records_for<'a>(&'a self, tool_name: &'a str) -> impl Iterator<Item = &'a TraceRecord> {
        self.trace.iter().filter(move |r| r.tool_name == tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_record_shape() {
        let record = TraceRecord::invalid("missing `name`");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "tool_name": "error",
                "tool_parameters": {},
                "results": {"error": "invalid tool call format: missing `name`"}
            })
        );
        assert!(record.is_error());
    }

    #[test]
    fn resolve_failed_keeps_raw_parameters() {
        let err = ResolveError::UnquotedContext("$CONTEXT(x)".into());
        let record = TraceRecord::resolve_failed("send_email", json!({"body": "$CONTEXT(x)"}), &err);
        assert_eq!(record.tool_parameters, json!({"body": "$CONTEXT(x)"}));
        assert!(record.error_message().unwrap().starts_with("param_resolve_failed: "));
    }

    #[test]
    fn summary_is_pretty_json_array() {
        let mut builder = TraceBuilder::new();
        builder.push(TraceRecord::new("a", json!({}), json!({"text": "ok"})));
        builder.push(TraceRecord::new("b", json!({}), json!({"error": "nope"})));
        assert_eq!(builder.error_count(), 1);
        let outcome = TurnOutcome {
            trace: builder.finish(),
            memory: Memory::new(),
        };
        let summary = outcome.results_for_summary();
        assert!(summary.starts_with("[\n"));
        let parsed: Vec<TraceRecord> = serde_json::from_str(&summary).unwrap();
        assert_eq!(parsed, outcome.trace);
        assert_eq!(outcome.records_for("b").count(), 1);
    }
}
