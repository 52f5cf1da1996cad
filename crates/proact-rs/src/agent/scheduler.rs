//! Two-phase execution of a tool plan.
//!
//! The [`Scheduler`] runs one plan against one [`Memory`]:
//!
//! 1. **No-params phase.** Every well-formed intent without parameters is
//!    dispatched with an empty argument mapping, in plan order. These are
//!    the context-gathering calls (location, clock) that later intents
//!    reference.
//! 2. **With-params phase.** Every remaining plan entry, in plan order.
//!    Malformed entries become `"error"` records; the rest are resolved
//!    against the current memory, dispatched and recorded.
//!
//! Each result is normalized, written to memory as `raw::`/`norm::` entries,
//! and appended to the trace. Nothing aborts the batch: every plan entry
//! produces exactly one record.
//!
//! Calls run one at a time. A with-params intent that references a later
//! with-params intent sees `null`.
//!
//! ```ignore
//! let outcome = Scheduler::new(&registry, &normalizers)
//!     .with_event_handler(&LoggingHandler)
//!     .run(&plan, Memory::new())
//!     .await;
//! ```

use crate::agent::events::{EventHandler, NoopHandler, Phase, SchedulerEvent};
use crate::agent::memory::{Memory, Promotion, default_promotions};
use crate::agent::resolve::{ParameterResolver, ResolveError};
use crate::agent::trace::{TraceBuilder, TraceRecord, TurnOutcome};
use crate::plan::{IntentParameters, ToolIntent, json_type};
use crate::tools::core::{Dispatcher, ToolArgs};
use crate::tools::normalize::NormalizerRegistry;
use serde_json::{Map, Value};
use tracing::{debug, warn};

static NOOP_HANDLER: NoopHandler = NoopHandler;

pub struct Scheduler<'a> {
    dispatcher: &'a dyn Dispatcher,
    normalizers: &'a NormalizerRegistry,
    resolver: ParameterResolver,
    promotions: Vec<Promotion>,
    event_handler: &'a dyn EventHandler,
}

impl<'a> Scheduler<'a> {
    pub fn new(dispatcher: &'a dyn Dispatcher, normalizers: &'a NormalizerRegistry) -> Self {
        Self {
            dispatcher,
            normalizers,
            resolver: ParameterResolver::default(),
            promotions: default_promotions(),
            event_handler: &NOOP_HANDLER,
        }
    }

    pub fn with_resolver(mut self, resolver: ParameterResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_promotions(mut self, promotions: Vec<Promotion>) -> Self {
        self.promotions = promotions;
        self
    }

    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    fn emit(&self, event: SchedulerEvent<'_>) {
        self.event_handler.on_event(&event);
    }

    /// Execute `plan` and return the trace with the populated memory.
    pub async fn run(&self, plan: &[Value], mut memory: Memory) -> TurnOutcome {
        self.emit(SchedulerEvent::PhaseStarted(Phase::Init));
        let entries: Vec<_> = plan.iter().map(ToolIntent::from_value).collect();
        let mut trace = TraceBuilder::new();

        self.emit(SchedulerEvent::PhaseStarted(Phase::NoParams));
        for intent in entries
            .iter()
            .filter_map(|entry| entry.as_ref().ok())
            .filter(|intent| intent.is_parameter_free())
        {
            let results = self
                .execute(&intent.name, ToolArgs::new(), &mut memory)
                .await;
            trace.push(TraceRecord::new(
                intent.name.clone(),
                Value::Object(Map::new()),
                results,
            ));
        }

        self.emit(SchedulerEvent::PhaseStarted(Phase::WithParams));
        for (index, entry) in entries.iter().enumerate() {
            let intent = match entry {
                Ok(intent) if intent.is_parameter_free() => continue,
                Ok(intent) => intent,
                Err(malformed) => {
                    let reason = malformed.to_string();
                    self.emit(SchedulerEvent::InvalidIntent {
                        index,
                        reason: &reason,
                    });
                    trace.push(TraceRecord::invalid(&reason));
                    continue;
                }
            };

            let arguments = match self.resolve(intent, &mut memory) {
                Ok(arguments) => arguments,
                Err(error) => {
                    self.emit(SchedulerEvent::ResolveFailed {
                        name: &intent.name,
                        error: &error,
                    });
                    trace.push(TraceRecord::resolve_failed(
                        &intent.name,
                        intent.parameters.to_value(),
                        &error,
                    ));
                    continue;
                }
            };

            let recorded = Value::Object(arguments.clone());
            let results = self.execute(&intent.name, arguments, &mut memory).await;
            trace.push(TraceRecord::new(intent.name.clone(), recorded, results));
        }

        self.emit(SchedulerEvent::PhaseStarted(Phase::Done));
        self.emit(SchedulerEvent::Finished {
            records: trace.len(),
            errors: trace.error_count(),
        });
        if trace.len() != plan.len() {
            warn!("Trace has {} record(s) for {} plan entries", trace.len(), plan.len());
        }

        TurnOutcome {
            trace: trace.finish(),
            memory,
        }
    }

    fn resolve(&self, intent: &ToolIntent, memory: &mut Memory) -> Result<ToolArgs, ResolveError> {
        match &intent.parameters {
            IntentParameters::Map(parameters) => self.resolver.resolve(parameters, memory),
            IntentParameters::None => Ok(ToolArgs::new()),
            IntentParameters::Invalid(value) => {
                Err(ResolveError::NotAnObject(json_type(value).to_string()))
            }
        }
    }

    /// Dispatch, normalize, and record one call. Returns the canonical result.
    async fn execute(&self, name: &str, arguments: ToolArgs, memory: &mut Memory) -> Value {
        self.emit(SchedulerEvent::ToolExecuting {
            name,
            arguments: &arguments,
        });
        let raw = self.dispatcher.dispatch(name, arguments).await;
        // Error results keep their shape and never feed aliases.
        let (normalized, promotions) = match error_result(&raw) {
            Some(error) => (error.clone(), &[][..]),
            None => (self.normalizers.normalize(name, &raw), self.promotions.as_slice()),
        };
        self.emit(SchedulerEvent::ToolResult {
            name,
            raw: &raw,
            normalized: &normalized,
        });
        debug!(tool = %name, fields = normalized.len(), "Recorded result");
        memory.record(name, raw, &normalized, promotions);
        Value::Object(normalized)
    }
}

/// The result mapping if `raw` is an `{"error": ..}` dispatch result.
fn error_result(raw: &Value) -> Option<&Map<String, Value>> {
    raw.as_object().filter(|map| map.contains_key("error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::memory::norm_key;
    use crate::tools::core::DispatchFuture;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns canned values and records every call.
    struct Scripted {
        responses: Vec<(&'static str, Value)>,
        calls: Mutex<Vec<(String, ToolArgs)>>,
    }

    impl Scripted {
        fn new(responses: Vec<(&'static str, Value)>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, ToolArgs)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Dispatcher for Scripted {
        fn dispatch<'a>(&'a self, name: &'a str, arguments: ToolArgs) -> DispatchFuture<'a> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            let response = self
                .responses
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| json!({"error": format!("Function {name} is not implemented.")}));
            Box::pin(async move { response })
        }
    }

    fn gps() -> (&'static str, Value) {
        (
            "get_current_gps_coordinates",
            json!("Hong Kong, Hong Kong, HK | Wan Chai, Hong Kong"),
        )
    }

    #[tokio::test]
    async fn parameter_free_calls_run_first() {
        let dispatcher = Scripted::new(vec![gps(), ("get_city_weather", json!("sunny"))]);
        let normalizers = NormalizerRegistry::with_defaults();
        let plan = vec![
            json!({"name": "get_city_weather", "parameters": {"city": "$RESULT(get_current_gps_coordinates.city)"}}),
            json!({"name": "get_current_gps_coordinates", "parameters": {}}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers).run(&plan, Memory::new()).await;

        let names: Vec<_> = outcome.trace.iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(names, vec!["get_current_gps_coordinates", "get_city_weather"]);
        assert_eq!(outcome.trace[1].tool_parameters, json!({"city": "Hong Kong"}));
        assert_eq!(outcome.trace[1].results, json!({"text": "sunny"}));
        assert_eq!(dispatcher.calls()[0].1, ToolArgs::new());
    }

    #[tokio::test]
    async fn malformed_entries_keep_plan_position() {
        let dispatcher = Scripted::new(vec![("a", json!("1")), ("b", json!("2"))]);
        let normalizers = NormalizerRegistry::new();
        let plan = vec![
            json!({"name": "a", "parameters": {"x": 1}}),
            json!({"parameters": {}}),
            json!("not an intent"),
            json!({"name": "b", "parameters": {"y": 2}}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers).run(&plan, Memory::new()).await;

        assert_eq!(outcome.trace.len(), 4);
        let names: Vec<_> = outcome.trace.iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(names, vec!["a", "error", "error", "b"]);
        assert_eq!(
            outcome.trace[1].results,
            json!({"error": "invalid tool call format: missing `name`"})
        );
        assert_eq!(outcome.trace[1].tool_parameters, json!({}));
    }

    #[tokio::test]
    async fn resolution_failure_is_contained() {
        let dispatcher = Scripted::new(vec![("send_email", json!("success"))]);
        let normalizers = NormalizerRegistry::new();
        let plan = vec![
            json!({"name": "send_email", "parameters": {"body": "$CONTEXT(unquoted)"}}),
            json!({"name": "send_email", "parameters": ["not", "a", "map"]}),
            json!({"name": "send_email", "parameters": {"body": "$CONTEXT('hi')"}}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers).run(&plan, Memory::new()).await;

        assert_eq!(outcome.trace.len(), 3);
        assert_eq!(outcome.trace[0].tool_parameters, json!({"body": "$CONTEXT(unquoted)"}));
        assert!(
            outcome.trace[0]
                .error_message()
                .unwrap()
                .starts_with("param_resolve_failed: ")
        );
        assert_eq!(outcome.trace[1].tool_parameters, json!(["not", "a", "map"]));
        assert_eq!(outcome.trace[2].tool_parameters, json!({"body": "hi"}));
        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn memory_reflects_latest_results() {
        let dispatcher = Scripted::new(vec![
            gps(),
            ("get_current_datetime", json!("Date: September 13, 2025 Time: 15:46:47")),
        ]);
        let normalizers = NormalizerRegistry::with_defaults();
        let plan = vec![
            json!({"name": "get_current_gps_coordinates", "parameters": null}),
            json!({"name": "get_current_datetime", "parameters": "None"}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers).run(&plan, Memory::new()).await;
        let memory = &outcome.memory;

        assert_eq!(memory.city(), Some("Hong Kong"));
        assert_eq!(memory.now_iso(), Some("2025-09-13T15:46:47"));
        assert_eq!(
            memory.get(&norm_key("get_current_gps_coordinates")),
            Some(&Value::Object(
                normalizers.normalize("get_current_gps_coordinates", memory.raw("get_current_gps_coordinates").unwrap())
            ))
        );
    }

    #[tokio::test]
    async fn later_params_see_earlier_params() {
        let dispatcher = Scripted::new(vec![("first", json!({"id": 7})), ("second", json!("ok"))]);
        let normalizers = NormalizerRegistry::new();
        let plan = vec![
            json!({"name": "second", "parameters": {"ref": "$RESULT(third.id)"}}),
            json!({"name": "first", "parameters": {"q": "x"}}),
            json!({"name": "second", "parameters": {"ref": "$RESULT(first.id)"}}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers).run(&plan, Memory::new()).await;
        assert_eq!(outcome.trace[0].tool_parameters, json!({"ref": null}));
        assert_eq!(outcome.trace[2].tool_parameters, json!({"ref": 7}));
    }

    #[tokio::test]
    async fn events_follow_the_state_machine() {
        use crate::agent::events::FnEventHandler;

        let phases = Mutex::new(Vec::new());
        let handler = FnEventHandler::new(|event: &SchedulerEvent<'_>| {
            if let SchedulerEvent::PhaseStarted(phase) = event {
                phases.lock().unwrap().push(*phase);
            }
        });
        let dispatcher = Scripted::new(vec![]);
        let normalizers = NormalizerRegistry::new();
        let outcome = Scheduler::new(&dispatcher, &normalizers)
            .with_event_handler(&handler)
            .run(&[json!({"name": "foo", "parameters": {}})], Memory::new())
            .await;

        assert_eq!(
            *phases.lock().unwrap(),
            vec![Phase::Init, Phase::NoParams, Phase::WithParams, Phase::Done]
        );
        assert_eq!(outcome.trace[0].results, json!({"error": "Function foo is not implemented."}));
    }

    #[tokio::test]
    async fn custom_promotions() {
        let dispatcher = Scripted::new(vec![gps()]);
        let normalizers = NormalizerRegistry::with_defaults();
        let outcome = Scheduler::new(&dispatcher, &normalizers)
            .with_promotions(vec![Promotion::new("address", "street")])
            .run(&[json!({"name": "get_current_gps_coordinates", "parameters": {}})], Memory::new())
            .await;
        assert_eq!(outcome.memory.get("street"), Some(&json!("Wan Chai, Hong Kong")));
        assert_eq!(outcome.memory.city(), None);
    }

    #[tokio::test]
    async fn error_results_stay_error_shaped() {
        let dispatcher = Scripted::new(vec![]);
        let normalizers = NormalizerRegistry::with_defaults();
        let plan = vec![
            json!({"name": "get_current_gps_coordinates", "parameters": {}}),
            json!({"name": "get_current_datetime", "parameters": {}}),
            json!({"name": "get_city_weather", "parameters": {"time": "today"}}),
        ];
        let outcome = Scheduler::new(&dispatcher, &normalizers)
            .run(&plan, Memory::new().with("now_iso", json!("2025-09-13T15:46:47")))
            .await;

        assert_eq!(
            outcome.trace[0].results,
            json!({"error": "Function get_current_gps_coordinates is not implemented."})
        );
        assert!(outcome.trace[1].is_error());
        assert_eq!(outcome.error_count(), 3);
        assert_eq!(
            outcome.memory.normalized("get_current_datetime"),
            Some(&json!({"error": "Function get_current_datetime is not implemented."}))
        );
        assert_eq!(outcome.memory.now_iso(), Some("2025-09-13T15:46:47"));
        assert_eq!(outcome.memory.city(), None);
        assert_eq!(
            outcome.trace[2].tool_parameters,
            json!({"time": {"start_date": "2025-09-13", "end_date": "2025-09-13"}})
        );
    }
}
