//! Tool-orchestration engine for a proactive assistant.
//!
//! A planner (usually an LLM) reads a user's context and emits a *plan*: a
//! list of tool intents such as `get_current_gps_coordinates` followed by
//! `get_city_weather(city="$RESULT(get_current_gps_coordinates.city)")`.
//! `proact-rs` turns that plan into an executed, ordered trace:
//!
//! 1. Every parameter-free intent runs first, in plan order, seeding a shared
//!    [`Memory`](agent::memory::Memory).
//! 2. Every parameterized intent then runs in plan order, with placeholders
//!    resolved against memory and relative time phrases coerced into
//!    concrete date windows.
//!
//! Each tool result passes through a per-tool normalizer so that later
//! placeholders and the downstream summarizer see canonical fields
//! (`city`, `address`, `now_iso`) instead of tool-specific text.
//!
//! ```ignore
//! use proact_rs::prelude::*;
//!
//! let config = OrchestratorConfig::default().with_mode(ToolMode::Sandbox);
//! let registry = config.build_registry()?;
//! let normalizers = config.build_normalizers();
//! let plan = parse_plan(r#"[{"name": "get_current_gps_coordinates", "parameters": {}}]"#)?;
//!
//! let outcome = Scheduler::new(&registry, &normalizers)
//!     .with_resolver(config.build_resolver())
//!     .with_event_handler(&LoggingHandler)
//!     .run(&plan, Memory::new())
//!     .await;
//! println!("{}", outcome.results_for_summary());
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`agent`] | [`Scheduler`](agent::scheduler::Scheduler), memory, placeholder resolution, time phrases, trace, events, config |
//! | [`tools`] | [`Tool`](tools::core::Tool) trait, [`ToolRegistry`](tools::core::ToolRegistry), normalizers, sandbox and live tool modules |
//! | [`plan`] | Extracting and parsing the planner's tool list |

pub mod agent;
pub mod plan;
pub mod prelude;
pub mod tools;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use schemars;

/// Generate a JSON Schema [`Value`](serde_json::Value) from a Rust type.
///
/// Tool argument structs derive [`JsonSchema`] and pass the result to
/// [`ToolDef::new`], so definitions never drift from the types serde
/// actually deserializes.
///
/// ```
/// use proact_rs::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherArgs {
///     city: String,
///     #[serde(default)]
///     time: Option<String>,
/// }
///
/// let schema = json_schema_for::<WeatherArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"city".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

/// The type of a tool definition. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition in the OpenAI function-calling format, which is also
/// what planners are prompted with.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Parameter names declared by the schema, sorted.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .function
            .parameters
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// First line of the description.
    pub fn summary(&self) -> &str {
        self.function.description.lines().next().unwrap_or("").trim()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}
