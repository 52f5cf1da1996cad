//! Convenience re-exports for common `proact-rs` types.
//!
//! ```ignore
//! use proact_rs::prelude::*;
//! ```
//!
//! Pulls in what a caller needs to build a registry, run a plan, and read
//! the outcome. Normalizer internals and the individual tool argument
//! structs stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ToolDef, json_schema_for};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    CompositeEventHandler, ConfigError, DateWindow, EventHandler, FnEventHandler, LoggingHandler,
    Memory, NoopHandler, OrchestratorConfig, Phase, Promotion, ResolveError, Scheduler,
    SchedulerEvent, ToolMode, TraceRecord, TurnOutcome,
};

// ── Plans ───────────────────────────────────────────────────────────
pub use crate::plan::{PlanError, ToolIntent, load_plan, parse_model_output, parse_plan};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{
    Dispatcher, FnTool, LiveTools, NoArgs, NormalizerRegistry, SandboxTools, Tool, ToolArgs,
    ToolError, ToolFuture, ToolModule, ToolRegistry, parse_tool_args,
};
