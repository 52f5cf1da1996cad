//! Agent runtime: the [`Scheduler`] and its supporting modules.
//!
//! - [`scheduler::Scheduler`]: runs one turn's plan in two phases. Start here.
//! - [`config::OrchestratorConfig`]: tool mode, resolver and promotion
//!   settings, and builders for the registry and scheduler.
//! - [`resolve`]: placeholder parsing and parameter resolution.
//! - [`memory`]: the per-turn [`Memory`] of raw and normalized results.
//! - [`time_phrase`]: fixed time phrases to [`DateWindow`]s.
//! - [`trace`]: [`TraceRecord`]s and the [`TurnOutcome`] of a run.
//! - [`events`]: [`EventHandler`] trait and [`SchedulerEvent`] enum for
//!   observing a run.

pub mod config;
pub mod events;
pub mod memory;
pub mod resolve;
pub mod scheduler;
pub mod time_phrase;
pub mod trace;

pub use config::{ConfigError, OrchestratorConfig, ToolMode};
pub use events::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler, Phase,
    SchedulerEvent,
};
pub use memory::{Memory, Promotion};
pub use resolve::{ParameterResolver, ParameterValue, ResolveError, ResultRef};
pub use scheduler::Scheduler;
pub use time_phrase::DateWindow;
pub use trace::{TraceRecord, TurnOutcome};
