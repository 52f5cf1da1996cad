//! Scheduler lifecycle events and handlers.
//!
//! | Handler | Use |
//! |---------|-----|
//! | [`NoopHandler`] | Ignore everything (the scheduler default) |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use crate::agent::resolve::ResolveError;
use crate::tools::core::ToolArgs;
use crate::tools::normalize::Canonical;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    /// Parameter-free intents.
    NoParams,
    /// Parameterized intents and malformed entries, in plan order.
    WithParams,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::NoParams => "no-params",
            Phase::WithParams => "with-params",
            Phase::Done => "done",
        })
    }
}

/// Events emitted while a plan runs.
#[derive(Debug)]
pub enum SchedulerEvent<'a> {
    PhaseStarted(Phase),
    /// A tool is about to be dispatched with these resolved arguments.
    ToolExecuting {
        name: &'a str,
        arguments: &'a ToolArgs,
    },
    /// A tool returned and its result was normalized.
    ToolResult {
        name: &'a str,
        raw: &'a Value,
        normalized: &'a Canonical,
    },
    /// A plan entry at `index` is not a valid intent.
    InvalidIntent { index: usize, reason: &'a str },
    /// Parameters of `name` could not be resolved.
    ResolveFailed {
        name: &'a str,
        error: &'a ResolveError,
    },
    Finished { records: usize, errors: usize },
}

/// Observer for scheduler events.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        let _ = event;
    }
}

pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let SchedulerEvent::ToolResult { name, .. } = event {
///         println!("{name} done");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches every event to each inner handler in registration order.
#[derive(Default)]
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs every event through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        match event {
            SchedulerEvent::PhaseStarted(phase) => debug!("Scheduler phase: {phase}"),
            SchedulerEvent::ToolExecuting { name, arguments } => {
                debug!("Executing tool: {name} ({} argument(s))", arguments.len());
            }
            SchedulerEvent::ToolResult {
                name,
                raw,
                normalized,
            } => {
                let rendered = raw.to_string();
                debug!("Tool {name} result: {} bytes", rendered.len());
                let normalized = Value::Object((*normalized).clone()).to_string();
                trace!("Tool {name} normalized: {normalized}");
            }
            SchedulerEvent::InvalidIntent { index, reason } => {
                warn!("Plan entry {index} is not a valid tool call: {reason}");
            }
            SchedulerEvent::ResolveFailed { name, error } => {
                warn!("Could not resolve parameters of {name}: {error}");
            }
            SchedulerEvent::Finished { records, errors } => {
                info!("Turn finished: {records} record(s), {errors} error(s)");
            }
        }
    }
}
