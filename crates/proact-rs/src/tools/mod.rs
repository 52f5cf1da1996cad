//! Tool abstractions and the built-in tool catalogue.
//!
//! Every capability a plan can call is a [`Tool`] implementor. Tools are
//! collected into a [`ToolRegistry`], which handles dispatch, optional
//! argument validation, panic containment, and logging.
//!
//! # Submodules
//!
//! - [`core`]: [`Tool`] trait, [`ToolModule`], [`ToolRegistry`], [`FnTool`]
//!   and the [`Dispatcher`] seam used by the scheduler.
//! - [`names`]: canonical tool names.
//! - [`normalize`]: per-tool result normalizers producing canonical maps.
//! - [`sandbox`]: deterministic canned implementations of every tool.
//! - [`live`]: clock, IP geolocation, and weather tools backed by web APIs.

pub mod core;
pub mod live;
pub mod names;
pub mod normalize;
pub mod sandbox;

pub use core::{
    Dispatcher, FnTool, NoArgs, Tool, ToolArgs, ToolError, ToolFuture, ToolModule, ToolRegistry,
    parse_tool_args, validate_tool_arguments,
};
pub use live::{LiveTools, LiveToolsConfig};
pub use normalize::{Canonical, Normalizer, NormalizerRegistry};
pub use sandbox::SandboxTools;
