//! Tool abstraction and the dispatch registry.
//!
//! The [`Tool`] trait defines what every tool implements: a definition
//! (name, description, JSON schema) and an async `execute` method taking
//! keyword arguments. Tools are collected into a [`ToolRegistry`], which
//! handles registration, module discovery, and dispatch by name.
//!
//! Dispatch never fails from the caller's point of view. Unknown names,
//! argument errors, tool errors and tool panics all come back as an
//! `{"error": "..."}` value so that one bad intent cannot abort a turn.

use crate::ToolDef;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Keyword arguments passed to a tool.
pub type ToolArgs = Map<String, Value>;

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + 'a>>;

/// Boxed future returned by [`Dispatcher::dispatch`].
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Value> + Send + 'a>>;

/// Why a tool call produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Function {0} is not implemented.")]
    NotImplemented(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("{0}")]
    Failed(String),
    #[error("tool {tool} panicked: {message}")]
    Panicked { tool: String, message: String },
}

impl ToolError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// The error as a tool result value.
    pub fn to_result(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

/// A tool that a plan can invoke by name.
pub trait Tool: Send + Sync {
    /// The definition advertised to the planner.
    fn definition(&self) -> ToolDef;

    /// Execute the tool with keyword arguments.
    fn execute(&self, arguments: ToolArgs) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.definition().function.name
    }
}

/// A named group of tools registered together.
pub trait ToolModule {
    fn name(&self) -> &str;
    fn tools(&self) -> Vec<Box<dyn Tool>>;
}

/// Something that can execute a tool call and yield a result value.
///
/// [`ToolRegistry`] is the production implementation. The scheduler only
/// depends on this trait, so tests can substitute scripted dispatchers.
pub trait Dispatcher: Send + Sync {
    fn dispatch<'a>(&'a self, name: &'a str, arguments: ToolArgs) -> DispatchFuture<'a>;
}

/// Empty argument struct for tools that take no parameters.
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct NoArgs {}

type ErasedToolHandler = Box<dyn Fn(ToolArgs) -> ToolFuture<'static> + Send + Sync>;

/// A tool backed by an async closure over typed arguments.
///
/// Arguments are deserialized into `A` before the closure runs; a
/// deserialization failure becomes [`ToolError::InvalidArguments`]. The
/// closure's output is serialized back to a JSON value.
///
/// ```ignore
/// let tool = FnTool::new(
///     ToolDef::new("echo", "Echo text", json_schema_for::<EchoArgs>()),
///     |args: EchoArgs| async move { Ok::<_, ToolError>(args.text) },
/// );
/// ```
pub struct FnTool {
    def: ToolDef,
    handler: ErasedToolHandler,
}

impl FnTool {
    pub fn new<A, T, F, Fut>(def: ToolDef, handler: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        T: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ToolError>> + Send + 'static,
    {
        let tool_name = def.function.name.clone();
        let erased = move |arguments: ToolArgs| -> ToolFuture<'static> {
            let args: A = match parse_tool_args(&tool_name, arguments) {
                Ok(a) => a,
                Err(e) => return Box::pin(async move { Err(e) }),
            };
            let fut = handler(args);
            Box::pin(async move {
                let output = fut.await?;
                serde_json::to_value(output)
                    .map_err(|e| ToolError::failed(format!("result is not serializable: {e}")))
            })
        };

        Self {
            def,
            handler: Box::new(erased),
        }
    }
}

impl Tool for FnTool {
    fn definition(&self) -> ToolDef {
        self.def.clone()
    }

    fn execute(&self, arguments: ToolArgs) -> ToolFuture<'_> {
        (self.handler)(arguments)
    }
}

/// Name-keyed collection of tools.
///
/// Registering a name twice keeps the later tool and logs a warning.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    modules: BTreeMap<String, Vec<String>>,
    validate_args: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover every tool exposed by `modules`, in order.
    pub fn discover(modules: &[&dyn ToolModule]) -> Self {
        let mut registry = Self::new();
        for module in modules {
            registry.register_module(*module);
        }
        registry
    }

    /// Validate arguments against each tool's JSON schema before dispatch.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.insert(Box::new(tool), None);
    }

    pub fn register_boxed(&mut self, tool: Box<dyn Tool>) {
        self.insert(tool, None);
    }

    pub fn register_module(&mut self, module: &dyn ToolModule) {
        let module_name = module.name().to_string();
        let tools = module.tools();
        debug!(module = %module_name, count = tools.len(), "Registering tool module");
        for tool in tools {
            self.insert(tool, Some(&module_name));
        }
    }

    /// Add a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Conditionally add a tool (builder pattern).
    pub fn with_if(self, condition: bool, tool: impl Tool + 'static) -> Self {
        if condition { self.with(tool) } else { self }
    }

    /// Add every tool of a module (builder pattern).
    pub fn with_module(mut self, module: &dyn ToolModule) -> Self {
        self.register_module(module);
        self
    }

    fn insert(&mut self, tool: Box<dyn Tool>, module: Option<&str>) {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            warn!(
                tool = %name,
                module = module.unwrap_or("<direct>"),
                "Duplicate tool name; later registration overrides the earlier one"
            );
            for names in self.modules.values_mut() {
                names.retain(|n| n != &name);
            }
            self.modules.retain(|_, names| !names.is_empty());
        }
        if let Some(module) = module {
            self.modules
                .entry(module.to_string())
                .or_default()
                .push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn definition(&self, name: &str) -> Option<ToolDef> {
        self.tools.get(name).map(|t| t.definition())
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDef> {
        let mut defs: Vec<ToolDef> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Module name to the tool names it contributed.
    pub fn modules(&self) -> &BTreeMap<String, Vec<String>> {
        &self.modules
    }

    /// Module that contributed `name`, if any.
    pub fn module_of(&self, name: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(module, _)| module.as_str())
    }

    /// Execute a tool by name.
    ///
    /// A panic inside the tool, whether raised while building its future or
    /// while polling it, is caught and reported as [`ToolError::Panicked`].
    pub async fn call(&self, name: &str, arguments: ToolArgs) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotImplemented(name.to_string()))?;

        if self.validate_args
            && let Some(message) = validate_tool_arguments(tool.as_ref(), &arguments)
        {
            warn!(tool = %name, "Argument validation failed: {message}");
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                message,
            });
        }

        log_tool_call(name, &arguments);
        let start = Instant::now();
        let outcome = AssertUnwindSafe(async { tool.execute(arguments).await })
            .catch_unwind()
            .await;
        let elapsed_ms = start.elapsed().as_millis();

        match outcome {
            Ok(result) => {
                match &result {
                    Ok(_) => debug!("[tool] {name} finished in {elapsed_ms}ms"),
                    Err(e) => warn!("[tool] {name} failed after {elapsed_ms}ms: {e}"),
                }
                result
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("[tool] {name} panicked after {elapsed_ms}ms: {message}");
                Err(ToolError::Panicked {
                    tool: name.to_string(),
                    message,
                })
            }
        }
    }
}

impl Dispatcher for ToolRegistry {
    fn dispatch<'a>(&'a self, name: &'a str, arguments: ToolArgs) -> DispatchFuture<'a> {
        Box::pin(async move {
            match self.call(name, arguments).await {
                Ok(value) => value,
                Err(e) => e.to_result(),
            }
        })
    }
}

/// Log a tool call at several verbosity levels.
pub fn log_tool_call(name: &str, arguments: &ToolArgs) {
    let rendered = Value::Object(arguments.clone()).to_string();
    let preview: String = rendered.chars().take(120).collect();
    info!(
        "[tool] {}({preview}{})",
        name,
        if rendered.chars().count() > 120 { "..." } else { "" }
    );
    trace!("[tool] {name} arguments: {rendered}");
}

/// Deserialize keyword arguments into a typed struct.
pub fn parse_tool_args<T: DeserializeOwned>(tool: &str, arguments: ToolArgs) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Check arguments against the tool's parameter schema.
///
/// Returns a description of every violation, or `None` when the arguments
/// conform or the schema itself cannot be compiled.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &ToolArgs) -> Option<String> {
    let schema = tool.definition().function.parameters;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            debug!(tool = %tool.name(), "Skipping validation, schema does not compile: {e}");
            return None;
        }
    };
    let instance = Value::Object(arguments.clone());
    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let path = e.instance_path().to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
