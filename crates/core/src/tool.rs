//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what the provider can ask the loop to run. Anything callable
//! is normalized into a [`Tool`] at registration time through a
//! [`ToolSource`]:
//!
//! - a free function ([`FnTool`])
//! - an object whose methods share its state ([`Toolbox`])
//! - an already-conformant `Arc<dyn Tool>`
//! - a list of any of the above, flattened

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema::{Param, ToolArgs, apply_defaults, object_schema};

/// Value a skipped breakpoint reports in place of a real result.
pub const SKIPPED: &str = "[skipped]";

/// Status of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    NotFound,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::NotFound => "not_found",
        }
    }

    /// Single-character marker for rendered traces and progress lines.
    pub fn glyph(&self) -> char {
        match self {
            Self::Success => '✓',
            Self::Error => '✗',
            Self::NotFound => '?',
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of dispatching one tool call.
///
/// Failures are data, not errors: the provider reads them on the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success { value: Value },
    Error { message: String },
    NotFound { name: String },
}

impl ToolResult {
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success {
            value: value.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// The synthesized result of a skipped breakpoint.
    pub fn skipped() -> Self {
        Self::success(SKIPPED)
    }

    pub fn status(&self) -> ToolStatus {
        match self {
            Self::Success { .. } => ToolStatus::Success,
            Self::Error { .. } => ToolStatus::Error,
            Self::NotFound { .. } => ToolStatus::NotFound,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Text placed in the tool message sent back to the provider.
    ///
    /// String values go verbatim, other values as compact JSON, failures as
    /// a small JSON object carrying the status.
    pub fn to_content(&self) -> String {
        match self {
            Self::Success {
                value: Value::String(s),
            } => s.clone(),
            Self::Success { value } => value.to_string(),
            Self::Error { message } => json!({ "status": "error", "error": message }).to_string(),
            Self::NotFound { name } => json!({
                "status": "not_found",
                "error": format!("Tool '{name}' not found"),
            })
            .to_string(),
        }
    }
}

/// The core Tool trait.
///
/// Registered in the [`ToolRegistry`] and made available to the agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "add", "search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the provider).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError>;

    /// Whether execution should pause at a breakpoint when debugging is on.
    fn breakpoint(&self) -> bool {
        false
    }

    /// Convert this tool into a ToolDefinition for sending to the provider.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

type Handler = Arc<dyn Fn(ToolArgs) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

fn fallback_description(name: &str) -> String {
    format!("Call the `{name}` tool.")
}

/// A tool backed by a free function or closure.
///
/// ```
/// use conductor_core::{FnTool, Param};
/// use serde_json::json;
///
/// let add = FnTool::sync("add", |args| Ok(json!(args.f64("a")? + args.f64("b")?)))
///     .describe("Add two numbers")
///     .param(Param::number("a"))
///     .param(Param::number("b"));
/// ```
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    params: Vec<Param>,
    breakpoint: bool,
    handler: Handler,
}

impl FnTool {
    /// Wrap an async callable.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let name = name.into();
        Self {
            description: fallback_description(&name),
            name,
            params: Vec::new(),
            breakpoint: false,
            handler: Arc::new(move |args| -> BoxFuture<'static, Result<Value, ToolError>> {
                Box::pin(f(args))
            }),
        }
    }

    /// Wrap a synchronous callable.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(name, move |args| {
            let f = Arc::clone(&f);
            async move { (*f)(args) }
        })
    }

    /// Attach documentation text. Blank text keeps the generic description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.trim().is_empty() {
            self.description = description.trim().to_string();
        }
        self
    }

    /// Declare one parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declare several parameters.
    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Flag this tool for breakpoints.
    pub fn with_breakpoint(mut self) -> Self {
        self.breakpoint = true;
        self
    }

    pub fn declared_params(&self) -> &[Param] {
        &self.params
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("breakpoint", &self.breakpoint)
            .finish()
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        object_schema(&self.params)
    }

    async fn execute(&self, mut arguments: Map<String, Value>) -> Result<Value, ToolError> {
        apply_defaults(&self.params, &mut arguments);
        (self.handler)(ToolArgs::new(arguments)).await
    }

    fn breakpoint(&self) -> bool {
        self.breakpoint
    }
}

/// An object exposing several methods as tools.
///
/// Every method is bound to the same `Arc<T>`, so state kept behind the
/// object's own interior mutability survives across calls. `describe`,
/// `param` and `with_breakpoint` apply to the most recently bound method.
pub struct Toolbox<T: Send + Sync + 'static> {
    target: Arc<T>,
    methods: Vec<FnTool>,
}

impl<T: Send + Sync + 'static> Toolbox<T> {
    pub fn new(target: T) -> Self {
        Self::from_arc(Arc::new(target))
    }

    pub fn from_arc(target: Arc<T>) -> Self {
        Self {
            target,
            methods: Vec::new(),
        }
    }

    /// The shared object every method is bound to.
    pub fn target(&self) -> Arc<T> {
        Arc::clone(&self.target)
    }

    /// Bind a synchronous method.
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T, ToolArgs) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        let target = Arc::clone(&self.target);
        self.methods
            .push(FnTool::sync(name, move |args| f(target.as_ref(), args)));
        self
    }

    /// Bind an async method. The method receives its own handle on the object.
    pub fn method_async<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<T>, ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let target = Arc::clone(&self.target);
        self.methods
            .push(FnTool::new(name, move |args| f(Arc::clone(&target), args)));
        self
    }

    fn map_last(mut self, f: impl FnOnce(FnTool) -> FnTool) -> Self {
        if let Some(last) = self.methods.pop() {
            self.methods.push(f(last));
        }
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.map_last(|m| m.describe(description))
    }

    pub fn param(self, param: Param) -> Self {
        self.map_last(|m| m.param(param))
    }

    pub fn with_breakpoint(self) -> Self {
        self.map_last(FnTool::with_breakpoint)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Anything that can be registered: the tagged-variant adapter that
/// normalizes heterogeneous callables into uniform tools.
pub enum ToolSource {
    Function(FnTool),
    Object(Vec<FnTool>),
    Tool(Arc<dyn Tool>),
    List(Vec<ToolSource>),
}

impl ToolSource {
    /// Wrap any value that already implements [`Tool`].
    pub fn tool(tool: impl Tool + 'static) -> Self {
        Self::Tool(Arc::new(tool))
    }

    /// Flatten into uniform tools, preserving declaration order.
    pub fn into_tools(self) -> Vec<Arc<dyn Tool>> {
        match self {
            Self::Function(f) => vec![Arc::new(f) as Arc<dyn Tool>],
            Self::Object(methods) => methods
                .into_iter()
                .map(|m| Arc::new(m) as Arc<dyn Tool>)
                .collect(),
            Self::Tool(tool) => vec![tool],
            Self::List(sources) => sources
                .into_iter()
                .flat_map(ToolSource::into_tools)
                .collect(),
        }
    }
}

impl From<FnTool> for ToolSource {
    fn from(tool: FnTool) -> Self {
        Self::Function(tool)
    }
}

impl<T: Send + Sync + 'static> From<Toolbox<T>> for ToolSource {
    fn from(toolbox: Toolbox<T>) -> Self {
        Self::Object(toolbox.methods)
    }
}

impl From<Arc<dyn Tool>> for ToolSource {
    fn from(tool: Arc<dyn Tool>) -> Self {
        Self::Tool(tool)
    }
}

impl From<Box<dyn Tool>> for ToolSource {
    fn from(tool: Box<dyn Tool>) -> Self {
        Self::Tool(Arc::from(tool))
    }
}

impl<S: Into<ToolSource>> From<Vec<S>> for ToolSource {
    fn from(sources: Vec<S>) -> Self {
        Self::List(sources.into_iter().map(Into::into).collect())
    }
}

/// A registry of available tools, keyed by name.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the provider
/// 2. Look up tools when the provider requests them
///
/// Definitions are listed in first-registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register tools. A tool whose name is already taken replaces the
    /// previous entry. Returns the tools that were registered.
    pub fn register(&mut self, source: impl Into<ToolSource>) -> Vec<Arc<dyn Tool>> {
        let tools = source.into().into_tools();
        for tool in &tools {
            let name = tool.name().to_string();
            if self.tools.insert(name.clone(), Arc::clone(tool)).is_some() {
                debug!(tool = %name, "Replacing previously registered tool");
            } else {
                self.order.push(name);
            }
        }
        tools
    }

    /// Remove a tool by name. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.tools.remove(name).is_some() {
            self.order.retain(|n| n != name);
            true
        } else {
            false
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered tools.
    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    /// Get all tool definitions (for sending to the provider).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.all().iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A simple hand-written tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
            Ok(arguments.get("text").cloned().unwrap_or(Value::Null))
        }
    }

    fn add_tool() -> FnTool {
        FnTool::sync("add", |args| Ok(json!(args.f64("a")? + args.f64("b")?)))
            .describe("Add two numbers")
            .param(Param::number("a"))
            .param(Param::number("b"))
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn status_glyphs_are_distinct() {
        let glyphs = [ToolStatus::Success, ToolStatus::Error, ToolStatus::NotFound].map(|s| s.glyph());
        assert_eq!(glyphs, ['✓', '✗', '?']);
        assert_eq!(ToolResult::skipped().status().glyph(), '✓');
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolSource::tool(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolSource::tool(EchoTool));
        registry.register(add_tool());
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].parameters["required"], json!(["a", "b"]));
    }

    #[test]
    fn same_name_registration_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool());
        registry.register(
            FnTool::sync("add", |args| Ok(json!(args.i64("x")?)))
                .param(Param::integer("x")),
        );

        assert_eq!(registry.len(), 1);
        let schema = registry.get("add").unwrap().parameters_schema();
        assert_eq!(schema["properties"]["x"]["type"], "integer");
        assert!(schema["properties"].get("a").is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut registry = ToolRegistry::new();
        registry.register(add_tool());
        assert!(registry.remove("add"));
        assert!(!registry.remove("add"));
        assert!(registry.is_empty());
        assert!(registry.names().is_empty());
    }

    #[test]
    fn lists_are_flattened() {
        let mut registry = ToolRegistry::new();
        let registered = registry.register(ToolSource::List(vec![
            add_tool().into(),
            ToolSource::tool(EchoTool),
            vec![FnTool::sync("noop", |_| Ok(Value::Null))].into(),
        ]));
        assert_eq!(registered.len(), 3);
        assert_eq!(registry.names(), vec!["add", "echo", "noop"]);
    }

    #[test]
    fn undocumented_tool_gets_generic_description() {
        let tool = FnTool::sync("ping", |_| Ok(json!("pong"))).describe("   ");
        assert_eq!(tool.description(), "Call the `ping` tool.");
    }

    #[tokio::test]
    async fn fn_tool_fills_defaults_before_running() {
        let tool = FnTool::sync("scale", |args| Ok(json!(args.f64("x")? * args.f64("factor")?)))
            .param(Param::number("x"))
            .param(Param::number("factor").default(2));

        let out = tool.execute(map(json!({"x": 21}))).await.unwrap();
        assert_eq!(out, json!(42.0));
        assert_eq!(tool.parameters_schema()["required"], json!(["x"]));
    }

    #[tokio::test]
    async fn async_fn_tool_runs() {
        let tool = FnTool::new("later", |args: ToolArgs| async move {
            tokio::task::yield_now().await;
            Ok::<_, ToolError>(json!(format!("hi {}", args.str("who")?)))
        });
        let out = tool.execute(map(json!({"who": "there"}))).await.unwrap();
        assert_eq!(out, json!("hi there"));
    }

    #[derive(Default)]
    struct Counter {
        value: Mutex<i64>,
    }

    #[tokio::test]
    async fn toolbox_methods_share_state() {
        let toolbox = Toolbox::new(Counter::default())
            .method("increment", |c: &Counter, args| {
                let mut v = c.value.lock().unwrap();
                *v += args.i64("by")?;
                Ok(json!(*v))
            })
            .describe("Increment the counter")
            .param(Param::integer("by").default(1))
            .method("current", |c: &Counter, _| Ok(json!(*c.value.lock().unwrap())))
            .with_breakpoint();
        let counter = toolbox.target();

        let mut registry = ToolRegistry::new();
        let tools = registry.register(toolbox);
        assert_eq!(tools.len(), 2);

        let inc = registry.get("increment").unwrap();
        inc.execute(Map::new()).await.unwrap();
        inc.execute(map(json!({"by": 4}))).await.unwrap();

        let current = registry.get("current").unwrap();
        assert_eq!(current.execute(Map::new()).await.unwrap(), json!(5));
        assert!(current.breakpoint());
        assert!(!inc.breakpoint());
        assert_eq!(inc.description(), "Increment the counter");
        assert_eq!(*counter.value.lock().unwrap(), 5);
    }

    #[test]
    fn result_content_rendering() {
        assert_eq!(ToolResult::success(json!(8)).to_content(), "8");
        assert_eq!(ToolResult::success("plain").to_content(), "plain");
        assert_eq!(ToolResult::skipped().to_content(), SKIPPED);

        let err: Value = serde_json::from_str(&ToolResult::error("boom").to_content()).unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["error"], "boom");

        let missing: Value =
            serde_json::from_str(&ToolResult::not_found("ghost").to_content()).unwrap();
        assert_eq!(missing["status"], "not_found");
        assert_eq!(ToolResult::not_found("ghost").status(), ToolStatus::NotFound);
    }
}
