//! Tool system exposing the execution gateway to a transport
//!
//! Each language is one tool taking `{"code": string}`. The registry resolves
//! both the canonical names and the legacy `root_*` aliases, and arguments are
//! validated against the tool's JSON schema before anything is dispatched.

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatcher::ExecutionDispatcher;
use crate::errors::GatewayError;
use crate::executors::{ExecutionResult, Language};

pub const RUN_PYTHON: &str = "run_python";
pub const RUN_CPP: &str = "run_cpp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

// Core Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;
    async fn execute(&self, arguments: Value) -> Result<ExecutionResult, GatewayError>;
}

/// Runs the `code` argument in one language through the shared dispatcher.
pub struct ExecuteCodeTool {
    language: Language,
    dispatcher: Arc<ExecutionDispatcher>,
}

impl ExecuteCodeTool {
    pub fn new(language: Language, dispatcher: Arc<ExecutionDispatcher>) -> Self {
        Self { language, dispatcher }
    }

    /// Metadata for the tool serving `language`, without needing a dispatcher.
    pub fn metadata_for(language: Language) -> ToolMetadata {
        let (name, description) = match language {
            Language::Python => (
                RUN_PYTHON,
                "Execute Python code in the embedded PyROOT interpreter. The module `ROOT` is \
                 pre-imported and names defined by earlier calls stay available. Returns ok, \
                 stdout, stderr, error and errorType.",
            ),
            Language::Cpp => (
                RUN_CPP,
                "Execute C++ code through ROOT's cling interpreter (gInterpreter.Declare, \
                 falling back to ProcessLine). Output from both C++ streams and Python is \
                 captured. Returns ok, stdout, stderr, error and errorType.",
            ),
        };

        ToolMetadata {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": format!("{} source to execute", language)
                    }
                },
                "required": ["code"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl Tool for ExecuteCodeTool {
    fn metadata(&self) -> ToolMetadata {
        Self::metadata_for(self.language)
    }

    async fn execute(&self, arguments: Value) -> Result<ExecutionResult, GatewayError> {
        let metadata = self.metadata();
        validate_arguments(&metadata, &arguments)?;

        let code = arguments
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GatewayError::InvalidArguments {
                tool_name: metadata.name.clone(),
                message: "Missing or invalid 'code' parameter".to_string(),
            })?;

        Ok(self.dispatcher.dispatch(self.language, code.to_string()).await)
    }
}

/// Check `arguments` against the tool's input schema.
pub fn validate_arguments(metadata: &ToolMetadata, arguments: &Value) -> Result<(), GatewayError> {
    let schema = JSONSchema::compile(&metadata.input_schema).map_err(|e| GatewayError::InvalidArguments {
        tool_name: metadata.name.clone(),
        message: format!("Invalid tool schema: {}", e),
    })?;

    let outcome = schema
        .validate(arguments)
        .map_err(|errors| errors.map(|e| e.to_string()).collect::<Vec<_>>());

    outcome.map_err(|messages| GatewayError::InvalidArguments {
        tool_name: metadata.name.clone(),
        message: messages.join("; "),
    })
}

// Tool registry for managing multiple tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name.clone();
        self.tools.insert(name, tool);
    }

    /// Make `alias` resolve to the tool registered as `target`.
    pub fn register_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.tools.get(name).cloned()
    }

    /// Canonical tools, sorted by name. Aliases are not listed.
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self.tools.values().map(|tool| tool.metadata()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Look up `name` and run it, or fail with `UnknownTool`.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<ExecutionResult, GatewayError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        tool.execute(arguments).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Tool factory for creating the gateway tools
pub struct ToolFactory;

impl ToolFactory {
    pub fn create_python_tool(dispatcher: Arc<ExecutionDispatcher>) -> Arc<dyn Tool> {
        Arc::new(ExecuteCodeTool::new(Language::Python, dispatcher))
    }

    pub fn create_cpp_tool(dispatcher: Arc<ExecutionDispatcher>) -> Arc<dyn Tool> {
        Arc::new(ExecuteCodeTool::new(Language::Cpp, dispatcher))
    }

    /// Metadata of the default tools, sorted by name.
    pub fn default_tool_metadata() -> Vec<ToolMetadata> {
        vec![
            ExecuteCodeTool::metadata_for(Language::Cpp),
            ExecuteCodeTool::metadata_for(Language::Python),
        ]
    }

    pub fn create_default_registry(dispatcher: Arc<ExecutionDispatcher>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_tool(Self::create_python_tool(dispatcher.clone()));
        registry.register_tool(Self::create_cpp_tool(dispatcher));
        registry.register_alias("root_python", RUN_PYTHON);
        registry.register_alias("root_cpp", RUN_CPP);
        registry
    }
}
