//! MCP server handler exposing the tool registry over rmcp

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{Error as McpError, RoleServer, ServerHandler};
use root_mcp_core::{ExecutionResult, GatewayError, ToolMetadata, ToolRegistry};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Runs Python and C++ inside one persistent ROOT interpreter. \
Use run_python for PyROOT code (the ROOT module is pre-imported) and run_cpp for code \
handed to cling. Each call returns a JSON object with ok, stdout, stderr, error, \
errorType and timedOut.";

#[derive(Clone)]
pub struct RootMcpHandler {
    registry: Arc<ToolRegistry>,
}

impl RootMcpHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry.list_tools().into_iter().map(to_mcp_tool).collect()
    }

    /// Run a tool call and shape the outcome for the protocol.
    ///
    /// Failed executions are still successful calls with `isError` set; only
    /// a request the gateway cannot act on becomes a protocol error.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult, McpError> {
        let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));

        match self.registry.execute(name, arguments).await {
            Ok(result) => to_call_result(&result),
            Err(err @ GatewayError::InvalidArguments { .. }) | Err(err @ GatewayError::UnknownTool(_)) => {
                log::warn!("Rejected call to '{}': {}", name, err);
                Err(McpError::invalid_params(err.to_string(), None))
            }
            Err(err) => {
                log::error!("Tool '{}' failed: {}", name, err);
                Err(McpError::internal_error(err.to_string(), None))
            }
        }
    }
}

impl ServerHandler for RootMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools(),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.invoke(&request.name, request.arguments.map(Value::Object)).await
    }
}

fn to_mcp_tool(metadata: ToolMetadata) -> Tool {
    Tool {
        name: Cow::Owned(metadata.name),
        description: Some(Cow::Owned(metadata.description)),
        input_schema: Arc::new(metadata.input_schema.as_object().cloned().unwrap_or_default()),
        annotations: None,
    }
}

fn to_call_result(result: &ExecutionResult) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(result)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize result: {}", e), None))?;

    if result.ok {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        Ok(CallToolResult::error(vec![Content::text(text)]))
    }
}
