//! The MCP surface: an rmcp `ServerHandler` wrapping the tool catalog.

use petstore_http_tools::catalog::ToolCatalog;
use petstore_http_tools::runtime::ToolError;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use serde_json::Value;
use tracing::warn;

#[derive(Clone)]
pub struct PetstoreServer {
    catalog: ToolCatalog,
}

impl PetstoreServer {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }
}

impl ServerHandler for PetstoreServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "petstore-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::default()
            },
            instructions: Some(
                "Tools for the Swagger Petstore API: manage pets, store orders, and users. \
                 Operations that fail or return no content yield `null`."
                    .to_string(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, rmcp::ErrorData>> + Send + '_
    {
        async move {
            Ok(ListToolsResult {
                tools: self.catalog.list_tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, rmcp::ErrorData>> + Send + '_
    {
        async move {
            let arguments = request
                .arguments
                .map(Value::Object)
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            let outcome = self.catalog.call_tool(&request.name, &arguments).await;
            render_outcome(&request.name, outcome)
        }
    }
}

/// Collapse a call outcome into the wire result.
///
/// HTTP and transport failures are reported as `null`, exactly like a
/// response with no content; the warn line on stderr is the only place the
/// difference is visible. Unknown tools and unusable arguments are rejected
/// before any request is made.
fn render_outcome(
    tool: &str,
    outcome: petstore_http_tools::runtime::Result<Option<Value>>,
) -> Result<CallToolResult, rmcp::ErrorData> {
    match outcome {
        Ok(Some(value)) => Ok(CallToolResult::success(vec![Content::text(render_value(
            &value,
        ))])),
        Ok(None) => Ok(CallToolResult::success(vec![Content::text("null")])),
        Err(e @ (ToolError::UnknownTool(_) | ToolError::Arguments(_))) => {
            Err(rmcp::ErrorData::invalid_params(e.to_string(), None))
        }
        Err(e) => {
            warn!(tool = %tool, error = %e, "HTTP request failed");
            Ok(CallToolResult::success(vec![Content::text("null")]))
        }
    }
}

/// Strings pass through unquoted so bare-text responses (the login session
/// token) arrive unchanged; everything else is compact JSON.
fn render_value(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        s.to_string()
    } else {
        serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{render_outcome, render_value};
    use petstore_http_tools::runtime::ToolError;
    use serde_json::{Value, json};

    fn result_text(result: &rmcp::model::CallToolResult) -> String {
        let value = serde_json::to_value(result).expect("CallToolResult serializes");
        value["content"][0]["text"]
            .as_str()
            .expect("text content")
            .to_string()
    }

    #[test]
    fn strings_pass_through_and_values_render_as_json() {
        assert_eq!(render_value(&json!("abc123")), "abc123");
        assert_eq!(render_value(&json!({"id": 1})), r#"{"id":1}"#);
        assert_eq!(render_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn values_become_text_content() {
        let result = render_outcome("get_pet_by_id", Ok(Some(json!({"id": 7})))).expect("result");
        assert_eq!(result_text(&result), r#"{"id":7}"#);
    }

    #[test]
    fn failures_are_indistinguishable_from_empty_responses() {
        let empty = render_outcome("logout_user", Ok(None)).expect("result");
        let failed = render_outcome(
            "get_inventory",
            Err(ToolError::Http("API returned 500 Internal Server Error: boom".to_string())),
        )
        .expect("result");

        let empty = serde_json::to_value(&empty).expect("serialize");
        let failed = serde_json::to_value(&failed).expect("serialize");
        assert_eq!(empty, failed);
        assert_eq!(empty["content"][0]["text"], json!("null"));
        assert_ne!(empty["isError"], Value::Bool(true));
    }

    #[test]
    fn unknown_tools_and_bad_arguments_are_protocol_errors() {
        let err = render_outcome("feed_pet", Err(ToolError::UnknownTool("feed_pet".to_string())))
            .unwrap_err();
        assert!(err.message.contains("unknown tool"));

        let err = render_outcome(
            "get_pet_by_id",
            Err(ToolError::Arguments("missing required parameter 'petId'".to_string())),
        )
        .unwrap_err();
        assert!(err.message.contains("missing required parameter"));
    }
}
