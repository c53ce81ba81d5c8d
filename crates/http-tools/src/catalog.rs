//! The Petstore tool catalog.
//!
//! One [`ToolSpec`] per remote endpoint, declared statically and built once
//! at startup. Each spec owns the argument-to-request mapping for its
//! endpoint; execution is a single call into the shared runtime client.

use crate::runtime::{PetstoreClient, RequestParts, Result, ToolError};
use base64::Engine as _;
use reqwest::Method;
use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Where a tool argument lands in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    /// Interpolated into the URL path.
    Path,
    /// Scalar query parameter.
    Query,
    /// Array joined with commas into a single query parameter.
    QueryList,
    /// Sent as an HTTP header.
    Header,
    /// The whole JSON request body.
    Body,
    /// Base64-encoded bytes uploaded as a multipart `file` part.
    File,
}

#[derive(Debug, Clone)]
struct ParamSpec {
    name: String,
    kind: ParamKind,
    required: bool,
    schema: Value,
}

#[derive(Debug, Clone)]
struct ToolSpec {
    name: String,
    description: String,
    method: Method,
    path: String,
    params: Vec<ParamSpec>,
    /// Tools whose meaningful result is success/failure only discard the
    /// response body.
    returns_value: bool,
}

impl ToolSpec {
    fn new(name: &str, method: Method, path: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            method,
            path: path.to_string(),
            params: Vec::new(),
            returns_value: true,
        }
    }

    fn param(mut self, name: &str, kind: ParamKind, required: bool, schema: Value) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required,
            schema,
        });
        self
    }

    fn path_param(self, name: &str, schema: Value) -> Self {
        self.param(name, ParamKind::Path, true, schema)
    }

    fn query_param(self, name: &str, required: bool, schema: Value) -> Self {
        self.param(name, ParamKind::Query, required, schema)
    }

    fn query_list(self, name: &str, item_schema: Value) -> Self {
        self.param(
            name,
            ParamKind::QueryList,
            true,
            json!({"type": "array", "items": item_schema}),
        )
    }

    fn header_param(self, name: &str, schema: Value) -> Self {
        self.param(name, ParamKind::Header, false, schema)
    }

    fn body_param(self, schema: Value) -> Self {
        self.param("body", ParamKind::Body, true, schema)
    }

    fn file_param(self, name: &str) -> Self {
        self.param(
            name,
            ParamKind::File,
            false,
            json!({"type": "string", "contentEncoding": "base64"}),
        )
    }

    fn discard_response(mut self) -> Self {
        self.returns_value = false;
        self
    }

    fn input_schema(&self) -> JsonObject {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<Value> = Vec::new();
        for param in &self.params {
            properties.insert(param.name.clone(), param.schema.clone());
            if param.required {
                required.push(json!(param.name));
            }
        }

        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema
    }
}

/// The full Petstore surface, one spec per endpoint.
fn petstore_tools() -> Vec<ToolSpec> {
    let id = || json!({"type": "integer", "format": "int64"});
    let string = || json!({"type": "string"});
    let object = || json!({"type": "object"});
    let object_list = || json!({"type": "array", "items": {"type": "object"}});

    vec![
        ToolSpec::new("add_pet", Method::POST, "/pet", "Adds a new pet to the store.")
            .body_param(object()),
        ToolSpec::new("update_pet", Method::PUT, "/pet", "Updates an existing pet in the store.")
            .body_param(object()),
        ToolSpec::new(
            "find_pets_by_status",
            Method::GET,
            "/pet/findByStatus",
            "Finds pets by status.",
        )
        .query_list("status", string()),
        ToolSpec::new(
            "find_pets_by_tags",
            Method::GET,
            "/pet/findByTags",
            "Finds pets by tags.",
        )
        .query_list("tags", string()),
        ToolSpec::new("get_pet_by_id", Method::GET, "/pet/{petId}", "Finds a pet by ID.")
            .path_param("petId", id()),
        ToolSpec::new(
            "update_pet_with_form",
            Method::POST,
            "/pet/{petId}",
            "Updates a pet in the store with form data.",
        )
        .path_param("petId", id())
        .query_param("name", false, string())
        .query_param("status", false, string())
        .discard_response(),
        ToolSpec::new("delete_pet", Method::DELETE, "/pet/{petId}", "Deletes a pet.")
            .path_param("petId", id())
            .header_param("api_key", string())
            .discard_response(),
        ToolSpec::new(
            "upload_file",
            Method::POST,
            "/pet/{petId}/uploadImage",
            "Uploads a pet image.",
        )
        .path_param("petId", id())
        .query_param("additionalMetadata", false, string())
        .file_param("file"),
        ToolSpec::new(
            "get_inventory",
            Method::GET,
            "/store/inventory",
            "Returns pet inventories by status.",
        ),
        ToolSpec::new("place_order", Method::POST, "/store/order", "Places an order for a pet.")
            .body_param(object()),
        ToolSpec::new(
            "get_order_by_id",
            Method::GET,
            "/store/order/{orderId}",
            "Finds a purchase order by ID.",
        )
        .path_param("orderId", id()),
        ToolSpec::new(
            "delete_order",
            Method::DELETE,
            "/store/order/{orderId}",
            "Deletes a purchase order by ID.",
        )
        .path_param("orderId", id())
        .discard_response(),
        ToolSpec::new("create_user", Method::POST, "/user", "Creates a user.")
            .body_param(object())
            .discard_response(),
        ToolSpec::new(
            "create_users_with_array_input",
            Method::POST,
            "/user/createWithArray",
            "Creates a list of users from an input array.",
        )
        .body_param(object_list())
        .discard_response(),
        ToolSpec::new(
            "create_users_with_list_input",
            Method::POST,
            "/user/createWithList",
            "Creates a list of users from an input list.",
        )
        .body_param(object_list())
        .discard_response(),
        ToolSpec::new("login_user", Method::GET, "/user/login", "Logs a user into the system.")
            .query_param("username", true, string())
            .query_param("password", true, string()),
        ToolSpec::new(
            "logout_user",
            Method::GET,
            "/user/logout",
            "Logs out the currently logged in user session.",
        )
        .discard_response(),
        ToolSpec::new(
            "get_user_by_name",
            Method::GET,
            "/user/{username}",
            "Gets a user by user name.",
        )
        .path_param("username", string()),
        ToolSpec::new("update_user", Method::PUT, "/user/{username}", "Updates a user.")
            .path_param("username", string())
            .body_param(object())
            .discard_response(),
        ToolSpec::new("delete_user", Method::DELETE, "/user/{username}", "Deletes a user.")
            .path_param("username", string())
            .discard_response(),
    ]
}

/// Immutable catalog of Petstore tools plus the shared HTTP client.
///
/// Built once at startup and handed to the transport layer; cloning is cheap
/// and every clone serves calls independently.
#[derive(Clone)]
pub struct ToolCatalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    tools: Vec<ToolSpec>,
    client: PetstoreClient,
}

impl ToolCatalog {
    /// Build the catalog against a base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the tool table
    /// contains duplicate names.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let tools = petstore_tools();
        let mut names: HashSet<&str> = HashSet::new();
        for tool in &tools {
            if !names.insert(tool.name.as_str()) {
                return Err(ToolError::Catalog(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
        }

        let client = PetstoreClient::new(base_url, timeout)?;
        Ok(Self {
            inner: Arc::new(CatalogInner { tools, client }),
        })
    }

    /// Render the MCP `Tool` listing.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.inner
            .tools
            .iter()
            .map(|spec| {
                let mut tool = Tool::new(
                    spec.name.clone(),
                    spec.description.clone(),
                    Arc::new(spec.input_schema()),
                );
                tool.annotations = Some(annotations_for_method(&spec.method));
                tool
            })
            .collect()
    }

    /// Invoke a tool by name: map the arguments onto one HTTP request and
    /// return the normalized response.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tool names, arguments that do not fit
    /// the parameter specs, HTTP error statuses, and transport failures.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Option<Value>> {
        let spec = self
            .inner
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let parts = build_request_parts(spec, arguments)?;
        let response = self.inner.client.execute(spec.method.clone(), parts).await?;
        if spec.returns_value {
            Ok(response)
        } else {
            Ok(None)
        }
    }
}

fn build_request_parts(spec: &ToolSpec, arguments: &Value) -> Result<RequestParts> {
    let mut parts = RequestParts {
        path: spec.path.clone(),
        ..RequestParts::default()
    };

    for param in &spec.params {
        let value = match arguments.get(&param.name) {
            Some(Value::Null) | None => {
                if param.required {
                    return Err(ToolError::Arguments(format!(
                        "missing required parameter '{}' for tool '{}'",
                        param.name, spec.name
                    )));
                }
                continue;
            }
            Some(v) => v,
        };

        match param.kind {
            ParamKind::Path => {
                let placeholder = format!("{{{}}}", param.name);
                parts.path = parts.path.replace(&placeholder, &scalar_to_string(value));
            }
            ParamKind::Query => {
                parts.query.push((param.name.clone(), scalar_to_string(value)));
            }
            ParamKind::QueryList => {
                let items = value.as_array().ok_or_else(|| {
                    ToolError::Arguments(format!(
                        "parameter '{}' for tool '{}' must be an array",
                        param.name, spec.name
                    ))
                })?;
                let joined = items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                parts.query.push((param.name.clone(), joined));
            }
            ParamKind::Header => {
                parts
                    .headers
                    .push((param.name.clone(), scalar_to_string(value)));
            }
            ParamKind::Body => {
                parts.json_body = Some(value.clone());
            }
            ParamKind::File => {
                let encoded = value.as_str().ok_or_else(|| {
                    ToolError::Arguments(format!(
                        "parameter '{}' for tool '{}' must be a base64 string",
                        param.name, spec.name
                    ))
                })?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| {
                        ToolError::Arguments(format!(
                            "parameter '{}' for tool '{}' is not valid base64: {e}",
                            param.name, spec.name
                        ))
                    })?;
                parts.file = Some(bytes);
            }
        }
    }

    Ok(parts)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Tool annotations derived from HTTP method semantics.
///
/// Every tool talks to an external system, so `open_world_hint` is always
/// set.
fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = if method == Method::GET {
        (true, false, true)
    } else if method == Method::PUT || method == Method::DELETE {
        (false, true, true)
    } else {
        (false, false, false)
    };

    ToolAnnotations {
        title: None,
        read_only_hint: Some(read_only),
        destructive_hint: Some(destructive),
        idempotent_hint: Some(idempotent),
        open_world_hint: Some(true),
    }
}
