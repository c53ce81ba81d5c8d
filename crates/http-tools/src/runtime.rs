//! HTTP execution for the Petstore tool catalog.
//!
//! Every tool call funnels through [`PetstoreClient::execute`]: one outbound
//! request, one normalized outcome. `Ok(None)` means the remote answered
//! without content (204 or an empty body); failures stay failures here and
//! are only collapsed to a null result at the MCP boundary.

use mime::Mime;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Catalog construction problems (bad base URL, duplicate tool names).
    #[error("catalog error: {0}")]
    Catalog(String),
    /// The requested tool does not exist.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// The supplied arguments do not fit the tool's parameter specs.
    #[error("invalid arguments: {0}")]
    Arguments(String),
    /// The remote API answered with an error status.
    #[error("http error: {0}")]
    Http(String),
    /// The request never completed (connect failure, timeout, TLS, ...).
    #[error("http transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

impl From<reqwest::Error> for ToolError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(describe_reqwest_error(&value))
    }
}

/// Render a reqwest error without leaking credentials.
///
/// `login_user` carries the password in the query string, so any URL inside
/// the error is stripped of userinfo, query, and fragment before the message
/// can end up in a log line.
fn describe_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(url) = e.url() {
        let mut redacted = url.clone();
        let _ = redacted.set_username("");
        let _ = redacted.set_password(None);
        redacted.set_query(None);
        redacted.set_fragment(None);
        msg = msg.replace(url.as_str(), redacted.as_str());
    }
    msg
}

/// One outbound request, assembled by the catalog from a tool's argument
/// mapping.
#[derive(Debug, Default)]
pub(crate) struct RequestParts {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json_body: Option<Value>,
    /// Raw bytes uploaded as the multipart `file` part.
    pub file: Option<Vec<u8>>,
}

#[derive(Debug)]
pub(crate) struct PetstoreClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl PetstoreClient {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| ToolError::Catalog(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Perform one HTTP round trip and normalize the response.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Http`] for 4xx/5xx statuses and
    /// [`ToolError::Transport`] when the request never completes.
    pub(crate) async fn execute(
        &self,
        method: Method,
        parts: RequestParts,
    ) -> Result<Option<Value>> {
        let url = self.build_url(&parts)?;
        debug!(%method, path = %parts.path, "dispatching petstore request");

        let mut request = self.client.request(method, url).timeout(self.timeout);
        request = apply_headers(request, &parts);
        if let Some(body) = &parts.json_body {
            request = request.json(body);
        } else if let Some(bytes) = parts.file {
            let part = reqwest::multipart::Part::bytes(bytes).file_name("file");
            request = request.multipart(reqwest::multipart::Form::new().part("file", part));
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            let detail = String::from_utf8_lossy(&bytes);
            let reason = status.canonical_reason().unwrap_or("Unknown");
            return Err(ToolError::Http(format!(
                "API returned {} {reason}: {}",
                status.as_u16(),
                detail.trim()
            )));
        }

        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(normalize_body(&bytes, content_type.as_deref())))
    }

    fn build_url(&self, parts: &RequestParts) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, parts.path))
            .map_err(|e| ToolError::Arguments(format!("invalid request URL: {e}")))?;

        if !parts.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &parts.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

fn apply_headers(
    mut request: reqwest::RequestBuilder,
    parts: &RequestParts,
) -> reqwest::RequestBuilder {
    // Caller-supplied headers replace the defaults wholesale; only
    // `delete_pet` supplies any (its api_key).
    if parts.headers.is_empty() {
        for (key, value) in default_headers(parts.file.is_some()) {
            request = request.header(key, value);
        }
    } else {
        for (key, value) in &parts.headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Fresh default-header set, built per call.
///
/// Multipart uploads skip the JSON content type so reqwest can set the
/// form-data boundary header itself.
fn default_headers(multipart: bool) -> Vec<(&'static str, String)> {
    let mut headers = vec![(
        "User-Agent",
        format!("petstore-mcp/{}", env!("CARGO_PKG_VERSION")),
    )];
    if !multipart {
        headers.push(("Content-Type", "application/json".to_string()));
    }
    headers
}

/// Parse the response body: JSON bodies become structured values, anything
/// else is passed through as text so `login_user`'s bare session token
/// arrives unchanged.
fn normalize_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    let text = String::from_utf8_lossy(bytes).to_string();
    if is_json_content_type(content_type) {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    } else {
        Value::String(text)
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let Ok(m) = ct.parse::<Mime>() else {
        return false;
    };
    (m.type_() == mime::APPLICATION && m.subtype() == mime::JSON) || m.suffix() == Some(mime::JSON)
}

#[cfg(test)]
mod tests {
    use super::{
        PetstoreClient, RequestParts, ToolError, default_headers, is_json_content_type,
        normalize_body,
    };
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;
    use reqwest::Method;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn json_bodies_parse_and_text_passes_through() {
        let parsed = normalize_body(br#"{"id": 7}"#, Some("application/json"));
        assert_eq!(parsed, json!({"id": 7}));

        let token = normalize_body(b"abc123", Some("text/plain"));
        assert_eq!(token, Value::String("abc123".to_string()));

        // A JSON content type with a non-JSON body degrades to text.
        let broken = normalize_body(b"not json", Some("application/json"));
        assert_eq!(broken, Value::String("not json".to_string()));
    }

    #[test]
    fn json_content_type_detection() {
        assert!(is_json_content_type(Some("application/json")));
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some("application/problem+json")));
        assert!(!is_json_content_type(Some("text/plain")));
        assert!(!is_json_content_type(None));
    }

    #[test]
    fn default_headers_identify_the_client() {
        let headers = default_headers(false);
        assert!(headers.iter().any(|(k, v)| *k == "User-Agent" && v.starts_with("petstore-mcp/")));
        assert!(
            headers
                .iter()
                .any(|(k, v)| *k == "Content-Type" && v.as_str() == "application/json")
        );

        // Multipart requests leave the content type to reqwest.
        let headers = default_headers(true);
        assert!(!headers.iter().any(|(k, _)| *k == "Content-Type"));
    }

    #[test]
    fn build_url_joins_base_path_and_query() {
        let client = PetstoreClient::new("http://127.0.0.1:1/api/v3/", Duration::from_secs(1))
            .expect("valid base URL");
        let parts = RequestParts {
            path: "/pet/findByStatus".to_string(),
            query: vec![("status".to_string(), "available,sold".to_string())],
            ..RequestParts::default()
        };

        let url = client.build_url(&parts).expect("build url");
        assert_eq!(url.path(), "/api/v3/pet/findByStatus");

        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            decoded,
            vec![("status".to_string(), "available,sold".to_string())]
        );
    }

    #[test]
    fn invalid_base_url_is_a_catalog_error() {
        let err = PetstoreClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ToolError::Catalog(_)));
    }

    #[tokio::test]
    async fn responses_without_content_normalize_to_none() {
        async fn empty_ok() -> StatusCode {
            StatusCode::OK
        }
        async fn no_content() -> StatusCode {
            StatusCode::NO_CONTENT
        }

        let app = Router::new()
            .route("/empty", get(empty_ok))
            .route("/gone", get(no_content));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");

        let server = axum::serve(listener, app);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = server.with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let server_handle = tokio::spawn(async move { server.await });

        let client = PetstoreClient::new(&format!("http://{addr}"), Duration::from_secs(5))
            .expect("valid base URL");

        let empty = client
            .execute(
                Method::GET,
                RequestParts {
                    path: "/empty".to_string(),
                    ..RequestParts::default()
                },
            )
            .await
            .expect("empty 200");
        assert_eq!(empty, None);

        let gone = client
            .execute(
                Method::GET,
                RequestParts {
                    path: "/gone".to_string(),
                    ..RequestParts::default()
                },
            )
            .await
            .expect("204");
        assert_eq!(gone, None);

        let _ = shutdown_tx.send(());
        server_handle
            .await
            .expect("server task join")
            .expect("server result");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = PetstoreClient::new("http://127.0.0.1:1", Duration::from_secs(1))
            .expect("valid base URL");
        let err = client
            .execute(
                Method::GET,
                RequestParts {
                    path: "/pet/1".to_string(),
                    ..RequestParts::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
    }
}
