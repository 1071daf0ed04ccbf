//! HTTP request/response model carried over the bus.
//!
//! The host's front-end publishes each inbound request as an event on the
//! `http-request` channel; a handler that claims the request attaches an
//! [`HttpResponse`] via `Event::respond`. Both types serialize to JSON so
//! they can travel as ordinary bus payloads.

pub mod bridge;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verbs the console dispatches on.
///
/// Anything else is carried through as [`Other`](HttpMethod::Other) so a
/// matched route can log and ignore it instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Any verb outside the set above (OPTIONS, HEAD, ...).
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
            Self::Put => f.write_str("PUT"),
            Self::Patch => f.write_str("PATCH"),
            Self::Delete => f.write_str("DELETE"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Content types the console serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Html,
    Css,
    JavaScript,
    Text,
}

impl ContentType {
    /// The `Content-Type` header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html; charset=utf-8",
            Self::Css => "text/css",
            Self::JavaScript => "application/javascript",
            Self::Text => "text/plain; charset=utf-8",
        }
    }

    /// Derives a content type from a file name's extension.
    ///
    /// `.html` → HTML, `.css` → CSS, `.js` → JavaScript, everything else
    /// plain text.
    #[must_use]
    pub fn from_file_ext(name: &str) -> Self {
        match name.rsplit('.').next() {
            Some("html") => Self::Html,
            Some("css") => Self::Css,
            Some("js") => Self::JavaScript,
            _ => Self::Text,
        }
    }
}

/// An inbound HTTP request as seen on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request verb.
    pub method: HttpMethod,
    /// Request path without query string.
    pub path: String,
    /// Raw request body, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl HttpRequest {
    /// Creates a body-less request.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attaches a request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Parses the body as JSON, yielding `Null` when absent or malformed.
    #[must_use]
    pub fn body_as_json(&self) -> Value {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(Value::Null)
    }
}

/// An HTTP response travelling back through the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Additional response headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

/// Builds the console's single success response shape: status 200, the
/// given content type, permissive cross-origin headers, and the body.
#[must_use]
pub fn response_ok(body: impl Into<String>, content_type: ContentType) -> HttpResponse {
    HttpResponse {
        status: 200,
        content_type: content_type.as_str().to_string(),
        headers: vec![
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
            (
                "Access-Control-Allow-Methods".to_string(),
                "GET, PATCH, DELETE, OPTIONS".to_string(),
            ),
            ("Access-Control-Allow-Headers".to_string(), "*".to_string()),
        ],
        body: body.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_round_trips_through_json() {
        let req = HttpRequest::new(HttpMethod::Patch, "/dev-console/config");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["method"], "PATCH");
        let back: HttpRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back.method, HttpMethod::Patch);
    }

    #[test]
    fn unusual_verb_is_preserved() {
        let method = HttpMethod::from("OPTIONS");
        assert_eq!(method, HttpMethod::Other("OPTIONS".to_string()));
        assert_eq!(method.to_string(), "OPTIONS");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(ContentType::from_file_ext("index.html"), ContentType::Html);
        assert_eq!(ContentType::from_file_ext("style.css"), ContentType::Css);
        assert_eq!(
            ContentType::from_file_ext("script.js"),
            ContentType::JavaScript
        );
        assert_eq!(ContentType::from_file_ext("notes.txt"), ContentType::Text);
        assert_eq!(ContentType::from_file_ext("LICENSE"), ContentType::Text);
    }

    #[test]
    fn body_as_json_handles_missing_and_malformed() {
        let none = HttpRequest::new(HttpMethod::Get, "/x");
        assert_eq!(none.body_as_json(), Value::Null);

        let bad = HttpRequest::new(HttpMethod::Patch, "/x").with_body("{not json");
        assert_eq!(bad.body_as_json(), Value::Null);

        let good = HttpRequest::new(HttpMethod::Patch, "/x").with_body(r#"{"maxLogs": 5}"#);
        assert_eq!(good.body_as_json(), json!({"maxLogs": 5}));
    }

    #[test]
    fn response_ok_sets_cors_headers() {
        let resp = response_ok("{}", ContentType::Json);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "application/json");
        assert!(
            resp.headers
                .iter()
                .any(|(k, v)| k == "Access-Control-Allow-Origin" && v == "*")
        );
    }
}
