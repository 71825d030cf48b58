//! HTTP types shared by every stage of the pipeline.
//!
//! # Design
//! `HttpRequest` is what a transport receives once options are normalized,
//! the target is built and the body is encoded. `HttpResponse` is what the
//! caller gets back after aggregation and decoding. Headers are kept as
//! ordered `(name, value)` pairs; lookups are case-insensitive.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::body::BodySource;

/// Ordered header pairs.
pub type Headers = Vec<(String, String)>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// Where a server-style transport should connect.
///
/// Browser-style transports ignore this: their target already carries the
/// origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Origin {
    /// Absolute URL for `target` (a path plus optional query).
    pub fn url_for(&self, target: &str) -> String {
        let scheme = self.protocol.trim_end_matches(':');
        match self.port {
            Some(port) => format!("{scheme}://{}:{port}{target}", self.host),
            None => format!("{scheme}://{}{target}", self.host),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            protocol: "http:".to_string(),
            host: "localhost".to_string(),
            port: None,
        }
    }
}

/// A fully prepared request, handed to a transport.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path and query for relative transports, or a full URL for absolute ones.
    pub target: String,
    pub origin: Origin,
    pub headers: Headers,
    pub body: BodySource,
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared a JSON content type and parsed cleanly.
    Json(serde_json::Value),
    /// Anything else, exactly as received.
    Bytes(Bytes),
}

/// A fully aggregated response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl HttpResponse {
    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Bytes(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Bytes(bytes) => Some(bytes),
            ResponseBody::Json(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// First value of header `name` in `headers` (case-insensitive).
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Replace every `name` header (case-insensitive) with a single value.
pub fn set_header(headers: &mut Headers, name: &str, value: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

/// Convert an `http::HeaderMap` into ordered pairs, decoding values lossily.
pub(crate) fn header_pairs(map: &http::HeaderMap) -> Headers {
    map.iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_builds_absolute_urls() {
        let origin = Origin {
            protocol: "https:".into(),
            host: "example.com".into(),
            port: Some(8443),
        };
        assert_eq!(origin.url_for("/a?b=1"), "https://example.com:8443/a?b=1");

        let bare = Origin {
            protocol: "http".into(),
            ..Origin::default()
        };
        assert_eq!(bare.url_for("/"), "http://localhost/");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        assert_eq!(find_header(&headers, "content-type"), Some("application/json"));
        assert_eq!(find_header(&headers, "accept"), None);
    }

    #[test]
    fn set_header_replaces_existing_values() {
        let mut headers = vec![
            ("CONTENT-TYPE".to_string(), "text/plain".to_string()),
            ("accept".to_string(), "*/*".to_string()),
        ];
        set_header(&mut headers, "content-type", "application/json");
        assert_eq!(
            headers,
            vec![
                ("accept".to_string(), "*/*".to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ]
        );
    }

    #[test]
    fn method_serializes_uppercase() {
        let method: HttpMethod = serde_json::from_str(r#""PATCH""#).unwrap();
        assert_eq!(method, HttpMethod::Patch);
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), r#""GET""#);
        assert_eq!(http::Method::from(HttpMethod::Delete), http::Method::DELETE);
    }
}
