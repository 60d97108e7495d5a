//! HTTP request and response descriptions.
//!
//! # Design
//! `RequestSpec` is what an endpoint wants (method, path, query, body);
//! `RequestParams` is how a single call wants it sent (headers, whether the
//! security worker applies, cancellation, response format). The client core merges the two into an
//! `HttpRequest`, which is plain data, hands it to a `Transport`, and gets
//! an `HttpResponse` back. Keeping both ends as plain data keeps request
//! building deterministic and testable without a network.

use std::fmt;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

pub const CONTENT_TYPE: &str = "content-type";
pub const AUTHORIZATION: &str = "authorization";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a response body should be decoded by `ApiResponse::body`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Json,
    Text,
    Bytes,
}

/// Ordered query parameters. Absent and empty values never enter the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if !value.is_empty() {
            self.0.push((key.to_string(), value));
        }
        self
    }

    pub fn push_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Percent-encoded `k=v&k=v` string, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// One endpoint invocation before per-call parameters are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub query: QueryParams,
    pub body: Option<serde_json::Value>,
    pub format: ResponseFormat,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: None,
            format: ResponseFormat::Json,
        }
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Per-call overrides. Layers are merged with `merge`; the later layer wins.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    pub headers: Vec<(String, String)>,
    /// Whether the security worker contributes to the call. Unset means yes.
    pub secure: Option<bool>,
    pub cancel: Option<CancellationToken>,
    pub format: Option<ResponseFormat>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value with the same name
    /// (compared case-insensitively).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Overlay `other` on top of `self`.
    pub fn merge(mut self, other: RequestParams) -> RequestParams {
        for (name, value) in other.headers {
            set_header(&mut self.headers, &name, value);
        }
        RequestParams {
            headers: self.headers,
            secure: other.secure.or(self.secure),
            cancel: other.cancel.or(self.cancel),
            format: other.format.or(self.format),
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub(crate) fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value,
        None => headers.push((name.to_ascii_lowercase(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_skips_absent_and_empty_values() {
        let mut query = QueryParams::new();
        query
            .push_opt("state", Some("SP"))
            .push_opt("city", None)
            .push_opt("brand", Some(""));
        assert_eq!(query.to_query_string(), "state=SP");
    }

    #[test]
    fn query_percent_encodes_spaces_and_reserved_chars() {
        let mut query = QueryParams::new();
        query.push("city", "São José dos Campos").push("q", "a&b=c");
        assert_eq!(
            query.to_query_string(),
            "city=S%C3%A3o%20Jos%C3%A9%20dos%20Campos&q=a%26b%3Dc"
        );
    }

    #[test]
    fn merge_later_layer_wins() {
        let base = RequestParams::new()
            .with_header("X-Client", "base")
            .with_header("Accept", "application/json")
            .with_secure(false);
        let call = RequestParams::new().with_header("x-client", "call");

        let merged = base.merge(call);
        assert_eq!(merged.header("X-CLIENT"), Some("call"));
        assert_eq!(merged.header("accept"), Some("application/json"));
        assert_eq!(merged.headers.len(), 2);
        assert_eq!(merged.secure, Some(false));
    }

    #[test]
    fn merge_keeps_earlier_fields_the_later_layer_leaves_unset() {
        let token = CancellationToken::new();
        let base = RequestParams::new()
            .with_cancellation(token.clone())
            .with_format(ResponseFormat::Text);
        let merged = base.merge(RequestParams::new().with_format(ResponseFormat::Bytes));
        assert_eq!(merged.format, Some(ResponseFormat::Bytes));
        token.cancel();
        assert!(merged.cancel.unwrap().is_cancelled());
    }
}
