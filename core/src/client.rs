//! The configurable request executor behind every endpoint call.
//!
//! # Design
//! `HttpClient` holds its configuration, an optional security worker and the
//! transport, and carries no mutable state between calls. A call goes
//! through three steps:
//!
//! 1. `resolve_params` layers base params, security worker output and the
//!    call's own params (later wins).
//! 2. `build_request` turns a `RequestSpec` into a plain `HttpRequest`
//!    (URL, headers, encoded body). This step is pure.
//! 3. `request` sends it through the `Transport`, racing the call's
//!    cancellation token, and wraps the reply in an `ApiResponse`.
//!
//! Non-2xx responses are returned, not raised. There are no retries and no
//! caching.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{
    find_header, set_header, HttpRequest, RequestParams, RequestSpec, CONTENT_TYPE,
};
use crate::response::ApiResponse;
use crate::security::SecurityWorker;
use crate::transport::{ReqwestTransport, Transport};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Request executor generic over the security context type `S`.
pub struct HttpClient<S = ()> {
    base_url: String,
    base_params: RequestParams,
    security_worker: Option<Arc<dyn SecurityWorker<S>>>,
    security_data: Option<S>,
    transport: Arc<dyn Transport>,
}

impl<S> std::fmt::Debug for HttpClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("has_security_worker", &self.security_worker.is_some())
            .field("has_security_data", &self.security_data.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> HttpClient<S> {
    /// Build a client that talks to the network through reqwest.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeout, &config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            base_params: config.base_params,
            security_worker: None,
            security_data: None,
            transport,
        }
    }

    pub fn with_security_worker(mut self, worker: impl SecurityWorker<S> + 'static) -> Self {
        self.security_worker = Some(Arc::new(worker));
        self
    }

    pub fn with_security_data(mut self, data: S) -> Self {
        self.security_data = Some(data);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Layer `base params < security worker params < call params`. The
    /// security worker runs for every call whose effective `secure` flag is
    /// not `false`.
    pub fn resolve_params(&self, params: RequestParams) -> RequestParams {
        let secure = params.secure.or(self.base_params.secure).unwrap_or(true);

        let mut merged = self.base_params.clone();
        if secure {
            let worker_params = self
                .security_worker
                .as_ref()
                .and_then(|worker| worker.params(self.security_data.as_ref()));
            if let Some(worker_params) = worker_params {
                merged = merged.merge(worker_params);
            }
        }
        merged.merge(params)
    }

    /// Assemble the wire request for `spec` under already-resolved `params`.
    pub fn build_request(
        &self,
        spec: &RequestSpec,
        params: &RequestParams,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = params.headers.clone();
        let body = match &spec.body {
            Some(value) => Some(encode_body(value, &mut headers)?),
            None => None,
        };

        let mut url = self.base_url.clone();
        if !spec.path.starts_with('/') {
            url.push('/');
        }
        url.push_str(&spec.path);
        if !spec.query.is_empty() {
            url.push('?');
            url.push_str(&spec.query.to_query_string());
        }

        Ok(HttpRequest {
            method: spec.method,
            url,
            headers,
            body,
        })
    }

    /// Execute `spec`. Returns `Err` only when no response was obtained.
    pub async fn request<T, E>(
        &self,
        spec: RequestSpec,
        params: RequestParams,
    ) -> Result<ApiResponse<T, E>, ApiError> {
        let params = self.resolve_params(params);
        let format = params.format.unwrap_or(spec.format);
        let request = self.build_request(&spec, &params)?;
        let method = request.method;
        let url = request.url.clone();

        debug!(%method, %url, "sending request");
        let result = match params.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(ApiError::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ApiError::Cancelled),
                    result = self.transport.execute(request) => result,
                }
            }
            None => self.transport.execute(request).await,
        };

        match result {
            Ok(response) => {
                debug!(%method, %url, status = response.status, "received response");
                Ok(ApiResponse::new(response, format))
            }
            Err(ApiError::Cancelled) => {
                debug!(%method, %url, "request cancelled");
                Err(ApiError::Cancelled)
            }
            Err(err) => {
                warn!(%method, %url, error = %err, "request failed");
                Err(err)
            }
        }
    }
}

/// Serialize a body according to the content type already in `headers`,
/// defaulting to JSON and recording that choice.
fn encode_body(
    value: &serde_json::Value,
    headers: &mut Vec<(String, String)>,
) -> Result<String, ApiError> {
    let content_type = find_header(headers, CONTENT_TYPE).map(str::to_ascii_lowercase);
    match content_type.as_deref() {
        None => {
            set_header(headers, CONTENT_TYPE, JSON.to_string());
            Ok(serde_json::to_string(value)?)
        }
        Some(ct) if ct.starts_with(JSON) => Ok(serde_json::to_string(value)?),
        Some(ct) if ct.starts_with(FORM) => encode_form(value),
        Some(_) => match value {
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Ok(serde_json::to_string(other)?),
        },
    }
}

fn encode_form(value: &serde_json::Value) -> Result<String, ApiError> {
    let object = value.as_object().ok_or_else(|| {
        ApiError::Serialization("form-encoded bodies must be JSON objects".to_string())
    })?;
    let pairs = object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", urlencoding::encode(k), urlencoding::encode(&v))
        })
        .collect::<Vec<_>>();
    Ok(pairs.join("&"))
}
