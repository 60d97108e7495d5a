//! Client configuration.

use std::time::Duration;

use crate::error::ApiError;
use crate::http::RequestParams;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_AGENT: &str = concat!("solarsync-core/", env!("CARGO_PKG_VERSION"));

/// Static configuration for an `HttpClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.solarsync.com.br`. A trailing `/`
    /// is ignored.
    pub base_url: String,
    /// Overall per-request deadline. `None` means no deadline.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Parameters applied to every call, below the security worker's and
    /// the call's own.
    pub base_params: RequestParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_params: RequestParams::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_base_params(mut self, params: RequestParams) -> Self {
        self.base_params = params;
        self
    }

    /// Read configuration from the environment.
    ///
    /// - `SOLARSYNC_API_URL`: backend origin (default `http://localhost:8000`)
    /// - `SOLARSYNC_TIMEOUT_SECS`: optional whole-second request deadline
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup("SOLARSYNC_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup("SOLARSYNC_TIMEOUT_SECS").filter(|v| !v.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::InvalidRequest(format!("SOLARSYNC_TIMEOUT_SECS is not a number: {raw:?}"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
