//! Pluggable request authentication.
//!
//! The client core never reads credentials from ambient state. Whoever
//! builds the client injects a `SecurityWorker`; it runs before every call
//! not marked `secure: false` and contributes extra `RequestParams` derived
//! from the security context.

use std::fmt;
use std::sync::Arc;

use crate::http::{RequestParams, AUTHORIZATION};

/// Derives per-request auth parameters from an optional security context.
pub trait SecurityWorker<S>: Send + Sync {
    fn params(&self, security_data: Option<&S>) -> Option<RequestParams>;
}

impl<S, F> SecurityWorker<S> for F
where
    F: Fn(Option<&S>) -> Option<RequestParams> + Send + Sync,
{
    fn params(&self, security_data: Option<&S>) -> Option<RequestParams> {
        self(security_data)
    }
}

/// Attaches `Authorization: Bearer <token>` when the provider yields a token
/// and leaves the header off entirely when it yields `None`.
#[derive(Clone)]
pub struct BearerAuth {
    provider: Arc<dyn Fn() -> Option<String> + Send + Sync>,
}

impl BearerAuth {
    pub fn new(provider: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// A provider that always yields `token`.
    pub fn fixed(token: impl Into<String>) -> Self {
        let token = token.into();
        Self::new(move || Some(token.clone()))
    }
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl<S> SecurityWorker<S> for BearerAuth {
    fn params(&self, _security_data: Option<&S>) -> Option<RequestParams> {
        let token = (self.provider)()?;
        if token.is_empty() {
            return None;
        }
        Some(RequestParams::new().with_header(AUTHORIZATION, format!("Bearer {token}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_attaches_header_when_token_present() {
        let auth = BearerAuth::fixed("abc123");
        let params = SecurityWorker::<()>::params(&auth, None).unwrap();
        assert_eq!(params.header("Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn bearer_yields_nothing_without_token() {
        let auth = BearerAuth::new(|| None);
        assert!(SecurityWorker::<()>::params(&auth, None).is_none());
    }

    #[test]
    fn closures_read_the_security_context() {
        let worker = |data: Option<&String>| {
            data.map(|key| RequestParams::new().with_header("x-api-key", key.clone()))
        };
        let key = "k-42".to_string();
        let params = worker.params(Some(&key)).unwrap();
        assert_eq!(params.header("X-Api-Key"), Some("k-42"));
        assert!(worker.params(None).is_none());
    }
}
