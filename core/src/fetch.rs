//! Load-then-render state for a page of data.
//!
//! # Design
//! A page owns a `PageScope`. Every call the page makes carries a child of
//! the scope's cancellation token, so closing or dropping the page aborts
//! all of its in-flight requests. `Page::load` also cancels the page's
//! previous load before starting a new one; only the latest load may settle
//! the page state. Results are reduced to a `FetchState`: `Loading` until
//! the first settle, then `Ready` or `Failed`.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;
use crate::http::RequestParams;
use crate::response::ApiResponse;
use crate::types::HttpValidationError;

/// Tri-state of one page's data.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    Failed(FetchFailure),
    Ready(T),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match self {
            FetchState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Why a load did not produce data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("cancelled")]
    Cancelled,
    #[error("validation failed: {} error(s)", .0.errors().len())]
    Validation(HttpValidationError),
    #[error("HTTP {status}")]
    Http { status: u16, detail: Option<String> },
    #[error("unexpected response: {0}")]
    Schema(String),
    #[error("request could not be built: {0}")]
    Client(String),
}

impl FetchFailure {
    /// Text suitable for showing to an end user. A plain `detail` string
    /// sent by the backend is preferred over the generic text.
    pub fn message(&self) -> String {
        match self {
            FetchFailure::Network(_) => "Could not reach the server. Try again.".to_string(),
            FetchFailure::Cancelled => "The request was cancelled.".to_string(),
            FetchFailure::Validation(_) => "Some of the information sent is invalid.".to_string(),
            FetchFailure::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            FetchFailure::Http { status: 404, .. } => "Not found.".to_string(),
            FetchFailure::Http { .. } | FetchFailure::Schema(_) | FetchFailure::Client(_) => {
                "Something went wrong. Try again.".to_string()
            }
        }
    }

    /// Field-level detail of a 422 response.
    pub fn validation_detail(&self) -> Option<&HttpValidationError> {
        match self {
            FetchFailure::Validation(detail) => Some(detail),
            _ => None,
        }
    }

    /// Reduce one endpoint result to the page's data or a failure.
    pub fn settle<T: DeserializeOwned, E>(result: Result<ApiResponse<T, E>, ApiError>) -> Result<T, FetchFailure> {
        let response = result.map_err(FetchFailure::from)?;
        if response.ok() {
            return response.data().map_err(FetchFailure::from);
        }

        let status = response.status();
        let detail = plain_detail(response.bytes());
        if status == 422 {
            let response = response.cast::<(), HttpValidationError>();
            if let Ok(Some(envelope)) = response.error() {
                return Err(FetchFailure::Validation(envelope));
            }
        }
        Err(FetchFailure::Http { status, detail })
    }
}

impl From<ApiError> for FetchFailure {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Cancelled => FetchFailure::Cancelled,
            ApiError::Network(msg) | ApiError::Timeout(msg) => FetchFailure::Network(msg),
            ApiError::SchemaMismatch { expected, message } => {
                FetchFailure::Schema(format!("expected {expected}: {message}"))
            }
            ApiError::Http { status, body } => FetchFailure::Http {
                status,
                detail: plain_detail(body.as_bytes()),
            },
            ApiError::InvalidRequest(msg) | ApiError::Serialization(msg) => FetchFailure::Client(msg),
        }
    }
}

/// The `detail` field of a `{"detail": "..."}` error body.
fn plain_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

/// Cancellation scope tied to the lifetime of a page.
#[derive(Debug, Default)]
pub struct PageScope {
    token: CancellationToken,
}

impl PageScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Params for one call made on behalf of this page.
    pub fn params(&self) -> RequestParams {
        RequestParams::new().with_cancellation(self.token.child_token())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct Slot<T> {
    state: FetchState<T>,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

/// A page's data plus the scope its loads run in.
pub struct Page<T> {
    scope: PageScope,
    slot: Mutex<Slot<T>>,
}

impl<T> std::fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Page<T> {
    pub fn new() -> Self {
        Self {
            scope: PageScope::new(),
            slot: Mutex::new(Slot {
                state: FetchState::Loading,
                generation: 0,
                in_flight: None,
            }),
        }
    }

    pub fn scope(&self) -> &PageScope {
        &self.scope
    }

    /// Cancel every in-flight load. The current state is kept.
    pub fn close(&self) {
        self.scope.close();
    }

    fn slot(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Page<T> {
    pub fn state(&self) -> FetchState<T> {
        self.slot().state.clone()
    }

    /// Run `call` as the page's current load and return its outcome.
    ///
    /// Any earlier load still in flight is cancelled first. The page state
    /// becomes `Loading` and is settled by this load only if no newer load
    /// has started and the page is still open; a superseded load returns
    /// `Failed(Cancelled)` and leaves the state alone.
    pub async fn load<F, Fut>(&self, call: F) -> FetchState<T>
    where
        F: FnOnce(RequestParams) -> Fut,
        Fut: Future<Output = Result<T, FetchFailure>>,
    {
        let token = self.scope.token.child_token();
        let generation = {
            let mut slot = self.slot();
            if let Some(previous) = slot.in_flight.replace(token.clone()) {
                previous.cancel();
            }
            slot.generation += 1;
            slot.state = FetchState::Loading;
            slot.generation
        };

        let params = RequestParams::new().with_cancellation(token.clone());
        let outcome = match call(params).await {
            Ok(data) => FetchState::Ready(data),
            Err(failure) => FetchState::Failed(failure),
        };

        let mut slot = self.slot();
        if slot.generation != generation || token.is_cancelled() {
            debug!(generation, "discarding superseded page load");
            return FetchState::Failed(FetchFailure::Cancelled);
        }
        slot.in_flight = None;
        slot.state = outcome.clone();
        outcome
    }
}
