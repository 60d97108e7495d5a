//! Typed async client for the SolarSync marketplace API.
//!
//! # Overview
//! - `types`: wire shapes of the backend's declared schema.
//! - `client`: `HttpClient`, the configurable request executor (base URL,
//!   layered request params, security worker, cancellation).
//! - `routes` / `api`: one request builder and one typed facade method per
//!   endpoint, covering the catalogue, reviews, leads and the admin panel.
//! - `fetch`: the loading / failed / ready state a page keeps while it
//!   loads data, with per-page cancellation.
//!
//! # Design
//! - Request building is pure: `routes` produce `RequestSpec` values and
//!   `HttpClient::build_request` turns them into plain `HttpRequest` data.
//!   Only the `Transport` touches the network, so everything above it is
//!   testable without one.
//! - HTTP-level failures are values (`ApiResponse::ok() == false`), not
//!   errors. `ApiError` is reserved for calls that produced no response.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod response;
pub mod routes;
pub mod security;
pub mod transport;
pub mod types;

pub use api::{ApiResult, SolarSyncApi};
pub use client::HttpClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use fetch::{FetchFailure, FetchState, Page, PageScope};
pub use http::{
    HttpMethod, HttpRequest, HttpResponse, QueryParams, RequestParams, RequestSpec,
    ResponseFormat,
};
pub use response::{ApiResponse, ResponseBody};
pub use security::{BearerAuth, SecurityWorker};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AdminCompaniesParams, AnalyticsData, BillingCycle, Company, CompanyProfile, CompanySubscription,
    CompanyWithSubscription, CreateLeadRequest, CreatePlanRequest, DailyViews, HealthResponse,
    HttpValidationError, Lead, LeadStatus, ListProductsParams, LocSegment, MessageResponse, Plan, Product,
    RegistrationRequest, Review, ReviewRequest, SearchCompaniesParams, SentLead, SubscriptionStatus, Timestamp,
    UpdateLeadStatus, UpdateSubscriptionRequest, UserResponse, ValidationError,
};

/// Re-exported so callers can build cancellation tokens without a direct
/// `tokio-util` dependency.
pub use tokio_util::sync::CancellationToken;
