//! Typed facade over the SolarSync backend.
//!
//! One async method per endpoint. Every method takes `RequestParams` so a
//! caller can attach a cancellation token or override headers per call, and
//! returns the raw `ApiResponse` so non-2xx outcomes stay inspectable.

use serde_json::Value;

use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::RequestParams;
use crate::response::ApiResponse;
use crate::routes;
use crate::types::{
    AdminCompaniesParams, AnalyticsData, Company, CompanyProfile, CompanySubscription, CompanyWithSubscription,
    CreateLeadRequest, CreatePlanRequest, HealthResponse, HttpValidationError, Lead, ListProductsParams,
    MessageResponse, Plan, Product, RegistrationRequest, Review, ReviewRequest, SearchCompaniesParams, SentLead,
    UpdateLeadStatus, UpdateSubscriptionRequest, UserResponse,
};

pub type ApiResult<T, E = HttpValidationError> = Result<ApiResponse<T, E>, ApiError>;

#[derive(Debug)]
pub struct SolarSyncApi<S = ()> {
    client: HttpClient<S>,
}

impl SolarSyncApi<()> {
    /// Facade over a reqwest-backed client built from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        Ok(Self::new(HttpClient::new(config)?))
    }
}

impl<S> SolarSyncApi<S> {
    pub fn new(client: HttpClient<S>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient<S> {
        &self.client
    }

    pub async fn check_health(&self, params: RequestParams) -> ApiResult<HealthResponse, Value> {
        self.client.request(routes::check_health(), params).await
    }

    pub async fn register_user(
        &self,
        input: &RegistrationRequest,
        params: RequestParams,
    ) -> ApiResult<UserResponse> {
        self.client.request(routes::register_user(input)?, params).await
    }

    pub async fn list_products(
        &self,
        filters: &ListProductsParams,
        params: RequestParams,
    ) -> ApiResult<Vec<Product>> {
        self.client.request(routes::list_products(filters), params).await
    }

    pub async fn get_product(&self, product_id: u64, params: RequestParams) -> ApiResult<Product> {
        self.client.request(routes::get_product(product_id), params).await
    }

    pub async fn list_reviews_for_product(
        &self,
        product_id: u64,
        params: RequestParams,
    ) -> ApiResult<Vec<Review>> {
        self.client
            .request(routes::list_reviews_for_product(product_id), params)
            .await
    }

    pub async fn submit_review(&self, input: &ReviewRequest, params: RequestParams) -> ApiResult<Review> {
        self.client.request(routes::submit_review(input)?, params).await
    }

    pub async fn search_companies(
        &self,
        filters: &SearchCompaniesParams,
        params: RequestParams,
    ) -> ApiResult<Vec<Company>> {
        self.client.request(routes::search_companies(filters), params).await
    }

    pub async fn get_company_profile(
        &self,
        company_id: u64,
        params: RequestParams,
    ) -> ApiResult<CompanyProfile> {
        self.client
            .request(routes::get_company_profile(company_id), params)
            .await
    }

    pub async fn get_analytics(&self, params: RequestParams) -> ApiResult<AnalyticsData, Value> {
        self.client.request(routes::get_analytics(), params).await
    }

    // Leads

    pub async fn create_lead(&self, input: &CreateLeadRequest, params: RequestParams) -> ApiResult<Lead> {
        self.client.request(routes::create_lead(input)?, params).await
    }

    pub async fn list_my_leads(&self, params: RequestParams) -> ApiResult<Vec<SentLead>, Value> {
        self.client.request(routes::list_my_leads(), params).await
    }

    pub async fn list_received_leads(&self, params: RequestParams) -> ApiResult<Vec<Lead>, Value> {
        self.client.request(routes::list_received_leads(), params).await
    }

    pub async fn update_lead_status(
        &self,
        input: &UpdateLeadStatus,
        params: RequestParams,
    ) -> ApiResult<MessageResponse> {
        self.client.request(routes::update_lead_status(input)?, params).await
    }

    pub async fn get_lead(&self, lead_id: u64, params: RequestParams) -> ApiResult<Lead> {
        self.client.request(routes::get_lead(lead_id), params).await
    }

    // Admin

    pub async fn list_admin_companies(
        &self,
        paging: &AdminCompaniesParams,
        params: RequestParams,
    ) -> ApiResult<Vec<CompanyWithSubscription>> {
        self.client.request(routes::list_admin_companies(paging), params).await
    }

    pub async fn list_plans(&self, params: RequestParams) -> ApiResult<Vec<Plan>, Value> {
        self.client.request(routes::list_plans(), params).await
    }

    pub async fn create_plan(&self, input: &CreatePlanRequest, params: RequestParams) -> ApiResult<Plan> {
        self.client.request(routes::create_plan(input)?, params).await
    }

    pub async fn update_subscription(
        &self,
        input: &UpdateSubscriptionRequest,
        params: RequestParams,
    ) -> ApiResult<MessageResponse> {
        self.client.request(routes::update_subscription(input)?, params).await
    }

    pub async fn list_subscriptions(
        &self,
        company_id: u64,
        params: RequestParams,
    ) -> ApiResult<Vec<CompanySubscription>> {
        self.client
            .request(routes::list_subscriptions(company_id), params)
            .await
    }

    pub async fn cancel_subscription(&self, company_id: u64, params: RequestParams) -> ApiResult<MessageResponse> {
        self.client
            .request(routes::cancel_subscription(company_id), params)
            .await
    }
}
