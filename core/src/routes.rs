//! Request builders for every SolarSync endpoint.
//!
//! Each function maps its inputs to a `RequestSpec` and nothing else: no
//! headers, no base URL, no I/O. `HttpClient` takes it from there.

use crate::error::ApiError;
use crate::http::{HttpMethod, QueryParams, RequestSpec};
use crate::types::{
    AdminCompaniesParams, CreateLeadRequest, CreatePlanRequest, ListProductsParams, RegistrationRequest,
    ReviewRequest, SearchCompaniesParams, UpdateLeadStatus, UpdateSubscriptionRequest,
};

pub fn check_health() -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, "/_healthz")
}

pub fn register_user(input: &RegistrationRequest) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Post, "/routes/register").with_body(serde_json::to_value(input)?))
}

pub fn list_products(filters: &ListProductsParams) -> RequestSpec {
    let mut query = QueryParams::new();
    query
        .push_opt("category", filters.category.as_deref())
        .push_opt("brand", filters.brand.as_deref());
    RequestSpec::new(HttpMethod::Get, "/routes/products/").with_query(query)
}

pub fn get_product(product_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, format!("/routes/products/{product_id}"))
}

pub fn list_reviews_for_product(product_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, format!("/routes/reviews/{product_id}"))
}

pub fn submit_review(input: &ReviewRequest) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Post, "/routes/reviews/").with_body(serde_json::to_value(input)?))
}

pub fn search_companies(filters: &SearchCompaniesParams) -> RequestSpec {
    let mut query = QueryParams::new();
    query
        .push_opt("state", filters.state.as_deref())
        .push_opt("city", filters.city.as_deref());
    RequestSpec::new(HttpMethod::Get, "/routes/companies/").with_query(query)
}

pub fn get_company_profile(company_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, format!("/routes/companies/{company_id}"))
}

/// Analytics for the company of the authenticated supplier.
pub fn get_analytics() -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, "/routes/dashboard/analytics")
}

pub fn create_lead(input: &CreateLeadRequest) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Post, "/routes/leads/").with_body(serde_json::to_value(input)?))
}

/// Leads sent by the authenticated installer, newest first.
pub fn list_my_leads() -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, "/routes/leads/my-leads")
}

/// Leads received by the authenticated supplier's company, newest first.
pub fn list_received_leads() -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, "/routes/leads/received")
}

pub fn update_lead_status(input: &UpdateLeadStatus) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Put, "/routes/leads/status").with_body(serde_json::to_value(input)?))
}

pub fn get_lead(lead_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, format!("/routes/leads/{lead_id}"))
}

pub fn list_admin_companies(paging: &AdminCompaniesParams) -> RequestSpec {
    let mut query = QueryParams::new();
    if let Some(page) = paging.page {
        query.push("page", page.to_string());
    }
    if let Some(limit) = paging.limit {
        query.push("limit", limit.to_string());
    }
    RequestSpec::new(HttpMethod::Get, "/routes/admin/companies").with_query(query)
}

pub fn list_plans() -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, "/routes/admin/plans")
}

pub fn create_plan(input: &CreatePlanRequest) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Post, "/routes/admin/plans").with_body(serde_json::to_value(input)?))
}

pub fn update_subscription(input: &UpdateSubscriptionRequest) -> Result<RequestSpec, ApiError> {
    Ok(RequestSpec::new(HttpMethod::Put, "/routes/admin/subscriptions").with_body(serde_json::to_value(input)?))
}

pub fn list_subscriptions(company_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Get, format!("/routes/admin/subscriptions/{company_id}"))
}

pub fn cancel_subscription(company_id: u64) -> RequestSpec {
    RequestSpec::new(HttpMethod::Delete, format!("/routes/admin/subscriptions/{company_id}"))
}
